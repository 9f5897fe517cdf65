//! State sampler: turns fldigi's raw status into a `TrxState`.
//!
//! A status query is attempted a bounded number of times. A failed query
//! and a reply outside tx/rx/tune are both retried; once the attempts are
//! used up the sample is `Error`, or the last transport failure when the
//! caller does not suppress errors.

use std::thread;
use std::time::Duration;

use crate::domain::{FldigiResult, SupervisorConfig, TrxState, TxPayload};
use crate::ports::{with_remote, SharedRemote};

pub struct StateSampler {
    remote: SharedRemote,
    attempts: u32,
    retry_delay: Duration,
}

impl StateSampler {
    pub fn new(remote: SharedRemote, attempts: u32, retry_delay: Duration) -> Self {
        Self {
            remote,
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    pub fn from_config(remote: SharedRemote, config: &SupervisorConfig) -> Self {
        Self::new(remote, config.sample_retries, config.sample_retry_delay())
    }

    /// Query the state, retrying failures and unknown values.
    ///
    /// With `suppress_errors` an exhausted transport failure yields
    /// `Ok(TrxState::Error)`; without it the last failure is returned.
    /// Unknown values always normalize to `Error`.
    pub fn sample_state(&self, suppress_errors: bool) -> FldigiResult<TrxState> {
        let mut last_failure = None;
        for attempt in 1..=self.attempts {
            match with_remote(&self.remote, |r| r.query_trx_state()) {
                Ok(raw) => {
                    let state = TrxState::from_remote(&raw);
                    if state != TrxState::Error {
                        return Ok(state);
                    }
                    log::debug!("Unrecognised TRX status '{raw}' (attempt {attempt}/{})", self.attempts);
                    last_failure = None;
                }
                Err(e) => {
                    log::debug!("TRX status query failed (attempt {attempt}/{}): {e}", self.attempts);
                    last_failure = Some(e);
                }
            }
            if attempt < self.attempts {
                thread::sleep(self.retry_delay);
            }
        }

        match last_failure {
            Some(e) if !suppress_errors => Err(e),
            Some(e) => {
                log::warn!("TRX status unavailable after {} attempts: {e}", self.attempts);
                Ok(TrxState::Error)
            }
            None => Ok(TrxState::Error),
        }
    }

    /// Data transmitted since the previous call. No data is the normal
    /// case, not an error.
    pub fn sample_tx_data(&self, suppress_errors: bool) -> FldigiResult<Option<TxPayload>> {
        match with_remote(&self.remote, |r| r.query_tx_data()) {
            Ok(data) => Ok(data.filter(|payload| !payload.is_empty())),
            Err(e) if suppress_errors => {
                log::debug!("TX data query failed: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
