//! Mock fldigi adapter for development and testing without a running fldigi.
//!
//! Simulates the parts of fldigi the transmit path touches: a TX/RX/TUNE
//! state, a pending TX buffer that drains a few characters per poll while
//! transmitting, and scripted failures. Every call is recorded so tests can
//! assert exactly what would have been sent to a real fldigi, and logged
//! with a `[MOCK FLDIGI]` prefix:
//!
//!   RUST_LOG=fldigi_remote=debug cargo test
//!
//! Clone a `MockHandle` before boxing the remote to script and inspect it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::domain::{FldigiError, FldigiResult, TrxState, TxPayload};
use crate::ports::RemoteControl;

/// Characters fldigi "sends" per poll unless configured otherwise
const DEFAULT_CHARS_PER_POLL: usize = 8;

/// One recorded call against the mock
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    QueryTrxState,
    QueryTxData,
    RequestTransmit,
    RequestReceive,
    Abort,
    PushText(TxPayload),
    ClearPendingText,
}

struct MockState {
    state: TrxState,
    status_override: Option<String>,
    failures_remaining: u32,
    status_lag: u32,
    stale_status: Option<(TrxState, u32)>,
    pending: String,
    chars_per_poll: usize,
    calls: Vec<MockCall>,
}

fn lock(inner: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct MockRemote {
    inner: Arc<Mutex<MockState>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::with_chars_per_poll(DEFAULT_CHARS_PER_POLL)
    }

    /// `chars_per_poll = 0` simulates a transmitter that keys up but never
    /// reports any transmitted data.
    pub fn with_chars_per_poll(chars_per_poll: usize) -> Self {
        log::info!("[MOCK FLDIGI] Initialized in RX, {chars_per_poll} chars/poll");
        Self {
            inner: Arc::new(Mutex::new(MockState {
                state: TrxState::Rx,
                status_override: None,
                failures_remaining: 0,
                status_lag: 0,
                stale_status: None,
                pending: String::new(),
                chars_per_poll,
                calls: Vec::new(),
            })),
        }
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

/// Scripting and inspection handle shared with a `MockRemote`.
#[derive(Clone)]
pub struct MockHandle {
    inner: Arc<Mutex<MockState>>,
}

impl MockHandle {
    /// Simulate an operator (or fldigi itself) changing state.
    pub fn set_state(&self, state: TrxState) {
        lock(&self.inner).state = state;
    }

    pub fn state(&self) -> TrxState {
        lock(&self.inner).state
    }

    /// Answer status queries with `raw` instead of the simulated state.
    pub fn set_status_override(&self, raw: Option<&str>) {
        lock(&self.inner).status_override = raw.map(str::to_string);
    }

    /// Make the next `n` status queries fail with a transport error.
    pub fn fail_next_queries(&self, n: u32) {
        lock(&self.inner).failures_remaining = n;
    }

    /// After each `main.tx`, report the previous state for the next `polls`
    /// status queries while data already drains.
    pub fn lag_status_after_transmit(&self, polls: u32) {
        lock(&self.inner).status_lag = polls;
    }

    pub fn pending_text(&self) -> String {
        lock(&self.inner).pending.clone()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.inner).calls.clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.inner).calls.len()
    }

    pub fn count(&self, matches: impl Fn(&MockCall) -> bool) -> usize {
        lock(&self.inner).calls.iter().filter(|c| matches(c)).count()
    }
}

impl RemoteControl for MockRemote {
    fn query_trx_state(&mut self) -> FldigiResult<String> {
        let mut inner = lock(&self.inner);
        inner.calls.push(MockCall::QueryTrxState);
        if inner.failures_remaining > 0 {
            inner.failures_remaining -= 1;
            log::debug!("[MOCK FLDIGI] GET STATUS → simulated failure");
            return Err(FldigiError::Transport("simulated connection refused".into()));
        }
        let reported = match inner.stale_status {
            Some((stale, left)) => {
                inner.stale_status = (left > 1).then_some((stale, left - 1));
                stale
            }
            None => inner.state,
        };
        let raw = match &inner.status_override {
            Some(raw) => raw.clone(),
            None => reported.as_str().to_ascii_lowercase(),
        };
        log::debug!("[MOCK FLDIGI] GET STATUS → {raw}");
        Ok(raw)
    }

    fn query_tx_data(&mut self) -> FldigiResult<Option<TxPayload>> {
        let mut inner = lock(&self.inner);
        inner.calls.push(MockCall::QueryTxData);
        if inner.state != TrxState::Tx || inner.pending.is_empty() {
            return Ok(None);
        }
        let take = inner.chars_per_poll;
        let sent: String = inner.pending.chars().take(take).collect();
        if sent.is_empty() {
            return Ok(None);
        }
        let rest: String = inner.pending.chars().skip(take).collect();
        inner.pending = rest;
        log::debug!("[MOCK FLDIGI] TX DATA → '{sent}'");
        Ok(Some(TxPayload::Text(sent)))
    }

    fn request_transmit(&mut self) -> FldigiResult<()> {
        let mut inner = lock(&self.inner);
        inner.calls.push(MockCall::RequestTransmit);
        if inner.status_lag > 0 {
            inner.stale_status = Some((inner.state, inner.status_lag));
        }
        inner.state = TrxState::Tx;
        log::info!("[MOCK FLDIGI] main.tx");
        Ok(())
    }

    fn request_receive(&mut self) -> FldigiResult<()> {
        let mut inner = lock(&self.inner);
        inner.calls.push(MockCall::RequestReceive);
        inner.state = TrxState::Rx;
        log::info!("[MOCK FLDIGI] main.rx");
        Ok(())
    }

    fn abort(&mut self) -> FldigiResult<()> {
        let mut inner = lock(&self.inner);
        inner.calls.push(MockCall::Abort);
        inner.state = TrxState::Rx;
        inner.pending.clear();
        log::info!("[MOCK FLDIGI] main.abort");
        Ok(())
    }

    fn push_text(&mut self, payload: &TxPayload) -> FldigiResult<()> {
        let mut inner = lock(&self.inner);
        inner.calls.push(MockCall::PushText(payload.clone()));
        inner.pending.push_str(&payload.to_text());
        log::info!("[MOCK FLDIGI] text.add_tx {}", payload.display_truncated());
        Ok(())
    }

    fn clear_pending_text(&mut self) -> FldigiResult<()> {
        let mut inner = lock(&self.inner);
        inner.calls.push(MockCall::ClearPendingText);
        inner.pending.clear();
        log::info!("[MOCK FLDIGI] text.clear_tx");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_receive() {
        let mut remote = MockRemote::new();
        assert_eq!(remote.query_trx_state().unwrap(), "rx");
    }

    #[test]
    fn drains_pending_text_only_while_transmitting() {
        let mut remote = MockRemote::with_chars_per_poll(2);
        remote.push_text(&TxPayload::from("SOS")).unwrap();
        assert_eq!(remote.query_tx_data().unwrap(), None);

        remote.request_transmit().unwrap();
        assert_eq!(remote.query_tx_data().unwrap(), Some(TxPayload::from("SO")));
        assert_eq!(remote.query_tx_data().unwrap(), Some(TxPayload::from("S")));
        assert_eq!(remote.query_tx_data().unwrap(), None);
    }

    #[test]
    fn silent_transmitter_never_reports_data() {
        let mut remote = MockRemote::with_chars_per_poll(0);
        remote.push_text(&TxPayload::from("CQ")).unwrap();
        remote.request_transmit().unwrap();
        assert_eq!(remote.query_tx_data().unwrap(), None);
        assert_eq!(remote.handle().pending_text(), "CQ");
    }

    #[test]
    fn scripted_failures_then_recovery() {
        let mut remote = MockRemote::new();
        remote.handle().fail_next_queries(2);
        assert!(remote.query_trx_state().is_err());
        assert!(remote.query_trx_state().is_err());
        assert_eq!(remote.query_trx_state().unwrap(), "rx");
    }

    #[test]
    fn lagging_status_trails_transmit_request() {
        let mut remote = MockRemote::with_chars_per_poll(1);
        remote.handle().lag_status_after_transmit(1);
        remote.push_text(&TxPayload::from("CQ")).unwrap();
        remote.request_transmit().unwrap();
        assert_eq!(remote.query_trx_state().unwrap(), "rx");
        assert_eq!(remote.query_tx_data().unwrap(), Some(TxPayload::from("C")));
        assert_eq!(remote.query_trx_state().unwrap(), "tx");
    }

    #[test]
    fn status_override_returns_garbage() {
        let mut remote = MockRemote::new();
        remote.handle().set_status_override(Some("???"));
        assert_eq!(remote.query_trx_state().unwrap(), "???");
    }

    #[test]
    fn records_every_call() {
        let mut remote = MockRemote::new();
        let handle = remote.handle();
        remote.clear_pending_text().unwrap();
        remote.request_transmit().unwrap();
        remote.push_text(&TxPayload::from("K")).unwrap();
        assert_eq!(
            handle.calls(),
            vec![
                MockCall::ClearPendingText,
                MockCall::RequestTransmit,
                MockCall::PushText(TxPayload::from("K")),
            ]
        );
        assert_eq!(handle.count(|c| matches!(c, MockCall::RequestTransmit)), 1);
    }
}
