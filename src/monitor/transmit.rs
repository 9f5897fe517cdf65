//! Sending text through fldigi under supervision.

use std::time::{Duration, Instant};

use crate::domain::{FldigiError, FldigiResult, TrxState, TxPayload};
use crate::ports::with_remote;

use super::supervisor::{TxSupervisor, Wait};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Append,
    KeyUp,
}

fn halted() -> FldigiError {
    FldigiError::Supervisor("TX supervisor halted while waiting".into())
}

impl TxSupervisor {
    /// Queue `payload` for transmission.
    ///
    /// From RX this clears fldigi's TX buffer and the ledger's TX data,
    /// keys the transmitter, queues the payload and waits until the
    /// supervisor has seen TX together with the first transmitted byte. If
    /// queueing fails fldigi is sent back to RX before the error is
    /// returned. While the supervisor considers fldigi to be transmitting
    /// the payload is appended instead; a TX that was already forced back to
    /// RX is keyed up again like RX. TUNE and ERROR are refused without
    /// touching fldigi.
    ///
    /// With `block` the call also waits for the supervisor to see the
    /// transmission end. Both waits share one deadline, `timeout` from the
    /// start of the call.
    pub fn transmit(
        &self,
        payload: impl Into<TxPayload>,
        block: bool,
        timeout: Duration,
    ) -> FldigiResult<()> {
        let deadline = Instant::now()
            .checked_add(timeout)
            .ok_or_else(|| FldigiError::Config(format!("Timeout {timeout:?} out of range")))?;

        let payload = payload.into();
        if payload.is_empty() {
            return Err(FldigiError::Payload("Nothing to transmit".into()));
        }
        if payload.len() > self.config.max_text_length {
            log::warn!(
                "Payload of {} characters exceeds the {} character limit",
                payload.len(),
                self.config.max_text_length
            );
        }
        if !self.is_running() {
            return Err(FldigiError::Supervisor(
                "TX supervisor is not running; refusing to transmit without automatic return to RX"
                    .into(),
            ));
        }

        let route = with_remote(&self.remote, |r| {
            let mut st = self.shared.lock();
            let route = match st.ledger.current_state() {
                // Keyed and not yet reverted: fldigi is still sending
                TrxState::Tx if st.transmitting => Route::Append,
                // A forced revert may have landed before the ledger saw RX
                TrxState::Tx | TrxState::Rx => Route::KeyUp,
                state @ (TrxState::Tune | TrxState::Error) => {
                    return Err(FldigiError::InvalidState(format!(
                        "cannot transmit while fldigi is in {state}"
                    )));
                }
            };
            st.handoffs += 1;
            if route == Route::KeyUp {
                st.ledger.clear_tx_data();
            }
            drop(st);

            match route {
                Route::Append => {
                    log::debug!("Already transmitting, appending {}", payload.display_truncated());
                    r.push_text(&payload)?;
                }
                Route::KeyUp => {
                    r.clear_pending_text()?;
                    r.request_transmit()?;
                    if let Err(e) = r.push_text(&payload) {
                        // Keyed with nothing queued would never be reverted
                        log::warn!("Queueing text failed, returning to RX: {e}");
                        if let Err(rx_err) = r.request_receive() {
                            log::error!("Return to RX after failed queue also failed: {rx_err}");
                        }
                        return Err(e);
                    }
                    log::info!("Transmitting {}", payload.display_truncated());
                }
            }
            Ok(route)
        })?;

        // Data alone is not enough: a cycle may pair a status sampled before
        // the key-up with data read after it. Wait for the supervisor to
        // have seen TX as well.
        if route == Route::KeyUp {
            match self.shared.wait_until(deadline, |st| {
                st.transmitting && st.ledger.last_tx_data_at().is_some()
            }) {
                Wait::Done => log::debug!("First transmitted data observed"),
                Wait::TimedOut => {
                    return Err(FldigiError::Timeout(format!(
                        "no transmitted data observed within {:.3}s",
                        timeout.as_secs_f64()
                    )))
                }
                Wait::Halted => return Err(halted()),
            }
        }

        if !block {
            return Ok(());
        }
        match self.shared.wait_until(deadline, |st| !st.transmitting) {
            Wait::Done => Ok(()),
            Wait::TimedOut => Err(FldigiError::Timeout(format!(
                "transmission still in progress after {:.3}s",
                timeout.as_secs_f64()
            ))),
            Wait::Halted => Err(halted()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::adapters::{MockCall, MockHandle, MockRemote};
    use crate::domain::{FldigiError, SupervisorConfig, TrxState, TxPayload};
    use crate::monitor::TxSupervisor;
    use crate::ports::shared_remote;
    use std::thread;
    use std::time::{Duration, Instant};

    fn fast_config() -> SupervisorConfig {
        SupervisorConfig {
            poll_interval_idle_secs: 0.02,
            poll_interval_transmitting_secs: 0.01,
            transmit_inactivity_timeout_secs: 0.1,
            sample_retry_delay_ms: 1,
            ..SupervisorConfig::default()
        }
    }

    fn start(chars_per_poll: usize) -> (TxSupervisor, MockHandle) {
        start_with(MockRemote::with_chars_per_poll(chars_per_poll), fast_config())
    }

    fn start_with(mock: MockRemote, config: SupervisorConfig) -> (TxSupervisor, MockHandle) {
        let handle = mock.handle();
        let supervisor = TxSupervisor::spawn(shared_remote(Box::new(mock)), config).unwrap();
        (supervisor, handle)
    }

    fn wait_for(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached");
            thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn empty_payload_is_rejected() {
        let (supervisor, handle) = start(4);
        let err = supervisor.transmit("", false, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, FldigiError::Payload(_)));
        assert_eq!(handle.count(|c| matches!(c, MockCall::RequestTransmit)), 0);
    }

    #[test]
    fn from_rx_clears_then_keys_then_queues() {
        let (supervisor, handle) = start(4);
        supervisor.transmit("CQ DE N0CALL", false, Duration::from_secs(5)).unwrap();

        let calls: Vec<MockCall> = handle
            .calls()
            .into_iter()
            .filter(|c| !matches!(c, MockCall::QueryTrxState | MockCall::QueryTxData))
            .collect();
        assert_eq!(
            calls,
            vec![
                MockCall::ClearPendingText,
                MockCall::RequestTransmit,
                MockCall::PushText(TxPayload::from("CQ DE N0CALL")),
            ]
        );
        assert!(supervisor.time_since_last_tx_data().is_some());
    }

    #[test]
    fn from_tx_appends_without_rekeying() {
        let (supervisor, handle) = start(1);
        supervisor.transmit("CQ CQ CQ", false, Duration::from_secs(5)).unwrap();
        wait_for(|| supervisor.current_state() == TrxState::Tx);

        supervisor.transmit(" K", false, Duration::from_secs(5)).unwrap();
        assert_eq!(handle.count(|c| matches!(c, MockCall::RequestTransmit)), 1);
        assert_eq!(handle.count(|c| matches!(c, MockCall::ClearPendingText)), 1);
        assert_eq!(handle.count(|c| matches!(c, MockCall::PushText(_))), 2);
    }

    #[test]
    fn tune_is_refused_without_side_effects() {
        let (supervisor, handle) = start(4);
        handle.set_state(TrxState::Tune);
        wait_for(|| supervisor.current_state() == TrxState::Tune);

        let err = supervisor.transmit("CQ", true, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, FldigiError::InvalidState(_)));
        assert_eq!(handle.count(|c| matches!(c, MockCall::RequestTransmit)), 0);
        assert_eq!(handle.count(|c| matches!(c, MockCall::PushText(_))), 0);
    }

    #[test]
    fn refused_after_supervisor_stops() {
        let (supervisor, handle) = start(4);
        supervisor.stop();
        let err = supervisor.transmit("CQ", false, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, FldigiError::Supervisor(_)));
        assert_eq!(handle.count(|c| matches!(c, MockCall::RequestTransmit)), 0);
    }

    #[test]
    fn blocking_send_waits_out_a_lagging_status() {
        let mock = MockRemote::with_chars_per_poll(1);
        let handle = mock.handle();
        handle.lag_status_after_transmit(1);
        let (supervisor, _) = start_with(mock, fast_config());

        // The first cycle after key-up reads "rx" together with the first
        // character; that must not count as the transmission starting.
        supervisor
            .transmit("CQ CQ DE N0CALL", true, Duration::from_secs(10))
            .unwrap();

        assert_eq!(handle.pending_text(), "");
        assert_eq!(handle.state(), TrxState::Rx);
        assert_eq!(handle.count(|c| matches!(c, MockCall::RequestReceive)), 1);
        assert!(!supervisor.is_transmitting());
    }

    #[test]
    fn send_right_after_forced_revert_keys_up_again() {
        let config = SupervisorConfig {
            poll_interval_idle_secs: 0.5,
            poll_interval_transmitting_secs: 0.5,
            transmit_inactivity_timeout_secs: 0.1,
            sample_retry_delay_ms: 1,
            ..SupervisorConfig::default()
        };
        let (supervisor, handle) = start_with(MockRemote::with_chars_per_poll(16), config);

        supervisor.transmit("K", false, Duration::from_secs(5)).unwrap();
        wait_for(|| handle.count(|c| matches!(c, MockCall::RequestReceive)) == 1);
        // fldigi is back in RX; the ledger catches up on the next poll
        assert_eq!(handle.state(), TrxState::Rx);
        assert!(!supervisor.is_transmitting());

        supervisor
            .transmit("MORE TEXT", true, Duration::from_secs(5))
            .unwrap();
        assert_eq!(handle.count(|c| matches!(c, MockCall::RequestTransmit)), 2);
        assert_eq!(handle.count(|c| matches!(c, MockCall::ClearPendingText)), 2);
        assert_eq!(handle.pending_text(), "");
        assert_eq!(handle.state(), TrxState::Rx);
    }
}
