//! Transmit supervisor: the background thread that keeps fldigi from
//! being left keyed.
//!
//! Every cycle the supervisor samples fldigi's TRX state and newly
//! transmitted data, records both in the ledger, and decides:
//!
//! - `TX` with data seen since entering TX, but none for longer than the
//!   inactivity timeout: send fldigi back to RX (forced revert).
//! - `TX` without any data yet: keep waiting; the transmitter may still be
//!   starting up.
//! - `ERROR`: stop. The safety net is gone, which is logged at error level.
//!
//! The poll interval is short while transmitting and long otherwise.
//!
//! The ledger, the `transmitting` flag and the heartbeat sit behind one
//! mutex with a condvar that is notified after every cycle, so callers can
//! block on "first byte seen" or "transmission over" with a timeout
//! instead of spinning.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::domain::{FldigiError, FldigiResult, SupervisorConfig, TrxState};
use crate::ports::{with_remote, SharedRemote};

use super::ledger::Ledger;
use super::sampler::StateSampler;

/// State written by the supervisor thread and read by everyone else.
pub(crate) struct MonitorState {
    pub(crate) ledger: Ledger,
    pub(crate) transmitting: bool,
    /// Bumped by every `transmit` that hands text to fldigi
    pub(crate) handoffs: u64,
    pub(crate) running: bool,
    pub(crate) heartbeat: Instant,
}

/// Outcome of a bounded wait on the monitor.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Wait {
    Done,
    TimedOut,
    Halted,
}

pub(crate) struct Shared {
    state: Mutex<MonitorState>,
    changed: Condvar,
}

impl Shared {
    fn new(ledger: Ledger, now: Instant) -> Self {
        Self {
            state: Mutex::new(MonitorState {
                ledger,
                transmitting: false,
                handoffs: 0,
                running: true,
                heartbeat: now,
            }),
            changed: Condvar::new(),
        }
    }

    // Poisoning is ignored: every update under this lock is a whole step
    pub(crate) fn lock(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self) {
        self.changed.notify_all();
    }

    /// Block until `done` holds, the supervisor halts, or `deadline` passes.
    /// A halted supervisor wins over a satisfied condition.
    pub(crate) fn wait_until(
        &self,
        deadline: Instant,
        mut done: impl FnMut(&MonitorState) -> bool,
    ) -> Wait {
        let mut guard = self.lock();
        loop {
            if !guard.running {
                return Wait::Halted;
            }
            if done(&guard) {
                return Wait::Done;
            }
            let now = Instant::now();
            if now >= deadline {
                return Wait::TimedOut;
            }
            guard = self
                .changed
                .wait_timeout(guard, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// What the loop does after a cycle.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Step {
    Continue(Duration),
    Halt,
}

/// The body of the supervisor thread. Split out so a single cycle can be
/// driven with explicit timestamps.
pub(crate) struct SupervisorLoop {
    sampler: StateSampler,
    remote: SharedRemote,
    shared: Arc<Shared>,
    config: SupervisorConfig,
    warned_transmit_time: bool,
    warned_duty_cycle: bool,
}

impl SupervisorLoop {
    pub(crate) fn new(remote: SharedRemote, shared: Arc<Shared>, config: SupervisorConfig) -> Self {
        Self {
            sampler: StateSampler::from_config(Arc::clone(&remote), &config),
            remote,
            shared,
            config,
            warned_transmit_time: false,
            warned_duty_cycle: false,
        }
    }

    /// One sample-record-decide cycle at time `now`.
    pub(crate) fn step(&mut self, now: Instant) -> Step {
        let handoffs_seen = self.shared.lock().handoffs;
        let state = self.sampler.sample_state(true).unwrap_or(TrxState::Error);
        // Nothing more is asked of fldigi once it is in ERROR
        let data = match state {
            TrxState::Error => None,
            _ => self.sampler.sample_tx_data(true).unwrap_or(None),
        };

        let timeout = self.config.transmit_inactivity_timeout();
        let mut revert_after = None;
        let mut on_air = Duration::ZERO;
        let mut duty_cycle = 0.0;
        {
            let mut st = self.shared.lock();
            st.ledger.record_state(state, now);
            if let Some(payload) = data {
                log::debug!("TX DATA: {}", payload.display_truncated());
                st.ledger.record_tx_data(payload, now);
            }

            match state {
                TrxState::Tx => {
                    let entered = st.ledger.current_interval().start();
                    let last_data = st.ledger.last_tx_data_at().filter(|at| *at >= entered);
                    match last_data {
                        // Keyed but nothing sent yet: wait, don't revert
                        None => st.transmitting = true,
                        Some(at) => {
                            let idle = now.saturating_duration_since(at);
                            if idle <= timeout {
                                st.transmitting = true;
                            } else {
                                revert_after = Some(idle);
                            }
                        }
                    }
                    on_air = st.ledger.current_interval().duration_at(now);
                    duty_cycle = st.ledger.duty_cycle(now, None);
                }
                TrxState::Rx | TrxState::Tune => st.transmitting = false,
                TrxState::Error => {
                    st.transmitting = false;
                    st.running = false;
                }
            }
            st.heartbeat = now;
        }

        if let Some(idle) = revert_after {
            self.force_receive(idle, handoffs_seen);
        }
        self.shared.notify();

        match state {
            TrxState::Error => {
                log::error!(
                    "fldigi reported ERROR; TX supervisor halted. Automatic return to RX is no longer active!"
                );
                Step::Halt
            }
            TrxState::Tx => {
                self.check_advisory_limits(on_air, duty_cycle);
                Step::Continue(self.config.poll_interval_transmitting())
            }
            TrxState::Rx | TrxState::Tune => {
                self.warned_transmit_time = false;
                Step::Continue(self.config.poll_interval_idle())
            }
        }
    }

    /// Return fldigi to RX unless text was handed over since this cycle
    /// sampled. The check and the flag update happen under the endpoint
    /// lock, so a concurrent `transmit` sees either the keyed transmitter
    /// or the reverted one, never the moment in between.
    fn force_receive(&mut self, idle: Duration, handoffs_seen: u64) {
        let shared = &self.shared;
        let reverted = with_remote(&self.remote, |r| {
            if shared.lock().handoffs != handoffs_seen {
                return Ok(false);
            }
            r.request_receive()?;
            shared.lock().transmitting = false;
            Ok(true)
        });
        match reverted {
            Ok(true) => log::info!(
                "Changing state back to RX (last transmitted byte was {:.3}s ago)",
                idle.as_secs_f64()
            ),
            Ok(false) => log::debug!("New text queued during this cycle, not reverting"),
            Err(e) => {
                log::warn!("Return to RX failed, retrying next poll: {e}");
                self.shared.lock().transmitting = true;
            }
        }
    }

    fn check_advisory_limits(&mut self, on_air: Duration, duty_cycle: f64) {
        if on_air > self.config.max_transmit_time() && !self.warned_transmit_time {
            log::warn!(
                "Transmitting for {:.1}s, over the {:.1}s limit",
                on_air.as_secs_f64(),
                self.config.max_transmit_time_secs
            );
            self.warned_transmit_time = true;
        }

        if duty_cycle > self.config.max_duty_cycle_percent {
            if !self.warned_duty_cycle {
                log::warn!(
                    "TX duty cycle {duty_cycle:.1}% exceeds the {:.1}% limit",
                    self.config.max_duty_cycle_percent
                );
                self.warned_duty_cycle = true;
            }
        } else {
            self.warned_duty_cycle = false;
        }
    }

    fn run(mut self, stop: Receiver<()>) {
        let _halt = HaltGuard(Arc::clone(&self.shared));
        log::debug!("TX supervisor started");
        loop {
            match self.step(Instant::now()) {
                Step::Halt => break,
                Step::Continue(interval) => match stop.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                },
            }
        }
        log::debug!("TX supervisor stopped");
    }
}

/// Marks the supervisor halted however the thread exits, panics included,
/// so waiting callers are released.
struct HaltGuard(Arc<Shared>);

impl Drop for HaltGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            log::error!("TX supervisor thread panicked. Automatic return to RX is no longer active!");
        }
        self.0.lock().running = false;
        self.0.notify();
    }
}

/// Owns the supervisor thread and answers state queries.
///
/// Created once per fldigi session. Stops when fldigi reports `ERROR`,
/// on `stop()`, or when dropped.
pub struct TxSupervisor {
    pub(super) shared: Arc<Shared>,
    pub(super) remote: SharedRemote,
    pub(super) config: SupervisorConfig,
    stop_tx: Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TxSupervisor {
    /// Seed the ledger with RX and start the supervisor thread.
    pub fn spawn(remote: SharedRemote, config: SupervisorConfig) -> FldigiResult<Self> {
        config.validate()?;

        let now = Instant::now();
        let shared = Arc::new(Shared::new(
            Ledger::new(TrxState::Rx, config.max_history(), now),
            now,
        ));
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let worker = SupervisorLoop::new(Arc::clone(&remote), Arc::clone(&shared), config.clone());

        let handle = thread::Builder::new()
            .name("tx-supervisor".into())
            .spawn(move || worker.run(stop_rx))
            .map_err(|e| FldigiError::Supervisor(format!("Failed to spawn supervisor thread: {e}")))?;

        Ok(Self {
            shared,
            remote,
            config,
            stop_tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// State of the newest ledger interval
    pub fn current_state(&self) -> TrxState {
        self.shared.lock().ledger.current_state()
    }

    pub fn is_transmitting(&self) -> bool {
        self.shared.lock().transmitting
    }

    /// TX duty cycle in percent. `None` covers the whole retained history.
    pub fn duty_cycle(&self, sample_period: Option<Duration>) -> f64 {
        self.shared.lock().ledger.duty_cycle(Instant::now(), sample_period)
    }

    pub fn time_since_last_tx_data(&self) -> Option<Duration> {
        self.shared.lock().ledger.time_since_last_tx_data(Instant::now())
    }

    /// Time of the last completed cycle
    pub fn heartbeat(&self) -> Instant {
        self.shared.lock().heartbeat
    }

    pub fn heartbeat_age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.heartbeat())
    }

    /// False once the thread has exited for any reason
    pub fn is_running(&self) -> bool {
        self.shared.lock().running
    }

    /// Read access to the ledger under the monitor lock.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.shared.lock().ledger)
    }

    /// Human-readable state and TX data history
    pub fn history_report(&self) -> String {
        self.with_ledger(|ledger| ledger.to_string())
    }

    /// Stop the thread and wait for it. Safe to call more than once.
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(());
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if self.is_running() && self.is_transmitting() {
                log::warn!("Stopping TX supervisor while transmitting; automatic return to RX is no longer active");
            }
            if handle.join().is_err() {
                log::error!("TX supervisor thread panicked");
            }
        }
    }
}

impl Drop for TxSupervisor {
    fn drop(&mut self) {
        self.stop();
    }
}
