//! History ledger: time-bounded record of TRX state intervals and of the
//! data fldigi reports as transmitted.
//!
//! The open (current) interval is held apart from the closed ones, so the
//! ledger can never be empty and its current state is always the last
//! interval. Closed intervals and TX data events live in `VecDeque`s and
//! are evicted from the front once they fall out of the retention window.

use std::collections::VecDeque;
use std::fmt;
use std::mem;
use std::time::{Duration, Instant};

use crate::domain::{TrxState, TxPayload};

/// One stretch of time spent in a single state.
#[derive(Debug, Clone, PartialEq)]
pub struct StateInterval {
    state: TrxState,
    start: Instant,
    end: Option<Instant>,
}

impl StateInterval {
    fn open(state: TrxState, start: Instant) -> Self {
        Self {
            state,
            start,
            end: None,
        }
    }

    pub fn state(&self) -> TrxState {
        self.state
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    /// `None` while the interval is still the current one
    pub fn end(&self) -> Option<Instant> {
        self.end
    }

    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// `end - start`, with an open interval measured up to `now`.
    pub fn duration_at(&self, now: Instant) -> Duration {
        self.end
            .unwrap_or(now)
            .saturating_duration_since(self.start)
    }

    /// Portion of the interval at or after `from`, measured up to `now`.
    fn span_since(&self, from: Option<Instant>, now: Instant) -> Duration {
        let end = self.end.unwrap_or(now).min(now);
        let start = match from {
            Some(from) => self.start.max(from),
            None => self.start,
        };
        end.saturating_duration_since(start)
    }
}

/// Data reported as transmitted by one poll.
#[derive(Debug, Clone, PartialEq)]
pub struct TxDataEvent {
    at: Instant,
    payload: TxPayload,
}

impl TxDataEvent {
    pub fn at(&self) -> Instant {
        self.at
    }

    pub fn payload(&self) -> &TxPayload {
        &self.payload
    }
}

/// Bounded history of state intervals and TX data events.
#[derive(Debug, Clone)]
pub struct Ledger {
    max_history: Duration,
    closed: VecDeque<StateInterval>,
    current: StateInterval,
    tx_events: VecDeque<TxDataEvent>,
}

impl Ledger {
    /// Start a history whose first interval is `initial`, opened at `at`.
    pub fn new(initial: TrxState, max_history: Duration, at: Instant) -> Self {
        Self {
            max_history,
            closed: VecDeque::new(),
            current: StateInterval::open(initial, at),
            tx_events: VecDeque::new(),
        }
    }

    pub fn max_history(&self) -> Duration {
        self.max_history
    }

    /// Record an observed state.
    ///
    /// A repeat of the current state extends the open interval; a new state
    /// closes it at `at` and opens the next one. Returns true on a change.
    pub fn record_state(&mut self, observed: TrxState, at: Instant) -> bool {
        let changed = observed != self.current.state;
        if changed {
            let mut finished = mem::replace(&mut self.current, StateInterval::open(observed, at));
            finished.end = Some(at.max(finished.start));
            log::info!("STATE CHANGE {} -> {}", finished.state, observed);
            self.closed.push_back(finished);
        }
        self.evict(at);
        changed
    }

    /// Record data reported as transmitted. Empty payloads are ignored.
    pub fn record_tx_data(&mut self, payload: TxPayload, at: Instant) {
        if payload.is_empty() {
            return;
        }
        self.tx_events.push_back(TxDataEvent { at, payload });
        self.evict(at);
    }

    /// Forget all TX data events, so inactivity timing starts clean.
    pub fn clear_tx_data(&mut self) {
        self.tx_events.clear();
    }

    pub fn current_state(&self) -> TrxState {
        self.current.state
    }

    pub fn current_interval(&self) -> &StateInterval {
        &self.current
    }

    /// Oldest first; the last item is the open interval.
    pub fn intervals(&self) -> impl Iterator<Item = &StateInterval> + '_ {
        self.closed.iter().chain(std::iter::once(&self.current))
    }

    pub fn tx_events(&self) -> impl Iterator<Item = &TxDataEvent> + '_ {
        self.tx_events.iter()
    }

    pub fn last_tx_data_at(&self) -> Option<Instant> {
        self.tx_events.back().map(|event| event.at)
    }

    /// Time since the newest TX data event, or `None` if none is retained.
    pub fn time_since_last_tx_data(&self, now: Instant) -> Option<Duration> {
        self.last_tx_data_at()
            .map(|at| now.saturating_duration_since(at))
    }

    /// Percentage of observed time spent in TX.
    ///
    /// `None` covers the whole retained history. `Some(period)` only counts
    /// time inside the last `period`. With no observed time at all the
    /// answer is 100 when currently transmitting and 0 otherwise.
    pub fn duty_cycle(&self, now: Instant, sample_period: Option<Duration>) -> f64 {
        let from = sample_period.and_then(|period| now.checked_sub(period));
        let mut on_time = Duration::ZERO;
        let mut total = Duration::ZERO;
        for interval in self.intervals() {
            let span = interval.span_since(from, now);
            total += span;
            if interval.state == TrxState::Tx {
                on_time += span;
            }
        }

        if total.is_zero() {
            return if self.current.state == TrxState::Tx { 100.0 } else { 0.0 };
        }
        (on_time.as_secs_f64() / total.as_secs_f64() * 100.0).clamp(0.0, 100.0)
    }

    /// Drop closed intervals that ended, and events that happened, at or
    /// before `now - max_history`. The open interval always stays.
    pub fn evict(&mut self, now: Instant) {
        let Some(cutoff) = now.checked_sub(self.max_history) else {
            return;
        };
        while let Some(oldest) = self.closed.front() {
            match oldest.end {
                Some(end) if end <= cutoff => {
                    self.closed.pop_front();
                }
                _ => break,
            }
        }
        while let Some(oldest) = self.tx_events.front() {
            if oldest.at > cutoff {
                break;
            }
            self.tx_events.pop_front();
        }
    }
}

impl fmt::Display for StateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration = self.duration_at(Instant::now());
        write!(f, "'{}' for {:.3}s", self.state, duration.as_secs_f64())?;
        if self.is_open() {
            write!(f, " (open)")?;
        }
        Ok(())
    }
}

impl fmt::Display for TxDataEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let age = Instant::now().saturating_duration_since(self.at);
        write!(f, "{:.3}s ago: {}", age.as_secs_f64(), self.payload.display_truncated())
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "State History:")?;
        for interval in self.intervals() {
            writeln!(f, "  {interval}")?;
        }
        writeln!(f, "TX data History:")?;
        for event in self.tx_events() {
            writeln!(f, "  {event}")?;
        }
        match self.time_since_last_tx_data(Instant::now()) {
            Some(age) => writeln!(f, "Last TX data was {:.3}s ago", age.as_secs_f64()),
            None => writeln!(f, "No TX data in history"),
        }
    }
}
