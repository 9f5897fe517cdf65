//! Client facade
//!
//! Ties a fldigi endpoint to a running `TxSupervisor`. Dropping the client
//! stops the supervisor first, then the endpoint, which returns fldigi to
//! RX if this client keyed it.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapters::{FldigiRemote, HttpTransport};
use crate::domain::{ClientConfig, FldigiResult, SupervisorConfig, TrxState, TxPayload};
use crate::monitor::TxSupervisor;
use crate::ports::{shared_remote, with_remote, RemoteControl, SharedRemote};

pub struct Client {
    // Declared first so the supervisor thread is joined before the endpoint drops
    supervisor: TxSupervisor,
    remote: SharedRemote,
}

impl Client {
    /// Connect to fldigi over XML-RPC and start supervising it.
    pub fn connect(config: &ClientConfig) -> FldigiResult<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config.host, config.port, config.request_timeout())?;
        let mut remote = FldigiRemote::new(Box::new(transport));
        let name = remote.name()?;
        log::info!("Connected to {name} at {}:{}", config.host, config.port);
        Self::with_remote(Box::new(remote), config.supervisor.clone())
    }

    /// Supervise an arbitrary endpoint, e.g. `MockRemote`.
    pub fn with_remote(remote: Box<dyn RemoteControl>, config: SupervisorConfig) -> FldigiResult<Self> {
        let remote = shared_remote(remote);
        let supervisor = TxSupervisor::spawn(Arc::clone(&remote), config)?;
        Ok(Self { supervisor, remote })
    }

    /// See [`TxSupervisor::transmit`].
    pub fn transmit(&self, payload: impl Into<TxPayload>, block: bool, timeout: Duration) -> FldigiResult<()> {
        self.supervisor.transmit(payload, block, timeout)
    }

    /// Abort the current transmission immediately. The supervisor picks up
    /// the state change on its next poll.
    pub fn abort(&self) -> FldigiResult<()> {
        log::info!("Aborting transmission");
        with_remote(&self.remote, |r| r.abort())
    }

    pub fn current_state(&self) -> TrxState {
        self.supervisor.current_state()
    }

    pub fn is_transmitting(&self) -> bool {
        self.supervisor.is_transmitting()
    }

    pub fn duty_cycle(&self, sample_period: Option<Duration>) -> f64 {
        self.supervisor.duty_cycle(sample_period)
    }

    pub fn time_since_last_tx_data(&self) -> Option<Duration> {
        self.supervisor.time_since_last_tx_data()
    }

    pub fn heartbeat(&self) -> Instant {
        self.supervisor.heartbeat()
    }

    pub fn history_report(&self) -> String {
        self.supervisor.history_report()
    }

    pub fn supervisor(&self) -> &TxSupervisor {
        &self.supervisor
    }

    pub fn stop(&self) {
        self.supervisor.stop();
    }
}
