//! Remote control port trait

use std::sync::{Arc, Mutex};

use crate::domain::{FldigiError, FldigiResult, TxPayload};

/// Trait for remote control of the modem application (fldigi).
///
/// Every call may fail transiently; callers decide whether to retry.
pub trait RemoteControl: Send {
    /// Raw transmit/receive/tune status as reported by the endpoint.
    /// Normalization into `TrxState` is the sampler's job.
    fn query_trx_state(&mut self) -> FldigiResult<String>;

    /// Data transmitted since the previous call. `None` when nothing new
    /// went out, which is the common case.
    fn query_tx_data(&mut self) -> FldigiResult<Option<TxPayload>>;

    /// Key the transmitter
    fn request_transmit(&mut self) -> FldigiResult<()>;

    /// Return to receive
    fn request_receive(&mut self) -> FldigiResult<()>;

    /// Abort a transmit or tune in progress
    fn abort(&mut self) -> FldigiResult<()>;

    /// Append to the pending transmit buffer
    fn push_text(&mut self, payload: &TxPayload) -> FldigiResult<()>;

    /// Discard whatever is still queued for transmission
    fn clear_pending_text(&mut self) -> FldigiResult<()>;
}

/// The endpoint shared between the supervisor and callers.
///
/// The protocol has no atomic add-and-fetch for the transmit buffer, so
/// every endpoint call goes through this one lock.
pub type SharedRemote = Arc<Mutex<Box<dyn RemoteControl>>>;

pub fn shared_remote(remote: Box<dyn RemoteControl>) -> SharedRemote {
    Arc::new(Mutex::new(remote))
}

/// Lock the endpoint and run `f` on it.
pub fn with_remote<T>(
    remote: &SharedRemote,
    f: impl FnOnce(&mut Box<dyn RemoteControl>) -> FldigiResult<T>,
) -> FldigiResult<T> {
    let mut guard = remote
        .lock()
        .map_err(|_| FldigiError::Remote("Remote endpoint state corrupted".into()))?;
    f(&mut guard)
}
