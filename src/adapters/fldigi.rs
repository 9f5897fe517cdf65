//! fldigi adapter: remote control over XML-RPC
//!
//! Maps each `RemoteControl` operation onto one fldigi XML-RPC method and
//! checks that the reply has the expected shape. Owns the RPC session.

use std::time::Duration;

use crate::domain::{FldigiError, FldigiResult, TxPayload};
use crate::ports::{RemoteControl, RpcTransport};
use crate::rpc::{RpcCall, RpcResponse, RpcSession};

/// fldigi adapter. Owns the RPC session and remembers whether it keyed
/// the transmitter.
pub struct FldigiRemote {
    session: RpcSession,
    tx_requested: bool,
}

impl FldigiRemote {
    pub fn new(transport: Box<dyn RpcTransport>) -> Self {
        Self {
            session: RpcSession::new(transport),
            tx_requested: false,
        }
    }

    /// Program name reported by the server (`"fldigi"` for the real thing).
    pub fn name(&mut self) -> FldigiResult<String> {
        match self.session.execute(&RpcCall::Name)? {
            RpcResponse::Name(name) => Ok(name),
            other => Err(unexpected(&RpcCall::Name, other)),
        }
    }

    fn execute_ack(&mut self, call: &RpcCall) -> FldigiResult<()> {
        match self.session.execute(call)? {
            RpcResponse::Ack => Ok(()),
            other => Err(unexpected(call, other)),
        }
    }
}

fn unexpected(call: &RpcCall, response: RpcResponse) -> FldigiError {
    FldigiError::Rpc(format!(
        "Unexpected response to {}: {response:?}",
        call.method_name()
    ))
}

impl RemoteControl for FldigiRemote {
    fn query_trx_state(&mut self) -> FldigiResult<String> {
        match self.session.execute(&RpcCall::GetTrxStatus)? {
            RpcResponse::TrxStatus(raw) => Ok(raw),
            other => Err(unexpected(&RpcCall::GetTrxStatus, other)),
        }
    }

    fn query_tx_data(&mut self) -> FldigiResult<Option<TxPayload>> {
        match self.session.execute(&RpcCall::GetTxData)? {
            RpcResponse::TxData(data) => Ok(data),
            other => Err(unexpected(&RpcCall::GetTxData, other)),
        }
    }

    fn request_transmit(&mut self) -> FldigiResult<()> {
        self.execute_ack(&RpcCall::Tx)?;
        self.tx_requested = true;
        Ok(())
    }

    fn request_receive(&mut self) -> FldigiResult<()> {
        self.execute_ack(&RpcCall::Rx)?;
        self.tx_requested = false;
        Ok(())
    }

    fn abort(&mut self) -> FldigiResult<()> {
        self.execute_ack(&RpcCall::Abort)?;
        self.tx_requested = false;
        Ok(())
    }

    fn push_text(&mut self, payload: &TxPayload) -> FldigiResult<()> {
        self.execute_ack(&RpcCall::add_tx(payload))
    }

    fn clear_pending_text(&mut self) -> FldigiResult<()> {
        self.execute_ack(&RpcCall::ClearTx)
    }
}

/// Safety: return fldigi to receive if the adapter is dropped after keying
/// the transmitter. Retries up to 3 times with increasing delays in case
/// the first attempt fails (e.g. fldigi momentarily busy).
impl Drop for FldigiRemote {
    fn drop(&mut self) {
        if self.tx_requested {
            for delay_ms in [0, 10, 50] {
                if delay_ms > 0 {
                    std::thread::sleep(Duration::from_millis(delay_ms));
                }
                if self.request_receive().is_ok() {
                    return;
                }
            }
            log::error!("CRITICAL: Failed to return fldigi to RX on drop. Radio may still be transmitting!");
        }
    }
}
