//! XML-RPC method layer for fldigi.
//!
//! This module separates the three concerns of talking to fldigi:
//! - `encode`: translate RpcCall → `<methodCall>` body (pure, no I/O)
//! - `decode`: translate `<methodResponse>` body → RpcResponse (pure, no I/O)
//! - `session`: own the transport, drive request/response and logging
//!
//! Only the handful of methods the transmit path needs are modelled; the
//! wire subset is the scalar part of XML-RPC that fldigi actually returns.

pub mod decode;
pub mod encode;
pub mod session;

pub use decode::decode;
pub use encode::encode;
pub use session::RpcSession;

use crate::domain::TxPayload;

/// fldigi XML-RPC methods used by this crate.
#[derive(Debug, PartialEq, Clone)]
pub enum RpcCall {
    /// Program name, used as a connection handshake
    Name,
    /// "tx", "rx" or "tune"
    GetTrxStatus,
    /// Characters transmitted since the last query (base64)
    GetTxData,
    Tx,
    Rx,
    Abort,
    AddTx(String),
    AddTxBytes(Vec<u8>),
    ClearTx,
}

impl RpcCall {
    pub fn method_name(&self) -> &'static str {
        use RpcCall::*;
        match self {
            Name => "fldigi.name",
            GetTrxStatus => "main.get_trx_status",
            GetTxData => "tx.get_data",
            Tx => "main.tx",
            Rx => "main.rx",
            Abort => "main.abort",
            AddTx(_) => "text.add_tx",
            AddTxBytes(_) => "text.add_tx_bytes",
            ClearTx => "text.clear_tx",
        }
    }

    /// The call that appends `payload` to fldigi's TX buffer.
    pub fn add_tx(payload: &TxPayload) -> Self {
        match payload {
            TxPayload::Text(text) => RpcCall::AddTx(text.clone()),
            TxPayload::Bytes(bytes) => RpcCall::AddTxBytes(bytes.clone()),
        }
    }
}

/// Scalar XML-RPC values.
#[derive(Debug, PartialEq, Clone)]
pub enum RpcValue {
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Bytes(Vec<u8>),
}

/// Parsed responses from fldigi.
#[derive(Debug, PartialEq)]
pub enum RpcResponse {
    /// Raw status string, normalized later by the sampler
    TrxStatus(String),
    /// `None` when nothing was transmitted since the last query
    TxData(Option<TxPayload>),
    Name(String),
    /// Method executed; its return value carries no information
    Ack,
}
