//! Transmit safety supervision
//!
//! - `ledger` - bounded history of TRX state intervals and transmitted data
//! - `sampler` - retrying status/data queries normalized to `TrxState`
//! - `supervisor` - background thread that returns fldigi to RX when a
//!   transmission goes quiet
//! - `transmit` - supervised send operation

pub mod ledger;
pub mod sampler;
pub mod supervisor;
mod transmit;

pub use ledger::{Ledger, StateInterval, TxDataEvent};
pub use sampler::StateSampler;
pub use supervisor::TxSupervisor;
