//! fldigi remote control with a transmit safety supervisor
//!
//! Drives a running fldigi instance over its XML-RPC interface and keeps a
//! background supervisor watching it, so a transmission that stops
//! producing data is returned to receive instead of leaving the
//! transmitter keyed.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Pure domain types, no I/O dependencies
//! - `ports/` - Trait definitions (interfaces) for external dependencies
//! - `rpc/` - XML-RPC request encoding and response decoding (pure) plus a session
//! - `adapters/` - Implementations of ports (HTTP transport, fldigi, mock)
//! - `monitor/` - State ledger, sampler and the transmit supervisor
//! - `client` - Facade tying an endpoint to its supervisor

// Core domain (pure, no I/O)
pub mod domain;
pub mod ports;
pub mod rpc;

// Adapters (external I/O)
pub mod adapters;

// Supervision
pub mod client;
pub mod monitor;

pub use client::Client;
pub use domain::{ClientConfig, FldigiError, FldigiResult, SupervisorConfig, TrxState, TxPayload};
pub use monitor::TxSupervisor;
