//! Core domain types
//!
//! Pure types with no I/O dependencies: the transmit/receive state
//! enumeration, transmit payloads, errors and configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;
