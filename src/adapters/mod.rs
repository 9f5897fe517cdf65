//! Adapters: implementations of the port traits
//!
//! - `http_transport` - XML-RPC over HTTP (reqwest)
//! - `fldigi` - `RemoteControl` backed by fldigi's XML-RPC methods
//! - `mock_remote` - simulated fldigi for development and tests

pub mod fldigi;
pub mod http_transport;
pub mod mock_remote;

pub use fldigi::FldigiRemote;
pub use http_transport::HttpTransport;
pub use mock_remote::{MockCall, MockHandle, MockRemote};
