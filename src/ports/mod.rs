//! Port traits (interfaces)
//!
//! These traits define the boundaries between the supervisor core and
//! external I/O. Adapters implement them to reach a real fldigi instance
//! or a simulated one.

pub mod remote;
pub mod transport;

pub use remote::*;
pub use transport::*;
