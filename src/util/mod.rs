//! Utility types and functions for the relay.
//!
//! - [`sig_down`] - Graceful shutdown signal handling
//! - [`telemetry`] - tracing/logging setup
//! - [`request_id`] - request-id and receipt-id generation
//! - [`b64`] - base64 wire encoding for transaction bytes

pub mod b64;
pub mod request_id;
pub mod sig_down;
pub mod telemetry;

pub use b64::*;
pub use request_id::*;
pub use sig_down::*;
pub use telemetry::*;
