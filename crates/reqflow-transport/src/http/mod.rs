//! HTTP transport implementation
//!
//! Provides a `reqwest`-backed client that implements the Transport trait.
//! It performs exactly one exchange per call and leaves retries to the caller.

pub mod client;

pub use client::{HttpTransport, HttpTransportConfig};
