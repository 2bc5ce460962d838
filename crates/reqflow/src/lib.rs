//! # reqflow
//!
//! Declarative HTTP requests over an injectable transport, supporting:
//! - Status classification with composable predicates
//! - Pluggable retry/backoff policies with cancellation and deadlines
//! - Structured, redacted errors with retryable / not-found / exists flags
//! - Pluggable body encoding, decoding and authorization
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reqflow::prelude::*;
//! use reqflow::status;
//! use reqflow_transport::HttpTransport;
//! use std::time::Duration;
//!
//! #[derive(serde::Serialize)]
//! struct NewWidget {
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder(HttpTransport::new()?)
//!         .base_url("https://api.example.com")
//!         .auth(reqflow::auth::bearer_token("token"))
//!         .backoff(BackoffFactory::exponential(
//!             Duration::from_millis(100),
//!             Duration::from_secs(5),
//!             4,
//!         ))
//!         .build();
//!
//!     let result = client
//!         .post("/widgets")
//!         .body(NewWidget { name: "sprocket".into() })
//!         .success(status::created())
//!         .exists(status::conflict())
//!         .retry_status(status::in_range(500, 599))
//!         .send(&CallContext::new().with_timeout(Duration::from_secs(30)))
//!         .await;
//!
//!     match result {
//!         Ok(_) => println!("created"),
//!         Err(err) if err.is_exists() => println!("already there"),
//!         Err(err) => return Err(err.into()),
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export commonly used types
pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use error::{ClientError, Error, Result};
pub use request::Request;
pub use status::StatusPredicate;

// Module declarations
pub mod auth;
pub mod body;
pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod observability;
pub mod request;
pub mod status;

// Re-export the crates the public API is built on
pub use reqflow_core;
pub use reqflow_transport;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use reqflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::Client;
    pub use crate::error::{Error, Result};
    pub use crate::request::Request;
    pub use crate::status::StatusPredicate;
    pub use reqflow_core::retry::{
        BackoffConfig, BackoffFactory, CallContext, CancelError, CancellationToken,
    };
    pub use reqflow_transport::{HttpRequest, HttpResponse, Transport, TransportError};
}
