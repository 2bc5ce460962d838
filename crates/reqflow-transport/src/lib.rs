//! Transport abstraction layer for reqflow
//!
//! The request executor never talks to the network itself. It hands a fully
//! built [`HttpRequest`] to a [`Transport`] and gets back an [`HttpResponse`]
//! whose body is a single-use byte stream.
//!
//! # Architecture
//!
//! - **Transport trait**: the one capability the executor consumes
//! - **HTTP transport**: a `reqwest`-backed implementation
//! - **Error handling**: [`TransportError`], with an explicit retryable marker

#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! # Usage
//!
//! ```ignore
//! use reqflow_transport::{HttpRequest, HttpTransport, Transport};
//!
//! let transport = HttpTransport::new()?;
//! let request = HttpRequest::new(http::Method::GET, "https://example.com/health".parse()?);
//! let mut response = transport.send_http(request).await?;
//! let body = response.body.collect().await?;
//! ```

pub mod body;
pub mod error;
pub mod http;
pub mod traits;

// Re-export commonly used types
pub use body::ResponseBody;
pub use error::{Result, TransportError};
pub use self::http::{HttpTransport, HttpTransportConfig};
pub use traits::{HttpRequest, HttpResponse, Transport};
