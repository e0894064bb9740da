//! Transport Connectors
//!
//! ## Overview
//!
//! Everything that crosses a process boundary lives here:
//!
//! - [`wire`]: JSON bodies of the inference API, shared by client and server
//! - [`http`]: blocking HTTP [`InferenceClient`](fisiotech_core::InferenceClient)
//! - [`tcp`]: sensor links bridged over TCP
//! - [`serial`]: sensor links on a serial port (feature `serial`)
//! - [`link`]: picks TCP or serial from the address
//!
//! ## Connector Selection Guide
//!
//! ### Sensor links
//!
//! | address               | link   | notes                          |
//! |-----------------------|--------|--------------------------------|
//! | `/dev/ttyUSB0`, `COM3`| serial | baud from the target, 9600 default |
//! | `tcp://host:port`     | TCP    | baud ignored                   |
//! | `host:port`           | TCP    | baud ignored                   |
//!
//! Every link is opened with the read timeout from
//! [`LinkConfig`](fisiotech_core::stream::LinkConfig), so a reader blocked on
//! a silent sensor wakes up at least once per timeout.
//!
//! ### Inference
//!
//! The HTTP client posts raw (unscaled) features; the model service scales
//! them itself. Transport failures are reported as transient
//! [`InferenceError`](fisiotech_core::InferenceError)s, a `4xx` answer as a
//! rejection.
//!
//! ## Retry Logic
//!
//! HTTP retries are off by default. When enabled, the delay doubles each
//! attempt:
//! ```text
//! delay = retry_backoff * 2^(attempt - 1)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fisiotech_connectors::http::{HttpConfig, HttpInferenceClient};
//! use fisiotech_core::InferenceClient;
//!
//! let client = HttpInferenceClient::new(HttpConfig::new("http://127.0.0.1:5000"))?;
//! let p = client.predict(&[0.0; 10])?;
//! println!("{} {:.3}", p.label, p.confidence);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod link;
pub mod tcp;
pub mod wire;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "serial")]
pub mod serial;

// Re-export common types
pub use link::{DeviceLinkOpener, LinkKind};
pub use tcp::TcpLinkOpener;

#[cfg(feature = "http")]
pub use http::{AuthMethod, HttpConfig, HttpError, HttpInferenceClient};

#[cfg(feature = "serial")]
pub use serial::SerialLinkOpener;

use thiserror::Error;

/// Common connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Link address could not be understood
    #[error("Invalid link address {0:?}")]
    InvalidAddress(String),

    /// The connector for this address was not compiled in
    #[error("{0} links are not supported by this build")]
    Unsupported(&'static str),

    /// HTTP client failure
    #[cfg(feature = "http")]
    #[error(transparent)]
    Http(#[from] HttpError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Connection statistics common to all connectors
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Requests answered successfully
    pub messages_sent: u64,
    /// Requests that failed after all retries
    pub messages_failed: u64,
    /// Retries performed
    pub retries: u64,
    /// Request body bytes sent
    pub bytes_sent: u64,
    /// Response body bytes received
    pub bytes_received: u64,
    /// Last error message
    pub last_error: Option<String>,
}
