//! HTTP inference client
//!
//! ## Overview
//!
//! Blocking client for the model service's JSON API (see [`crate::wire`]).
//! It implements [`InferenceClient`], so a [`Session`] can use a remote model
//! exactly like an in-process one.
//!
//! The client is built on a shared `ureq` agent, which keeps connections
//! alive between calls. Every request carries the configured timeout; a
//! request that exceeds it fails with [`HttpError::Timeout`].
//!
//! ## Error Mapping
//!
//! | HTTP outcome                  | [`InferenceError`]      |
//! |-------------------------------|-------------------------|
//! | `200` with a valid body       | -                       |
//! | `200` with an unreadable body | `MalformedResponse`     |
//! | `4xx`                         | `Rejected` (not retried)|
//! | `5xx`, `429`                  | `Transport`             |
//! | connect/IO failure            | `Transport`             |
//! | timeout                       | `Timeout`               |
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fisiotech_connectors::http::{HttpConfig, HttpInferenceClient};
//! use std::time::Duration;
//!
//! let config = HttpConfig::new("https://models.clinic.local")
//!     .bearer_token("your-api-token")
//!     .timeout(Duration::from_secs(1))
//!     .max_retries(2);
//!
//! let client = HttpInferenceClient::new(config)?;
//! let health = client.health()?;
//! println!("classes: {:?}", health.classes);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`Session`]: fisiotech_core::Session

use std::collections::HashMap;
use std::io;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use base64::Engine;
use fisiotech_core::{InferenceClient, InferenceError, PredictionResult};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::wire::{ErrorResponse, HealthResponse, PredictRequest, PredictResponse};
use crate::ConnectionStats;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP-specific errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(String),

    /// No answer within the configured timeout
    #[error("Request timed out after {millis} ms")]
    Timeout {
        /// Configured timeout
        millis: u64,
    },

    /// Server returned an error status
    #[error("Server error {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error message from the body, or the raw body
        message: String,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HttpError {
    /// Worth retrying the same request
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(_) | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Serialization(_) | Self::Config(_) => false,
        }
    }
}

impl From<HttpError> for InferenceError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Timeout { millis } => InferenceError::Timeout { millis },
            HttpError::Status { status, message } if (400..500).contains(&status) && status != 429 => {
                InferenceError::Rejected(message)
            }
            HttpError::Serialization(msg) => InferenceError::MalformedResponse(msg),
            other => InferenceError::Transport(other.to_string()),
        }
    }
}

/// HTTP configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL of the model service
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Authentication method
    pub auth: AuthMethod,
    /// Custom headers
    pub headers: HashMap<String, String>,
    /// Extra attempts after a retryable failure
    pub max_retries: u32,
    /// Delay before the first retry, doubled each attempt
    pub retry_backoff: Duration,
    /// User agent string
    pub user_agent: String,
}

/// Authentication methods
#[derive(Debug, Clone)]
pub enum AuthMethod {
    /// No authentication
    None,
    /// Bearer token
    Bearer(String),
    /// Basic authentication
    Basic { username: String, password: String },
    /// API key in header
    ApiKey { header: String, value: String },
}

impl HttpConfig {
    /// Create new configuration with base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            auth: AuthMethod::None,
            headers: HashMap::new(),
            max_retries: 0,
            retry_backoff: Duration::from_millis(100),
            user_agent: format!("FisioTech/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set bearer token authentication
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = AuthMethod::Bearer(token.into());
        self
    }

    /// Set basic authentication
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::Basic {
            username: username.into(),
            password: password.into(),
        };
        self
    }

    /// Set API key authentication
    pub fn api_key(mut self, header: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth = AuthMethod::ApiKey {
            header: header.into(),
            value: value.into(),
        };
        self
    }

    /// Set request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the first retry delay
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Add custom header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Remote [`InferenceClient`] using the lightweight `ureq` client
pub struct HttpInferenceClient {
    config: HttpConfig,
    agent: ureq::Agent,
    stats: Mutex<ConnectionStats>,
}

impl HttpInferenceClient {
    /// Create new HTTP client
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(HttpError::Config("Base URL must start with http:// or https://".into()));
        }
        if config.timeout.is_zero() {
            return Err(HttpError::Config("timeout must be positive".into()));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();

        Ok(Self {
            config,
            agent,
            stats: Mutex::new(ConnectionStats::default()),
        })
    }

    /// Configuration in use
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// `POST /predict` with unscaled features
    pub fn predict_request(&self, features: &[f64]) -> Result<PredictResponse, HttpError> {
        let body = serde_json::to_string(&PredictRequest {
            features: features.to_vec(),
        })
        .map_err(|e| HttpError::Serialization(e.to_string()))?;

        self.execute_with_retry("POST", "/predict", Some(&body))
    }

    /// `GET /`
    pub fn health(&self) -> Result<HealthResponse, HttpError> {
        self.execute_with_retry("GET", "/", None)
    }

    /// Snapshot of the request counters
    pub fn stats(&self) -> ConnectionStats {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Build request with authentication and headers
    fn build_request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.config.base_url, path);
        let mut request = self.agent.request(method, &url);

        match &self.config.auth {
            AuthMethod::None => {}
            AuthMethod::Bearer(token) => {
                request = request.set("Authorization", &format!("Bearer {}", token));
            }
            AuthMethod::Basic { username, password } => {
                let credentials =
                    base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", username, password));
                request = request.set("Authorization", &format!("Basic {}", credentials));
            }
            AuthMethod::ApiKey { header, value } => {
                request = request.set(header, value);
            }
        }

        for (name, value) in &self.config.headers {
            request = request.set(name, value);
        }

        request
            .set("Content-Type", "application/json")
            .set("Accept", "application/json")
    }

    fn execute_with_retry<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        body: Option<&str>,
    ) -> Result<T, HttpError> {
        let mut attempt = 0;
        loop {
            match self.execute(method, path, body) {
                Ok(value) => {
                    self.with_stats(|s| s.messages_sent += 1);
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.retry_backoff * (1 << (attempt - 1).min(16));
                    debug!("{} {} failed ({}), retry {} in {:?}", method, path, e, attempt, delay);
                    self.with_stats(|s| s.retries += 1);
                    std::thread::sleep(delay);
                }
                Err(e) => {
                    warn!("{} {} failed: {}", method, path, e);
                    self.with_stats(|s| {
                        s.messages_failed += 1;
                        s.last_error = Some(e.to_string());
                    });
                    return Err(e);
                }
            }
        }
    }

    fn execute<T: DeserializeOwned>(&self, method: &str, path: &str, body: Option<&str>) -> Result<T, HttpError> {
        let request = self.build_request(method, path);
        let response = match body {
            Some(json) => {
                self.with_stats(|s| s.bytes_sent += json.len() as u64);
                request.send_string(json)
            }
            None => request.call(),
        };

        match response {
            Ok(resp) => {
                let text = resp.into_string().map_err(|e| self.io_error(e))?;
                self.with_stats(|s| s.bytes_received += text.len() as u64);
                serde_json::from_str(&text).map_err(|e| HttpError::Serialization(e.to_string()))
            }
            Err(ureq::Error::Status(status, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                let message = serde_json::from_str::<ErrorResponse>(&text)
                    .map(|e| e.error)
                    .unwrap_or(text);
                Err(HttpError::Status { status, message })
            }
            Err(ureq::Error::Transport(transport)) => {
                if transport_timed_out(&transport) {
                    Err(self.timeout_error())
                } else {
                    Err(HttpError::Request(transport.to_string()))
                }
            }
        }
    }

    fn io_error(&self, e: io::Error) -> HttpError {
        if is_timeout_kind(e.kind()) {
            self.timeout_error()
        } else {
            HttpError::Request(e.to_string())
        }
    }

    fn timeout_error(&self) -> HttpError {
        HttpError::Timeout {
            millis: self.config.timeout.as_millis() as u64,
        }
    }

    fn with_stats(&self, update: impl FnOnce(&mut ConnectionStats)) {
        update(&mut self.stats.lock().unwrap_or_else(PoisonError::into_inner));
    }
}

impl InferenceClient for HttpInferenceClient {
    fn predict(&self, features: &[f64]) -> Result<PredictionResult, InferenceError> {
        let response = self.predict_request(features)?;
        PredictionResult::new(response.label, response.confidence)
    }
}

fn is_timeout_kind(kind: io::ErrorKind) -> bool {
    matches!(kind, io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

fn transport_timed_out(transport: &ureq::Transport) -> bool {
    std::error::Error::source(transport)
        .and_then(|source| source.downcast_ref::<io::Error>())
        .map_or(false, |e| is_timeout_kind(e.kind()))
}
