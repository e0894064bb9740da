//! Error Types for the Streaming Pipeline
//!
//! ## Error Categories
//!
//! Failures fall into two groups that are handled very differently:
//!
//! ### Per-sample failures (absorbed by the ingestion loop)
//! - [`ParseError`]: a sensor line that is not a valid sample. The line is
//!   dropped and counted, nothing else happens.
//! - [`InferenceError::Transport`] / [`InferenceError::Timeout`] /
//!   [`InferenceError::MalformedResponse`]: the model could not be reached for
//!   this sample. The sample is skipped and a status update is emitted.
//!
//! ### Structural failures (surfaced to the caller)
//! - [`InferenceError::Rejected`]: the model refused the input shape.
//! - [`SessionError`]: the session could not be started.
//!
//! Model artifact failures live in `fisiotech-ml` because only the model
//! service can detect them.
//!
//! ## Handling Strategy
//!
//! ```rust
//! use fisiotech_core::{ParseError, SensorSample};
//!
//! match SensorSample::parse_line("abc,1,2") {
//!     Ok(sample) => { let _ = sample; }
//!     Err(ParseError::TooFewFields { found }) => assert_eq!(found, 2),
//!     Err(_) => {}
//! }
//! ```

use thiserror_no_std::Error;

/// Result type for sample parsing
pub type ParseResult<T> = Result<T, ParseError>;

/// Why a sensor line was not accepted as a sample
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Line is empty after trimming
    #[error("Empty line")]
    Empty,

    /// Line has no comma separator at all
    #[error("Line has no field separator")]
    MissingSeparator,

    /// Fewer than 7 tokens parsed as numbers
    #[error("Only {found} numeric fields, need 7")]
    TooFewFields {
        /// Number of tokens that parsed as floats
        found: usize,
    },

    /// Line did not fit in the line buffer and was discarded
    #[error("Line exceeds {max} bytes")]
    LineTooLong {
        /// Maximum accepted line length
        max: usize,
    },
}

#[cfg(feature = "std")]
pub use self::std_errors::*;

#[cfg(feature = "std")]
mod std_errors {
    use thiserror_no_std::Error;

    /// Failure of a single inference call
    #[derive(Error, Debug, Clone, PartialEq)]
    pub enum InferenceError {
        /// Connection refused, reset, DNS failure, server error
        #[error("Transport failure: {0}")]
        Transport(String),

        /// No answer within the configured timeout
        #[error("Inference timed out after {millis} ms")]
        Timeout {
            /// Timeout that elapsed
            millis: u64,
        },

        /// Answer arrived but could not be understood
        #[error("Malformed response: {0}")]
        MalformedResponse(String),

        /// The model refused the request (e.g. wrong feature count)
        #[error("Request rejected: {0}")]
        Rejected(String),
    }

    impl InferenceError {
        /// Whether the failure is local to this sample and the loop should
        /// just move on to the next line
        pub fn is_transient(&self) -> bool {
            !matches!(self, Self::Rejected(_))
        }
    }

    /// Session lifecycle errors
    #[derive(Error, Debug)]
    pub enum SessionError {
        /// `connect` called while a link is already open or opening
        #[error("Session already connected")]
        AlreadyConnected,

        /// The link could not be opened
        #[error("Failed to open link {target}: {source}")]
        Connect {
            /// Address that was being opened
            target: String,
            /// Underlying I/O error
            #[source]
            source: std::io::Error,
        },

        /// A worker thread could not be spawned
        #[error("Failed to spawn {name} thread: {source}")]
        Spawn {
            /// Thread name
            name: &'static str,
            /// Underlying I/O error
            #[source]
            source: std::io::Error,
        },
    }
}
