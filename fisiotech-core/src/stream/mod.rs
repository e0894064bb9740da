//! Stream processing for sensor data
//!
//! ## Module Organization
//!
//! - Core errors (this file)
//! - `link` - line reader over any `std::io::Read` sensor link (requires `std`)
//! - `memory` - scripted in-memory links for tests and replay

use core::fmt;

#[cfg(feature = "std")]
pub mod link;

#[cfg(feature = "stream-memory")]
pub mod memory;

#[cfg(feature = "std")]
pub use link::{LinkConfig, LinkStats, SensorLinkReader, MAX_LINE_LEN};

#[cfg(feature = "stream-memory")]
pub use memory::{ScriptedLink, ScriptedOpener, Step};

/// Errors that can occur while pulling from a stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamError<E> {
    /// Transport-level error; the stream may be polled again after a backoff
    Transport(E),
    /// The source is gone; every later poll returns this again
    EndOfStream,
}

impl<E> StreamError<E> {
    /// Whether the stream can never yield again
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }
}

impl<E: fmt::Display> fmt::Display for StreamError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::EndOfStream => write!(f, "End of stream"),
        }
    }
}

// Re-export traits for convenience
pub use crate::traits::Stream;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_error_display() {
        let err: StreamError<&str> = StreamError::Transport("connection lost");
        assert_eq!(format!("{}", err), "Transport error: connection lost");
        assert!(!err.is_fatal());

        let err: StreamError<&str> = StreamError::EndOfStream;
        assert_eq!(format!("{}", err), "End of stream");
        assert!(err.is_fatal());
    }
}
