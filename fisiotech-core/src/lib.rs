//! Core streaming engine for FisioTech
//!
//! Turns raw IMU lines from a physiotherapy sensor into feature vectors,
//! keeps a bounded history of classification results and derives a
//! stability diagnosis from it.
//!
//! Key constraints:
//! - History never grows past [`history::HISTORY_CAPACITY`] entries
//! - Feature vectors always carry exactly [`features::FEATURE_COUNT`] fields
//! - A bad line or a failed inference never stops the ingestion loop
//!
//! The pure parts (samples, features, buffers, diagnosis) build without
//! `std`. Link reading and the session loops need the `std` feature.
//!
//! ```no_run
//! use fisiotech_core::{SensorSample, FeatureVector, HistoryBuffer, StabilityDiagnoser};
//!
//! let sample = SensorSample::parse_line("0.01,0.98,0.05,1.2,0.4,0.1,0.82").unwrap();
//! let features = FeatureVector::derive(&sample);
//!
//! let mut history = HistoryBuffer::new();
//! history.record(sample.intensity, 0.91);
//!
//! let diagnosis = StabilityDiagnoser::diagnose_snapshot(&history.snapshot());
//! # let _ = (features, diagnosis);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod buffer;
pub mod diagnosis;
pub mod errors;
pub mod features;
pub mod history;
pub mod sample;
pub mod stream;
pub mod traits;

#[cfg(feature = "std")]
pub mod session;

// Public API
pub use diagnosis::{ConfidenceLevel, DiagnosisRecord, Severity, StabilityDiagnoser, StabilityMetrics};
pub use errors::{ParseError, ParseResult};
pub use features::{FeatureVector, FEATURE_COUNT};
pub use history::{HistoryBuffer, HistorySnapshot, HISTORY_CAPACITY};
pub use sample::SensorSample;

#[cfg(feature = "std")]
pub use errors::{InferenceError, SessionError};
#[cfg(feature = "std")]
pub use session::{ConnectionState, LinkStatus, Session, SessionConfig, SessionObserver};
#[cfg(feature = "std")]
pub use traits::{InferenceClient, LinkOpener, LinkTarget, PredictionResult};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
