//! Core Traits and Abstractions
//!
//! ## Module Organization
//!
//! - [`stream`] - pull-based sample streams
//! - [`link`] - opening a byte link to a sensor (requires `std`)
//! - [`inference`] - classifying a feature vector (requires `std`)
//!
//! The session is generic over [`LinkOpener`] and holds an
//! `Arc<dyn InferenceClient>`, so the same loop drives a serial port or a
//! TCP bridge, and a remote HTTP model or an in-process one.

pub mod stream;

#[cfg(feature = "std")]
pub mod inference;
#[cfg(feature = "std")]
pub mod link;

pub use stream::Stream;

#[cfg(feature = "std")]
pub use inference::{InferenceClient, PredictionResult};
#[cfg(feature = "std")]
pub use link::{LinkOpener, LinkTarget};
