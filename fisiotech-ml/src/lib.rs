//! Hybrid Movement Classifier
//!
//! ## Overview
//!
//! Classifies a 10-feature IMU vector into a movement label with a
//! confidence. The model is frozen: it is trained elsewhere, exported as
//! JSON artifacts and only ever evaluated here.
//!
//! ## Pipeline
//!
//! ```text
//! features(10) ──► StandardScaler ──► EmbeddingExtractor ──► TreeEnsemble ──► LabelEncoder
//!                  (x - mean)/scale   dense network,         bagged trees,    class index
//!                                     penultimate layer      mean of leaf     → label
//!                                     output                 distributions
//! ```
//!
//! The scaler is the only input-shape guard: a vector of the wrong length
//! is rejected with [`MLError::FeatureCount`] before any network or tree is
//! touched.
//!
//! The extractor and the ensemble sit behind the [`EmbeddingStage`] and
//! [`ClassifierStage`] traits, so each stage can be swapped or tested on its
//! own.
//!
//! ## Artifacts
//!
//! One directory, four files, each carrying `"format_version": 1`:
//!
//! | file              | contents                                          |
//! |-------------------|---------------------------------------------------|
//! | `scaler.json`     | per-feature `mean` and `scale`                    |
//! | `encoder.json`    | ordered `classes`                                 |
//! | `extractor.json`  | `input_width` and `dense` / `dropout` layers      |
//! | `classifier.json` | `n_features`, `n_classes` and node-array `trees`  |
//!
//! Artifacts are validated once, at load. Any missing file, parse error or
//! cross-artifact mismatch fails the load with [`MLError::ModelLoad`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use fisiotech_ml::{HybridModel, ModelArtifacts};
//!
//! let model = HybridModel::load(&ModelArtifacts::new("model"))?;
//! let out = model.predict(&[0.0, 0.9, 0.1, 1.2, 0.3, 0.1, 0.8, 0.91, 1.27, 1.15])?;
//! println!("{} ({:.3})", out.label, out.confidence);
//! # Ok::<(), fisiotech_ml::MLError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod artifacts;
pub mod client;
pub mod encoder;
pub mod extractor;
pub mod forest;
pub mod node;
pub mod pipeline;
pub mod scaler;
pub mod tree;

pub use artifacts::{ArtifactSet, ModelArtifacts, FORMAT_VERSION};
pub use client::LocalInferenceClient;
pub use encoder::LabelEncoder;
pub use extractor::{Activation, EmbeddingExtractor};
pub use forest::TreeEnsemble;
pub use node::{Node, NodeType};
pub use pipeline::{Classification, ClassifierStage, EmbeddingStage, HybridModel};
pub use scaler::StandardScaler;
pub use tree::DecisionTree;

use thiserror::Error;

/// Result type for model operations
pub type MLResult<T> = Result<T, MLError>;

/// Model errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MLError {
    /// Input vector has the wrong width
    #[error("X has {actual} features, but the model expects {expected}.")]
    FeatureCount {
        /// Width the stage was built for
        expected: usize,
        /// Width that was passed in
        actual: usize,
    },

    /// A persisted artifact is missing, unreadable or inconsistent
    #[error("Failed to load {artifact}: {reason}")]
    ModelLoad {
        /// Artifact name (`scaler`, `encoder`, ...)
        artifact: String,
        /// What went wrong
        reason: String,
    },

    /// Classifier produced an index the encoder does not know
    #[error("Class index {index} out of range for {classes} classes")]
    UnknownClass {
        /// Offending index
        index: usize,
        /// Number of known classes
        classes: usize,
    },
}

impl MLError {
    pub(crate) fn load(artifact: &str, reason: impl Into<String>) -> Self {
        Self::ModelLoad {
            artifact: artifact.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error is a rejection of the caller's input
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::FeatureCount { .. })
    }
}

/// Check a vector width
pub(crate) fn check_width(expected: usize, actual: &[f64]) -> MLResult<()> {
    if actual.len() != expected {
        return Err(MLError::FeatureCount {
            expected,
            actual: actual.len(),
        });
    }
    Ok(())
}

/// Index of the first maximum; ties go to the lowest index
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ if v.is_nan() => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
