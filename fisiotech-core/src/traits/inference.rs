//! Inference client abstraction

use crate::errors::InferenceError;

/// Outcome of classifying one feature vector
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredictionResult {
    /// Class label from the model's label set
    pub label: String,
    /// Probability of the winning class, in `[0, 1]`
    pub confidence: f64,
}

impl PredictionResult {
    /// Build a result, rejecting a confidence outside `[0, 1]` or non-finite
    pub fn new(label: impl Into<String>, confidence: f64) -> Result<Self, InferenceError> {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(InferenceError::MalformedResponse(format!(
                "confidence {} outside [0, 1]",
                confidence
            )));
        }

        Ok(Self {
            label: label.into(),
            confidence,
        })
    }
}

/// Anything that can classify a feature vector
///
/// Implementations must be callable from the ingestion thread while other
/// threads hold clones of the same `Arc`, hence `Send + Sync`.
///
/// ## Failure Semantics
///
/// Every failure is reported through [`InferenceError`]. The caller treats
/// each failure as local to the sample that triggered it: the sample is
/// skipped and no history is recorded for it.
pub trait InferenceClient: Send + Sync {
    /// Classify one feature vector
    fn predict(&self, features: &[f64]) -> Result<PredictionResult, InferenceError>;
}

impl<T: InferenceClient + ?Sized> InferenceClient for std::sync::Arc<T> {
    fn predict(&self, features: &[f64]) -> Result<PredictionResult, InferenceError> {
        (**self).predict(features)
    }
}

impl<T: InferenceClient + ?Sized> InferenceClient for Box<T> {
    fn predict(&self, features: &[f64]) -> Result<PredictionResult, InferenceError> {
        (**self).predict(features)
    }
}
