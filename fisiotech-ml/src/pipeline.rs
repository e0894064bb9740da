//! Hybrid model pipeline
//!
//! Composes the four frozen parts into one pure function:
//!
//! ```text
//! scale ──► embed ──► classify ──► decode
//!   │         │          │            │
//!   │         │          │            └─ LabelEncoder
//!   │         │          └─ dyn ClassifierStage (TreeEnsemble)
//!   │         └─ dyn EmbeddingStage (EmbeddingExtractor)
//!   └─ StandardScaler, the only input-shape guard
//! ```
//!
//! Stage widths are checked once, when the model is assembled, so a
//! successfully built model can only fail on the caller's input width.

use fisiotech_core::{PredictionResult, FEATURE_COUNT};
use log::info;

use crate::artifacts::{ArtifactSet, ModelArtifacts};
use crate::encoder::LabelEncoder;
use crate::extractor::EmbeddingExtractor;
use crate::forest::TreeEnsemble;
use crate::scaler::StandardScaler;
use crate::{argmax, MLError, MLResult};

/// Scaled features to embedding
pub trait EmbeddingStage: Send + Sync {
    /// Expected input width
    fn input_width(&self) -> usize;

    /// Output width
    fn embedding_width(&self) -> usize;

    /// Compute the embedding
    fn embed(&self, scaled: &[f64]) -> MLResult<Vec<f64>>;
}

/// Embedding to per-class probabilities
pub trait ClassifierStage: Send + Sync {
    /// Expected embedding width
    fn n_features(&self) -> usize;

    /// Length of the probability vector
    fn n_classes(&self) -> usize;

    /// Per-class probabilities, summing to 1
    fn predict_proba(&self, embedding: &[f64]) -> MLResult<Vec<f64>>;
}

impl EmbeddingStage for EmbeddingExtractor {
    fn input_width(&self) -> usize {
        EmbeddingExtractor::input_width(self)
    }

    fn embedding_width(&self) -> usize {
        EmbeddingExtractor::embedding_width(self)
    }

    fn embed(&self, scaled: &[f64]) -> MLResult<Vec<f64>> {
        EmbeddingExtractor::embed(self, scaled)
    }
}

impl ClassifierStage for TreeEnsemble {
    fn n_features(&self) -> usize {
        TreeEnsemble::n_features(self)
    }

    fn n_classes(&self) -> usize {
        TreeEnsemble::n_classes(self)
    }

    fn predict_proba(&self, embedding: &[f64]) -> MLResult<Vec<f64>> {
        TreeEnsemble::predict_proba(self, embedding)
    }
}

/// Full output of one classification
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Winning class index
    pub index: usize,
    /// Winning class label
    pub label: String,
    /// Probability of the winning class
    pub confidence: f64,
    /// Every class probability, encoder order
    pub probabilities: Vec<f64>,
}

impl Classification {
    /// Drop everything but label and confidence
    pub fn into_prediction(self) -> PredictionResult {
        PredictionResult {
            label: self.label,
            confidence: self.confidence,
        }
    }
}

/// Scaler, extractor, classifier and encoder composed
pub struct HybridModel {
    scaler: StandardScaler,
    extractor: Box<dyn EmbeddingStage>,
    classifier: Box<dyn ClassifierStage>,
    encoder: LabelEncoder,
}

impl std::fmt::Debug for HybridModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridModel")
            .field("features", &self.scaler.width())
            .field("embedding", &self.extractor.embedding_width())
            .field("classes", &self.encoder.classes())
            .finish()
    }
}

impl HybridModel {
    /// Assemble a model, checking that adjacent stages agree on widths
    pub fn new(
        scaler: StandardScaler,
        extractor: Box<dyn EmbeddingStage>,
        classifier: Box<dyn ClassifierStage>,
        encoder: LabelEncoder,
    ) -> MLResult<Self> {
        if scaler.width() != FEATURE_COUNT {
            return Err(MLError::load(
                "scaler",
                format!("{} features, expected {}", scaler.width(), FEATURE_COUNT),
            ));
        }
        if extractor.input_width() != scaler.width() {
            return Err(MLError::load(
                "extractor",
                format!("input width {} but scaler has {}", extractor.input_width(), scaler.width()),
            ));
        }
        if classifier.n_features() != extractor.embedding_width() {
            return Err(MLError::load(
                "classifier",
                format!(
                    "n_features {} but embedding width is {}",
                    classifier.n_features(),
                    extractor.embedding_width()
                ),
            ));
        }
        if classifier.n_classes() != encoder.len() {
            return Err(MLError::load(
                "classifier",
                format!("n_classes {} but encoder has {}", classifier.n_classes(), encoder.len()),
            ));
        }

        Ok(Self {
            scaler,
            extractor,
            classifier,
            encoder,
        })
    }

    /// Build from parsed artifacts
    pub fn from_artifacts(set: ArtifactSet) -> MLResult<Self> {
        Self::new(
            StandardScaler::from_artifact(set.scaler)?,
            Box::new(EmbeddingExtractor::from_artifact(set.extractor)?),
            Box::new(TreeEnsemble::from_artifact(set.classifier)?),
            LabelEncoder::from_artifact(set.encoder)?,
        )
    }

    /// Read, validate and assemble the artifacts
    pub fn load(artifacts: &ModelArtifacts) -> MLResult<Self> {
        let model = Self::from_artifacts(ArtifactSet::load(artifacts)?)?;
        info!(
            "Model ready: {} features, embedding {}, classes {:?}",
            model.scaler.width(),
            model.extractor.embedding_width(),
            model.encoder.classes()
        );
        Ok(model)
    }

    /// Class labels in index order
    pub fn classes(&self) -> &[String] {
        self.encoder.classes()
    }

    /// Expected input width
    pub fn feature_count(&self) -> usize {
        self.scaler.width()
    }

    /// Stage 1: standardize
    pub fn scale(&self, features: &[f64]) -> MLResult<Vec<f64>> {
        self.scaler.transform(features)
    }

    /// Stage 2: embedding of a scaled vector
    pub fn embed(&self, scaled: &[f64]) -> MLResult<Vec<f64>> {
        self.extractor.embed(scaled)
    }

    /// Stage 3: classify an embedding
    pub fn classify(&self, embedding: &[f64]) -> MLResult<Classification> {
        let probabilities = self.classifier.predict_proba(embedding)?;
        let index = argmax(&probabilities).ok_or(MLError::UnknownClass {
            index: 0,
            classes: probabilities.len(),
        })?;
        let label = self.encoder.decode(index)?.to_string();

        Ok(Classification {
            index,
            label,
            confidence: probabilities[index],
            probabilities,
        })
    }

    /// All stages on raw (unscaled) features
    pub fn predict(&self, features: &[f64]) -> MLResult<Classification> {
        let scaled = self.scale(features)?;
        let embedding = self.embed(&scaled)?;
        self.classify(&embedding)
    }
}
