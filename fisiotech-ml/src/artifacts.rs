//! Persisted model artifacts
//!
//! [`ModelArtifacts`] says where the four files live; [`ArtifactSet`] is
//! their parsed, not yet validated, contents. Validation happens when the
//! set is turned into a [`HybridModel`](crate::HybridModel).

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::encoder::EncoderArtifact;
use crate::extractor::ExtractorArtifact;
use crate::forest::ClassifierArtifact;
use crate::scaler::ScalerArtifact;
use crate::{MLError, MLResult};

/// Artifact format understood by this crate
pub const FORMAT_VERSION: u32 = 1;

/// Artifact types carrying a format version
pub(crate) trait Versioned {
    fn format_version(&self) -> u32;
}

/// Location of the model artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifacts {
    /// Directory holding the files
    pub dir: PathBuf,
    /// Scaler file name
    pub scaler: String,
    /// Label encoder file name
    pub encoder: String,
    /// Embedding extractor file name
    pub extractor: String,
    /// Tree ensemble file name
    pub classifier: String,
}

impl ModelArtifacts {
    /// Default file names inside `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            scaler: "scaler.json".into(),
            encoder: "encoder.json".into(),
            extractor: "extractor.json".into(),
            classifier: "classifier.json".into(),
        }
    }

    /// Override the scaler file name
    pub fn with_scaler(mut self, name: impl Into<String>) -> Self {
        self.scaler = name.into();
        self
    }

    /// Override the encoder file name
    pub fn with_encoder(mut self, name: impl Into<String>) -> Self {
        self.encoder = name.into();
        self
    }

    /// Override the extractor file name
    pub fn with_extractor(mut self, name: impl Into<String>) -> Self {
        self.extractor = name.into();
        self
    }

    /// Override the classifier file name
    pub fn with_classifier(mut self, name: impl Into<String>) -> Self {
        self.classifier = name.into();
        self
    }

    /// Full path of one artifact file
    pub fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

/// Parsed contents of the four artifact files
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactSet {
    /// Standard scaler parameters
    pub scaler: ScalerArtifact,
    /// Class names
    pub encoder: EncoderArtifact,
    /// Network layers
    pub extractor: ExtractorArtifact,
    /// Decision trees
    pub classifier: ClassifierArtifact,
}

impl ArtifactSet {
    /// Read and parse every artifact
    pub fn load(artifacts: &ModelArtifacts) -> MLResult<Self> {
        info!("Loading model artifacts from {}", artifacts.dir.display());
        Ok(Self {
            scaler: read_artifact("scaler", &artifacts.path(&artifacts.scaler))?,
            encoder: read_artifact("encoder", &artifacts.path(&artifacts.encoder))?,
            extractor: read_artifact("extractor", &artifacts.path(&artifacts.extractor))?,
            classifier: read_artifact("classifier", &artifacts.path(&artifacts.classifier))?,
        })
    }

    /// Write every artifact, creating the directory if needed
    pub fn save(&self, artifacts: &ModelArtifacts) -> MLResult<()> {
        fs::create_dir_all(&artifacts.dir)
            .map_err(|e| MLError::load("model", format!("{}: {}", artifacts.dir.display(), e)))?;
        write_artifact("scaler", &artifacts.path(&artifacts.scaler), &self.scaler)?;
        write_artifact("encoder", &artifacts.path(&artifacts.encoder), &self.encoder)?;
        write_artifact("extractor", &artifacts.path(&artifacts.extractor), &self.extractor)?;
        write_artifact("classifier", &artifacts.path(&artifacts.classifier), &self.classifier)?;
        Ok(())
    }
}

fn read_artifact<T: DeserializeOwned + Versioned>(name: &str, path: &Path) -> MLResult<T> {
    let text = fs::read_to_string(path)
        .map_err(|e| MLError::load(name, format!("{}: {}", path.display(), e)))?;
    let artifact: T = serde_json::from_str(&text)
        .map_err(|e| MLError::load(name, format!("{}: {}", path.display(), e)))?;

    if artifact.format_version() != FORMAT_VERSION {
        return Err(MLError::load(
            name,
            format!(
                "unsupported format_version {} (expected {})",
                artifact.format_version(),
                FORMAT_VERSION
            ),
        ));
    }

    debug!("Read {} from {}", name, path.display());
    Ok(artifact)
}

fn write_artifact<T: Serialize>(name: &str, path: &Path, artifact: &T) -> MLResult<()> {
    let text = serde_json::to_string_pretty(artifact).map_err(|e| MLError::load(name, e.to_string()))?;
    fs::write(path, text).map_err(|e| MLError::load(name, format!("{}: {}", path.display(), e)))
}
