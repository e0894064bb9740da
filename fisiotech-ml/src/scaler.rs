//! Per-feature standardization

use serde::{Deserialize, Serialize};

use crate::artifacts::{Versioned, FORMAT_VERSION};
use crate::{check_width, MLError, MLResult};

/// `scaler.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerArtifact {
    /// Artifact format
    pub format_version: u32,
    /// Feature names in input order, informational
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    /// Per-feature mean
    pub mean: Vec<f64>,
    /// Per-feature standard deviation
    pub scale: Vec<f64>,
}

impl ScalerArtifact {
    /// Current-format artifact
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            feature_names: None,
            mean,
            scale,
        }
    }
}

impl Versioned for ScalerArtifact {
    fn format_version(&self) -> u32 {
        self.format_version
    }
}

/// Frozen standard scaler: `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
    feature_names: Option<Vec<String>>,
}

impl StandardScaler {
    /// Build from persisted parameters
    ///
    /// A zero scale (constant feature at fit time) is replaced by 1.
    pub fn from_artifact(artifact: ScalerArtifact) -> MLResult<Self> {
        let ScalerArtifact {
            mean,
            scale,
            feature_names,
            ..
        } = artifact;

        if mean.is_empty() {
            return Err(MLError::load("scaler", "no features"));
        }
        if mean.len() != scale.len() {
            return Err(MLError::load(
                "scaler",
                format!("{} means but {} scales", mean.len(), scale.len()),
            ));
        }
        if let Some(names) = &feature_names {
            if names.len() != mean.len() {
                return Err(MLError::load(
                    "scaler",
                    format!("{} feature names for {} features", names.len(), mean.len()),
                ));
            }
        }
        if mean.iter().chain(&scale).any(|v| !v.is_finite()) {
            return Err(MLError::load("scaler", "non-finite parameter"));
        }

        let scale = scale.into_iter().map(|s| if s == 0.0 { 1.0 } else { s }).collect();
        Ok(Self {
            mean,
            scale,
            feature_names,
        })
    }

    /// Number of features
    pub fn width(&self) -> usize {
        self.mean.len()
    }

    /// Feature names, when the artifact had them
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    /// Scale one vector
    pub fn transform(&self, features: &[f64]) -> MLResult<Vec<f64>> {
        check_width(self.width(), features)?;
        Ok(features
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }
}
