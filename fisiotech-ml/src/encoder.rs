//! Class index to label mapping

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::artifacts::{Versioned, FORMAT_VERSION};
use crate::{MLError, MLResult};

/// `encoder.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderArtifact {
    /// Artifact format
    pub format_version: u32,
    /// Class names, index order
    pub classes: Vec<String>,
}

impl EncoderArtifact {
    /// Current-format artifact
    pub fn new<S: Into<String>>(classes: impl IntoIterator<Item = S>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }
}

impl Versioned for EncoderArtifact {
    fn format_version(&self) -> u32 {
        self.format_version
    }
}

/// Frozen label encoder
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Build from the persisted class list; it must be non-empty and unique
    pub fn from_artifact(artifact: EncoderArtifact) -> MLResult<Self> {
        if artifact.classes.is_empty() {
            return Err(MLError::load("encoder", "no classes"));
        }

        let mut seen = HashSet::new();
        for class in &artifact.classes {
            if !seen.insert(class.as_str()) {
                return Err(MLError::load("encoder", format!("duplicate class {:?}", class)));
            }
        }

        Ok(Self {
            classes: artifact.classes,
        })
    }

    /// Label of a class index
    pub fn decode(&self, index: usize) -> MLResult<&str> {
        self.classes
            .get(index)
            .map(String::as_str)
            .ok_or(MLError::UnknownClass {
                index,
                classes: self.classes.len(),
            })
    }

    /// Index of a label
    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|c| c == label)
    }

    /// All labels in index order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Always false for a loaded encoder
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_in_order() {
        let enc = LabelEncoder::from_artifact(EncoderArtifact::new(["reposo", "movimiento"])).unwrap();
        assert_eq!(enc.decode(1).unwrap(), "movimiento");
        assert_eq!(enc.encode("reposo"), Some(0));
        assert_eq!(
            enc.decode(2),
            Err(MLError::UnknownClass { index: 2, classes: 2 })
        );
    }

    #[test]
    fn rejects_empty_and_duplicates() {
        assert!(LabelEncoder::from_artifact(EncoderArtifact::new(Vec::<String>::new())).is_err());
        assert!(LabelEncoder::from_artifact(EncoderArtifact::new(["a", "b", "a"])).is_err());
    }
}
