//! Bagged decision-tree ensemble
//!
//! The ensemble probability is the mean of the per-tree leaf
//! distributions, which is how a random forest's `predict_proba` combines
//! its trees.

use serde::{Deserialize, Serialize};

use crate::artifacts::{Versioned, FORMAT_VERSION};
use crate::tree::{DecisionTree, TreeSpec};
use crate::{check_width, MLError, MLResult};

/// `classifier.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    /// Artifact format
    pub format_version: u32,
    /// Embedding width the trees split on
    pub n_features: usize,
    /// Number of classes in every leaf
    pub n_classes: usize,
    /// Trees of the ensemble
    pub trees: Vec<TreeSpec>,
}

impl ClassifierArtifact {
    /// Current-format artifact
    pub fn new(n_features: usize, n_classes: usize, trees: Vec<TreeSpec>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            n_features,
            n_classes,
            trees,
        }
    }
}

impl Versioned for ClassifierArtifact {
    fn format_version(&self) -> u32 {
        self.format_version
    }
}

/// Frozen tree ensemble
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEnsemble {
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: usize,
}

impl TreeEnsemble {
    /// Validate every tree
    pub fn from_artifact(artifact: ClassifierArtifact) -> MLResult<Self> {
        if artifact.trees.is_empty() {
            return Err(MLError::load("classifier", "no trees"));
        }
        if artifact.n_features == 0 || artifact.n_classes == 0 {
            return Err(MLError::load("classifier", "n_features and n_classes must be positive"));
        }

        let trees = artifact
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, spec)| {
                DecisionTree::from_spec(spec, artifact.n_features, artifact.n_classes).map_err(|e| match e {
                    MLError::ModelLoad { artifact, reason } => MLError::ModelLoad {
                        artifact,
                        reason: format!("tree {}: {}", i, reason),
                    },
                    other => other,
                })
            })
            .collect::<MLResult<Vec<_>>>()?;

        Ok(Self {
            trees,
            n_features: artifact.n_features,
            n_classes: artifact.n_classes,
        })
    }

    /// Number of trees
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Always false for a loaded ensemble
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Embedding width
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of classes
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Mean class distribution over all trees
    pub fn predict_proba(&self, embedding: &[f64]) -> MLResult<Vec<f64>> {
        check_width(self.n_features, embedding)?;

        let mut probs = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (p, leaf) in probs.iter_mut().zip(tree.predict_proba(embedding)?) {
                *p += leaf;
            }
        }

        let n = self.trees.len() as f64;
        probs.iter_mut().for_each(|p| *p /= n);
        Ok(probs)
    }
}
