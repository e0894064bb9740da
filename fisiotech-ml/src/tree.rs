//! Frozen decision tree
//!
//! Built from the node-array form of `classifier.json`. The root is node 0
//! and every child index points forward, so evaluation always terminates
//! and the tree is acyclic by construction.

use serde::{Deserialize, Serialize};

use crate::node::{Node, NodeType};
use crate::{MLError, MLResult};

/// One node as stored in the artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeSpec {
    /// Internal node
    Split {
        /// Feature index
        feature: u32,
        /// `x[feature] <= threshold` goes left
        threshold: f64,
        /// Left child index
        left: u32,
        /// Right child index
        right: u32,
    },
    /// Leaf with per-class counts or fractions
    Leaf {
        /// One non-negative weight per class
        value: Vec<f64>,
    },
}

/// One tree as stored in the artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeSpec {
    /// Nodes, root first
    pub nodes: Vec<NodeSpec>,
}

/// Decision tree with normalized leaf distributions
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    /// `n_classes` probabilities per leaf
    leaf_probs: Vec<f64>,
    n_classes: usize,
    max_depth: u16,
}

impl DecisionTree {
    /// Validate and normalize a stored tree
    pub fn from_spec(spec: TreeSpec, n_features: usize, n_classes: usize) -> MLResult<Self> {
        let count = spec.nodes.len();
        if count == 0 {
            return Err(MLError::load("classifier", "empty tree"));
        }

        // Depths are filled in as parents are visited; children always come later
        let mut depths = vec![None::<u16>; count];
        depths[0] = Some(0);

        let mut nodes = Vec::with_capacity(count);
        let mut leaf_probs = Vec::new();
        let mut max_depth = 0;

        for (index, spec) in spec.nodes.into_iter().enumerate() {
            let depth = depths[index]
                .ok_or_else(|| MLError::load("classifier", format!("node {} is unreachable", index)))?;
            max_depth = max_depth.max(depth);

            let node = match spec {
                NodeSpec::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature as usize >= n_features {
                        return Err(MLError::load(
                            "classifier",
                            format!("node {}: feature {} out of {} features", index, feature, n_features),
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(MLError::load("classifier", format!("node {}: NaN threshold", index)));
                    }
                    for child in [left, right] {
                        let child = child as usize;
                        if child <= index || child >= count {
                            return Err(MLError::load(
                                "classifier",
                                format!("node {}: child {} must point forward within {} nodes", index, child, count),
                            ));
                        }
                        if depths[child].is_some() {
                            return Err(MLError::load(
                                "classifier",
                                format!("node {} has more than one parent", child),
                            ));
                        }
                        depths[child] = Some(depth + 1);
                    }
                    Node::split(feature, threshold, left, right, depth)
                }
                NodeSpec::Leaf { value } => {
                    let offset = leaf_probs.len() as u32;
                    leaf_probs.extend(normalize(index, value, n_classes)?);
                    Node::leaf(offset, depth)
                }
            };
            nodes.push(node);
        }

        Ok(Self {
            nodes,
            leaf_probs,
            n_classes,
            max_depth,
        })
    }

    /// Class distribution of the leaf `features` falls into
    pub fn predict_proba(&self, features: &[f64]) -> MLResult<&[f64]> {
        let mut index = 0usize;
        loop {
            let node = &self.nodes[index];
            match node.node_type {
                NodeType::Leaf { offset } => {
                    let start = offset as usize;
                    return Ok(&self.leaf_probs[start..start + self.n_classes]);
                }
                NodeType::Split { .. } => index = node.traverse(features)? as usize,
            }
        }
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.leaf_probs.len() / self.n_classes
    }

    /// Depth of the deepest node
    pub fn max_depth(&self) -> u16 {
        self.max_depth
    }
}

fn normalize(index: usize, value: Vec<f64>, n_classes: usize) -> MLResult<Vec<f64>> {
    if value.len() != n_classes {
        return Err(MLError::load(
            "classifier",
            format!("leaf {}: {} values for {} classes", index, value.len(), n_classes),
        ));
    }
    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(MLError::load("classifier", format!("leaf {}: negative or non-finite value", index)));
    }

    let total: f64 = value.iter().sum();
    if total <= 0.0 {
        return Err(MLError::load("classifier", format!("leaf {}: all-zero distribution", index)));
    }
    Ok(value.into_iter().map(|v| v / total).collect())
}
