//! Decision tree node implementation
//!
//! Nodes are small `Copy` values stored in a flat array per tree. Leaves do
//! not own their class distribution; they hold an offset into the tree's
//! probability arena, which keeps every node the same size.

use crate::{MLError, MLResult};

/// Node type in a decision tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeType {
    /// Internal node with split condition
    Split {
        /// Feature index to split on
        feature: u32,
        /// `x[feature] <= threshold` goes left
        threshold: f64,
        /// Left child index
        left: u32,
        /// Right child index
        right: u32,
    },
    /// Leaf node
    Leaf {
        /// Start of this leaf's distribution in the probability arena
        offset: u32,
    },
}

/// Compact node representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    /// Node type and data
    pub node_type: NodeType,
    /// Path length from root
    pub depth: u16,
}

impl Node {
    /// Create a split node
    pub fn split(feature: u32, threshold: f64, left: u32, right: u32, depth: u16) -> Self {
        Self {
            node_type: NodeType::Split {
                feature,
                threshold,
                left,
                right,
            },
            depth,
        }
    }

    /// Create a leaf node
    pub fn leaf(offset: u32, depth: u16) -> Self {
        Self {
            node_type: NodeType::Leaf { offset },
            depth,
        }
    }

    /// Check if node is a leaf
    pub fn is_leaf(&self) -> bool {
        matches!(self.node_type, NodeType::Leaf { .. })
    }

    /// Child index to visit next for `features`
    ///
    /// NaN never satisfies `<=` and goes right.
    pub fn traverse(&self, features: &[f64]) -> MLResult<u32> {
        match self.node_type {
            NodeType::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let value = features.get(feature as usize).ok_or(MLError::FeatureCount {
                    expected: feature as usize + 1,
                    actual: features.len(),
                })?;

                if *value <= threshold {
                    Ok(left)
                } else {
                    Ok(right)
                }
            }
            NodeType::Leaf { .. } => Err(MLError::load("classifier", "cannot traverse from a leaf")),
        }
    }
}
