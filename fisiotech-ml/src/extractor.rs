//! Dense embedding extractor
//!
//! A frozen feed-forward network of dense and dropout layers. The embedding
//! is the output of the network's penultimate layer; the final (softmax)
//! layer of the stored network is never evaluated.
//!
//! ```text
//! input(10) → Dense 128 relu → Dropout → Dense 64 relu → Dropout → Dense k softmax
//!                                                          ▲
//!                                               embedding (64) taken here
//! ```
//!
//! Dropout is the identity at inference.
//!
//! Dense weights are stored `[in][out]` in the artifact and flattened
//! row-major at load.

use serde::{Deserialize, Serialize};

use crate::artifacts::{Versioned, FORMAT_VERSION};
use crate::{check_width, MLError, MLResult};

/// Layer activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    /// Identity
    Linear,
    /// `max(0, x)`
    Relu,
    /// `1 / (1 + e^-x)`
    Sigmoid,
    /// Hyperbolic tangent
    Tanh,
    /// Normalized exponential over the whole layer
    Softmax,
}

impl Activation {
    /// Apply in place
    pub fn apply(&self, values: &mut [f64]) {
        match self {
            Self::Linear => {}
            Self::Relu => values.iter_mut().for_each(|v| *v = v.max(0.0)),
            Self::Sigmoid => values.iter_mut().for_each(|v| *v = 1.0 / (1.0 + libm::exp(-*v))),
            Self::Tanh => values.iter_mut().for_each(|v| *v = libm::tanh(*v)),
            Self::Softmax => {
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let mut sum = 0.0;
                for v in values.iter_mut() {
                    *v = libm::exp(*v - max);
                    sum += *v;
                }
                for v in values.iter_mut() {
                    *v /= sum;
                }
            }
        }
    }
}

/// One layer as stored in `extractor.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LayerSpec {
    /// Fully connected layer
    Dense {
        /// `[in][out]`
        weights: Vec<Vec<f64>>,
        /// `[out]`
        bias: Vec<f64>,
        /// Output activation
        activation: Activation,
    },
    /// Dropout, identity at inference
    Dropout {
        /// Training-time drop rate
        rate: f64,
    },
}

/// `extractor.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractorArtifact {
    /// Artifact format
    pub format_version: u32,
    /// Width of the scaled feature vector
    pub input_width: usize,
    /// Layers in evaluation order, including the final classification layer
    pub layers: Vec<LayerSpec>,
}

impl ExtractorArtifact {
    /// Current-format artifact
    pub fn new(input_width: usize, layers: Vec<LayerSpec>) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            input_width,
            layers,
        }
    }
}

impl Versioned for ExtractorArtifact {
    fn format_version(&self) -> u32 {
        self.format_version
    }
}

#[derive(Debug, Clone, PartialEq)]
struct DenseLayer {
    /// Row-major `[in][out]`
    weights: Vec<f64>,
    bias: Vec<f64>,
    inputs: usize,
    activation: Activation,
}

impl DenseLayer {
    fn outputs(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        let mut out = self.bias.clone();
        for (i, &x) in input.iter().enumerate() {
            let row = &self.weights[i * self.outputs()..(i + 1) * self.outputs()];
            for (o, w) in out.iter_mut().zip(row) {
                *o += x * w;
            }
        }
        self.activation.apply(&mut out);
        out
    }
}

/// Frozen network truncated at its penultimate layer
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingExtractor {
    input_width: usize,
    /// Layers up to and including the penultimate one
    dense: Vec<DenseLayer>,
    embedding_width: usize,
}

impl EmbeddingExtractor {
    /// Validate the stored network and keep everything below its last layer
    pub fn from_artifact(artifact: ExtractorArtifact) -> MLResult<Self> {
        if artifact.layers.len() < 2 {
            return Err(MLError::load(
                "extractor",
                format!("need at least 2 layers, found {}", artifact.layers.len()),
            ));
        }
        if artifact.input_width == 0 {
            return Err(MLError::load("extractor", "input_width is 0"));
        }

        let mut width = artifact.input_width;
        let mut dense = Vec::new();
        let mut embedding_width = width;
        let last = artifact.layers.len() - 1;

        for (index, layer) in artifact.layers.into_iter().enumerate() {
            match layer {
                LayerSpec::Dense {
                    weights,
                    bias,
                    activation,
                } => {
                    let layer = Self::dense_layer(index, width, weights, bias, activation)?;
                    width = layer.outputs();
                    if index < last {
                        dense.push(layer);
                    }
                }
                LayerSpec::Dropout { rate } => {
                    if !(0.0..1.0).contains(&rate) {
                        return Err(MLError::load(
                            "extractor",
                            format!("layer {}: dropout rate {} outside [0, 1)", index, rate),
                        ));
                    }
                }
            }
            if index + 1 == last {
                embedding_width = width;
            }
        }

        Ok(Self {
            input_width: artifact.input_width,
            dense,
            embedding_width,
        })
    }

    fn dense_layer(
        index: usize,
        inputs: usize,
        weights: Vec<Vec<f64>>,
        bias: Vec<f64>,
        activation: Activation,
    ) -> MLResult<DenseLayer> {
        let outputs = bias.len();
        if outputs == 0 {
            return Err(MLError::load("extractor", format!("layer {}: empty bias", index)));
        }
        if weights.len() != inputs {
            return Err(MLError::load(
                "extractor",
                format!("layer {}: {} weight rows, expected {}", index, weights.len(), inputs),
            ));
        }
        if let Some(row) = weights.iter().find(|row| row.len() != outputs) {
            return Err(MLError::load(
                "extractor",
                format!("layer {}: weight row of {}, expected {}", index, row.len(), outputs),
            ));
        }

        let weights: Vec<f64> = weights.into_iter().flatten().collect();
        if weights.iter().chain(&bias).any(|v| !v.is_finite()) {
            return Err(MLError::load("extractor", format!("layer {}: non-finite weight", index)));
        }

        Ok(DenseLayer {
            weights,
            bias,
            inputs,
            activation,
        })
    }

    /// Width of the scaled input
    pub fn input_width(&self) -> usize {
        self.input_width
    }

    /// Width of the embedding
    pub fn embedding_width(&self) -> usize {
        self.embedding_width
    }

    /// Run the truncated network
    pub fn embed(&self, scaled: &[f64]) -> MLResult<Vec<f64>> {
        check_width(self.input_width, scaled)?;
        let mut x = scaled.to_vec();
        for layer in &self.dense {
            debug_assert_eq!(layer.inputs, x.len());
            x = layer.forward(&x);
        }
        Ok(x)
    }
}
