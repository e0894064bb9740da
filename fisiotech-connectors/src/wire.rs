//! Inference API wire format
//!
//! ```text
//! POST /predict   {"features": [f0, ..., f9]}
//!   200           {"prediccion": "movimiento", "confianza": 0.912}
//!   400 / 500     {"error": "X has 9 features, but the model expects 10."}
//!
//! GET /           {"status": "ok", "version": "0.1.0", "classes": [...]}
//! ```
//!
//! The Spanish field names are the API's public contract and are kept as is
//! on the wire; in Rust they are `label` and `confidence`.

use serde::{Deserialize, Serialize};

/// Body of `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Unscaled feature vector
    pub features: Vec<f64>,
}

/// Successful answer of `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Movement label
    #[serde(rename = "prediccion")]
    pub label: String,
    /// Winning class probability, rounded to 3 decimals
    #[serde(rename = "confianza")]
    pub confidence: f64,
}

impl PredictResponse {
    /// Response with the confidence rounded for the wire
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence: round3(confidence),
        }
    }
}

/// Failed answer of any endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable reason
    pub error: String,
}

/// Answer of `GET /`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the service answers
    pub status: String,
    /// Service version
    pub version: String,
    /// Labels the model can produce
    pub classes: Vec<String>,
}

/// Round to 3 decimals, half away from zero
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_uses_public_field_names() {
        let json = serde_json::to_string(&PredictResponse::new("movimiento", 0.91249)).unwrap();
        assert_eq!(json, r#"{"prediccion":"movimiento","confianza":0.912}"#);

        let back: PredictResponse = serde_json::from_str(r#"{"prediccion":"reposo","confianza":0.5}"#).unwrap();
        assert_eq!(back.label, "reposo");
    }

    #[test]
    fn rounding() {
        assert_eq!(round3(0.9996), 1.0);
        assert_eq!(round3(0.1234), 0.123);
        assert_eq!(round3(0.0), 0.0);
    }

    #[test]
    fn request_shape() {
        let req: PredictRequest = serde_json::from_str(r#"{"features":[1,2.5]}"#).unwrap();
        assert_eq!(req.features, vec![1.0, 2.5]);
    }
}
