//! Rule-based stability diagnosis
//!
//! ## Bands
//!
//! With fewer than [`MIN_SAMPLES`] intensity values the result is always
//! [`Severity::Insufficient`]. Otherwise, with `std` the population standard
//! deviation of the intensity history and `mean` the average confidence
//! (0.0 when there is none), the first matching rule wins:
//!
//! ```text
//! 1. mean >= 0.75 && std <= 0.05                     → Stable
//! 2. (0.5 <= mean < 0.75) || (0.05 < std <= 0.12)    → Irregular
//! 3. otherwise                                       → Risky
//! ```
//!
//! NaN metrics fail every comparison and end up `Risky`.

use crate::history::HistorySnapshot;

/// Intensity entries needed before any band is evaluated
pub const MIN_SAMPLES: usize = 10;

/// Confidence mean at or above which a movement can be stable
pub const STABLE_CONFIDENCE: f64 = 0.75;
/// Confidence mean at or above which a movement is at worst irregular
pub const IRREGULAR_CONFIDENCE: f64 = 0.5;
/// Intensity spread at or below which a movement can be stable
pub const STABLE_SPREAD: f64 = 0.05;
/// Intensity spread at or below which a movement is at worst irregular
pub const IRREGULAR_SPREAD: f64 = 0.12;

/// Outcome class of a diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Severity {
    /// Not enough history yet
    Insufficient,
    /// Confident and steady
    Stable,
    /// Some loss of control
    Irregular,
    /// Large deviation or unreliable readings
    Risky,
}

impl Severity {
    /// Lowercase name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insufficient => "insufficient",
            Self::Stable => "stable",
            Self::Irregular => "irregular",
            Self::Risky => "risky",
        }
    }

    const fn texts(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::Insufficient => (
                "Analyzing signal",
                "Gathering enough readings to evaluate stability.",
                "Wait a few seconds until more readings arrive.",
            ),
            Self::Stable => (
                "Stable movement",
                "Motor pattern within the physiological range.",
                "Keep the pace and continue the controlled exercise.",
            ),
            Self::Irregular => (
                "Irregular movement",
                "Possible lack of control or slight postural deviation.",
                "Slow down, take active breaks and watch your posture.",
            ),
            Self::Risky => (
                "Risky movement",
                "Significant deviation or low sensor confidence.",
                "Stop the exercise and check the technique or the sensor fit.",
            ),
        }
    }
}

impl core::fmt::Display for Severity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numbers a diagnosis was derived from
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct StabilityMetrics {
    /// Intensity history length
    pub samples: usize,
    /// Population standard deviation of intensity (`None` below the minimum)
    pub intensity_std: Option<f64>,
    /// Mean confidence (`None` below the minimum)
    pub confidence_mean: Option<f64>,
}

/// Diagnosis surfaced to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DiagnosisRecord {
    /// Band
    pub severity: Severity,
    /// Short heading
    pub title: &'static str,
    /// Interpretation
    pub message: &'static str,
    /// Suggested next step for the patient
    pub recommended_action: &'static str,
    /// Inputs of the decision
    pub metrics: StabilityMetrics,
}

impl DiagnosisRecord {
    fn new(severity: Severity, metrics: StabilityMetrics) -> Self {
        let (title, message, recommended_action) = severity.texts();
        Self {
            severity,
            title,
            message,
            recommended_action,
            metrics,
        }
    }
}

/// Stateless stability rule engine
pub struct StabilityDiagnoser;

impl StabilityDiagnoser {
    /// Diagnose from the two history sequences
    pub fn diagnose(intensity: &[f64], confidence: &[f64]) -> DiagnosisRecord {
        if intensity.len() < MIN_SAMPLES {
            return DiagnosisRecord::new(
                Severity::Insufficient,
                StabilityMetrics {
                    samples: intensity.len(),
                    intensity_std: None,
                    confidence_mean: None,
                },
            );
        }

        let spread = population_std(intensity);
        let conf_mean = mean(confidence).unwrap_or(0.0);

        DiagnosisRecord::new(
            Self::classify(conf_mean, spread),
            StabilityMetrics {
                samples: intensity.len(),
                intensity_std: Some(spread),
                confidence_mean: Some(conf_mean),
            },
        )
    }

    /// Diagnose a history snapshot
    pub fn diagnose_snapshot(snapshot: &HistorySnapshot) -> DiagnosisRecord {
        Self::diagnose(&snapshot.intensity, &snapshot.confidence)
    }

    /// Band for already computed metrics
    ///
    /// A non-finite metric is always risky.
    pub fn classify(conf_mean: f64, intensity_std: f64) -> Severity {
        if !conf_mean.is_finite() || !intensity_std.is_finite() {
            Severity::Risky
        } else if conf_mean >= STABLE_CONFIDENCE && intensity_std <= STABLE_SPREAD {
            Severity::Stable
        } else if (conf_mean >= IRREGULAR_CONFIDENCE && conf_mean < STABLE_CONFIDENCE)
            || (intensity_std > STABLE_SPREAD && intensity_std <= IRREGULAR_SPREAD)
        {
            Severity::Irregular
        } else {
            Severity::Risky
        }
    }
}

/// Display band for a single confidence value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConfidenceLevel {
    /// `>= 0.8`
    High,
    /// `>= 0.5`
    Medium,
    /// below 0.5
    Low,
}

impl ConfidenceLevel {
    /// Band a confidence value
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.8 {
            Self::High
        } else if confidence >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn population_std(values: &[f64]) -> f64 {
    let Some(m) = mean(values) else {
        return 0.0;
    };
    let variance = values.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / values.len() as f64;
    libm::sqrt(variance)
}
