//! Feature derivation
//!
//! The model consumes 10 features in a fixed order:
//!
//! | idx | feature          | definition                      |
//! |-----|------------------|---------------------------------|
//! | 0-5 | ax..gz           | raw IMU axes                    |
//! | 6   | intensity        | raw                             |
//! | 7   | accel_magnitude  | `sqrt(ax² + ay² + az²)`         |
//! | 8   | angular_velocity | `sqrt(gx² + gy² + gz²)`         |
//! | 9   | movement_energy  | `accel_magnitude * angular_velocity` |
//!
//! The order is part of the model contract. Non-finite inputs are passed
//! through untouched.

use crate::sample::SensorSample;

/// Number of features the model expects
pub const FEATURE_COUNT: usize = 10;

/// Feature names in model order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "ax",
    "ay",
    "az",
    "gx",
    "gy",
    "gz",
    "intensity",
    "accel_magnitude",
    "angular_velocity",
    "movement_energy",
];

/// Model input derived from one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Derive the full feature vector from a raw sample
    pub fn derive(sample: &SensorSample) -> Self {
        let accel_magnitude = magnitude(sample.ax, sample.ay, sample.az);
        let angular_velocity = magnitude(sample.gx, sample.gy, sample.gz);

        Self([
            sample.ax,
            sample.ay,
            sample.az,
            sample.gx,
            sample.gy,
            sample.gz,
            sample.intensity,
            accel_magnitude,
            angular_velocity,
            accel_magnitude * angular_velocity,
        ])
    }

    /// Features in model order
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Features as a fixed array
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        self.0
    }

    /// Intensity field, the one value the history keeps
    pub fn intensity(&self) -> f64 {
        self.0[6]
    }

    /// Euclidean norm of the acceleration
    pub fn accel_magnitude(&self) -> f64 {
        self.0[7]
    }

    /// Euclidean norm of the angular rate
    pub fn angular_velocity(&self) -> f64 {
        self.0[8]
    }

    /// Product of the two magnitudes
    pub fn movement_energy(&self) -> f64 {
        self.0[9]
    }
}

impl From<&SensorSample> for FeatureVector {
    fn from(sample: &SensorSample) -> Self {
        Self::derive(sample)
    }
}

fn magnitude(x: f64, y: f64, z: f64) -> f64 {
    libm::sqrt(x * x + y * y + z * z)
}
