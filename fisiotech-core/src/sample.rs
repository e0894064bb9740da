//! Raw IMU samples and the sensor line format
//!
//! The device writes one ASCII line per reading:
//!
//! ```text
//! ax,ay,az,gx,gy,gz,intensity\n
//! ```
//!
//! A line is accepted when at least 7 of its comma-separated tokens parse as
//! floats. The first 7 numeric tokens are used in order, anything else on the
//! line is ignored.

use crate::errors::{ParseError, ParseResult};

/// Number of raw fields in a sensor sample
pub const SAMPLE_FIELDS: usize = 7;

/// One raw reading from the IMU
///
/// Samples are transient: the ingestion loop derives features from them and
/// drops them straight away. Only `intensity` survives, in the history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    /// Acceleration, X axis
    pub ax: f64,
    /// Acceleration, Y axis
    pub ay: f64,
    /// Acceleration, Z axis
    pub az: f64,
    /// Angular rate, X axis
    pub gx: f64,
    /// Angular rate, Y axis
    pub gy: f64,
    /// Angular rate, Z axis
    pub gz: f64,
    /// Movement intensity reported by the device
    pub intensity: f64,
}

impl SensorSample {
    /// Build a sample from the 7 fields in wire order
    pub const fn from_array(v: [f64; SAMPLE_FIELDS]) -> Self {
        Self {
            ax: v[0],
            ay: v[1],
            az: v[2],
            gx: v[3],
            gy: v[4],
            gz: v[5],
            intensity: v[6],
        }
    }

    /// Fields in wire order
    pub const fn to_array(&self) -> [f64; SAMPLE_FIELDS] {
        [self.ax, self.ay, self.az, self.gx, self.gy, self.gz, self.intensity]
    }

    /// Parse one sensor line
    ///
    /// Tokens that do not parse are skipped, so `"1,x,2,3,4,5,6,7"` yields
    /// `[1,2,3,4,5,6,7]`. Lines without a comma are rejected outright.
    pub fn parse_line(line: &str) -> ParseResult<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }
        if !line.contains(',') {
            return Err(ParseError::MissingSeparator);
        }

        let mut values = [0.0f64; SAMPLE_FIELDS];
        let mut found = 0;

        for token in line.split(',') {
            if let Ok(value) = token.trim().parse::<f64>() {
                values[found] = value;
                found += 1;
                if found == SAMPLE_FIELDS {
                    return Ok(Self::from_array(values));
                }
            }
        }

        Err(ParseError::TooFewFields { found })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_line() {
        let s = SensorSample::parse_line("0.1,0.2,9.8,1.0,2.0,3.0,0.75").unwrap();
        assert_eq!(s.to_array(), [0.1, 0.2, 9.8, 1.0, 2.0, 3.0, 0.75]);
    }

    #[test]
    fn trims_whitespace_and_carriage_return() {
        let s = SensorSample::parse_line(" 1, 2 ,3,4,5,6,7\r").unwrap();
        assert_eq!(s.intensity, 7.0);
    }

    #[test]
    fn skips_non_numeric_tokens() {
        let s = SensorSample::parse_line("1,x,2,3,4,5,6,7").unwrap();
        assert_eq!(s.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let s = SensorSample::parse_line("1,2,3,4,5,6,7,8,9").unwrap();
        assert_eq!(s.intensity, 7.0);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(SensorSample::parse_line(""), Err(ParseError::Empty));
        assert_eq!(SensorSample::parse_line("1 2 3 4 5 6 7"), Err(ParseError::MissingSeparator));
        assert_eq!(
            SensorSample::parse_line("abc,1,2"),
            Err(ParseError::TooFewFields { found: 2 })
        );
        assert_eq!(
            SensorSample::parse_line("1,2,3,4,5,6"),
            Err(ParseError::TooFewFields { found: 6 })
        );
    }
}
