//! Sensor readings and the bounded ranges they are drawn from.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A single sensor value.
///
/// Serialized untagged so checkpoint files and snapshots carry a bare
/// JSON number (`72` or `36.8`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Integer(i64),
    Decimal(f64),
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Integer(v) => write!(f, "{v}"),
            Reading::Decimal(v) => write!(f, "{v}"),
        }
    }
}

/// Inclusive range a simulated sensor samples from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReadingRange {
    Integer { min: i64, max: i64 },
    /// Uniform decimal rounded to `precision` fractional digits.
    Decimal { min: f64, max: f64, precision: u32 },
}

impl ReadingRange {
    /// Draw one pseudo-random reading from the range.
    ///
    /// Callers must have passed the range through [`validate`](Self::validate);
    /// an empty range would panic inside `rand`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Reading {
        match *self {
            ReadingRange::Integer { min, max } => Reading::Integer(rng.random_range(min..=max)),
            ReadingRange::Decimal {
                min,
                max,
                precision,
            } => {
                let raw: f64 = rng.random_range(min..=max);
                Reading::Decimal(round_to(raw, precision).clamp(min, max))
            }
        }
    }

    /// Whether `reading` could have been produced by this range.
    pub fn contains(&self, reading: &Reading) -> bool {
        match (self, reading) {
            (ReadingRange::Integer { min, max }, Reading::Integer(v)) => (*min..=*max).contains(v),
            (ReadingRange::Decimal { min, max, .. }, Reading::Decimal(v)) => {
                (*min..=*max).contains(v)
            }
            _ => false,
        }
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        match *self {
            ReadingRange::Integer { min, max } if min > max => Err(CoreError::Validation(
                format!("Integer range [{min}, {max}] is empty"),
            )),
            ReadingRange::Decimal { min, max, .. }
                if !min.is_finite() || !max.is_finite() || min > max =>
            {
                Err(CoreError::Validation(format!(
                    "Decimal range [{min}, {max}] is empty or not finite"
                )))
            }
            ReadingRange::Decimal { precision, .. } if precision > 6 => Err(
                CoreError::Validation(format!("Precision {precision} exceeds 6 digits")),
            ),
            _ => Ok(()),
        }
    }
}

fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    (value * factor).round() / factor
}
