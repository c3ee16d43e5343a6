use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl TimeSignature {
    pub fn new(numerator: u8, denominator: u8) -> Result<Self, DomainError> {
        if numerator == 0 {
            return Err(DomainError::validation(
                "time signature numerator must be at least 1",
            ));
        }
        if !denominator.is_power_of_two() {
            return Err(DomainError::validation(
                "time signature denominator must be a power of two",
            ));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// Common time, the fallback whenever inference finds no clear pattern.
    pub fn common() -> Self {
        Self {
            numerator: 4,
            denominator: 4,
        }
    }

    pub fn beats_per_measure(&self) -> usize {
        self.numerator as usize
    }

    /// Measure capacity in quarter-lengths.
    pub fn measure_quarters(&self) -> f64 {
        self.numerator as f64
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

impl FromStr for TimeSignature {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, den) = s
            .split_once('/')
            .ok_or_else(|| DomainError::validation(format!("invalid time signature: {s}")))?;
        let numerator: u8 = num
            .trim()
            .parse()
            .map_err(|_| DomainError::validation(format!("invalid time signature: {s}")))?;
        let denominator: u8 = den
            .trim()
            .parse()
            .map_err(|_| DomainError::validation(format!("invalid time signature: {s}")))?;
        Self::new(numerator, denominator)
    }
}

/// The single seconds-to-quarter-length mapping used across the whole
/// pipeline. Segmentation, assembly, and tablature mapping all convert
/// through the same detected tempo.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub fn new(bpm: f64) -> Result<Self, DomainError> {
        if !(10.0..=400.0).contains(&bpm) {
            return Err(DomainError::validation(
                "tempo bpm must be between 10 and 400",
            ));
        }
        Ok(Self { bpm })
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn seconds_per_quarter(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn quarters_from_seconds(&self, seconds: f64) -> f64 {
        seconds / self.seconds_per_quarter()
    }

    pub fn seconds_from_quarters(&self, quarters: f64) -> f64 {
        quarters * self.seconds_per_quarter()
    }
}
