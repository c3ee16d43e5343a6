use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Open-string pitches of a fretted instrument as MIDI numbers, lowest
/// string first.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tuning(Vec<u8>);

impl Tuning {
    pub fn new(open_strings: Vec<u8>) -> Result<Self, DomainError> {
        if open_strings.is_empty() {
            return Err(DomainError::validation(
                "a tuning needs at least one string",
            ));
        }
        if open_strings.iter().any(|&pitch| pitch > 127) {
            return Err(DomainError::validation(
                "open string pitches must be valid MIDI numbers",
            ));
        }
        Ok(Self(open_strings))
    }

    /// E2 A2 D3 G3 B3 E4
    pub fn standard() -> Self {
        Self(vec![40, 45, 50, 55, 59, 64])
    }

    /// D2 A2 D3 G3 B3 E4
    pub fn drop_d() -> Self {
        Self(vec![38, 45, 50, 55, 59, 64])
    }

    /// Eb2 Ab2 Db3 Gb3 Bb3 Eb4
    pub fn half_step_down() -> Self {
        Self(vec![39, 44, 49, 54, 58, 63])
    }

    /// D2 G2 D3 G3 B3 D4
    pub fn open_g() -> Self {
        Self(vec![38, 43, 50, 55, 59, 62])
    }

    /// D2 A2 D3 F#3 A3 D4
    pub fn open_d() -> Self {
        Self(vec![38, 45, 50, 54, 57, 62])
    }

    /// D2 A2 D3 G3 A3 D4
    pub fn dadgad() -> Self {
        Self(vec![38, 45, 50, 55, 57, 62])
    }

    /// Look up a tuning by name. Unknown names are a configuration error,
    /// never a fallback to standard.
    pub fn by_name(name: &str) -> Result<Self, DomainError> {
        match name.to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::standard()),
            "drop-d" | "drop d" => Ok(Self::drop_d()),
            "half-step-down" | "half step down" => Ok(Self::half_step_down()),
            "open-g" | "open g" => Ok(Self::open_g()),
            "open-d" | "open d" => Ok(Self::open_d()),
            "dadgad" => Ok(Self::dadgad()),
            other => Err(DomainError::validation(format!("unknown tuning: {other}"))),
        }
    }

    pub fn strings(&self) -> &[u8] {
        &self.0
    }

    pub fn string_count(&self) -> usize {
        self.0.len()
    }
}

/// A playable fretboard position for one note.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TablaturePosition {
    /// String index, 0 = lowest string.
    pub string: usize,
    pub fret: u8,
    /// Onset in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
    /// Playing techniques (bends, slides, ...). Always empty until a
    /// technique detector populates it.
    pub techniques: BTreeSet<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Tablature {
    pub positions: Vec<TablaturePosition>,
}

impl Tablature {
    pub fn new(positions: Vec<TablaturePosition>) -> Self {
        Self { positions }
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuning_validation() {
        assert!(Tuning::new(Vec::new()).is_err());
        assert!(Tuning::new(vec![40, 200]).is_err());
        assert!(Tuning::new(vec![40, 45, 50]).is_ok());
    }

    #[test]
    fn standard_tuning_strings() {
        let tuning = Tuning::standard();
        assert_eq!(tuning.strings(), &[40, 45, 50, 55, 59, 64]);
        assert_eq!(tuning.string_count(), 6);
    }

    #[test]
    fn tuning_lookup_by_name() {
        assert_eq!(Tuning::by_name("standard").unwrap(), Tuning::standard());
        assert_eq!(Tuning::by_name("Drop D").unwrap(), Tuning::drop_d());
        assert_eq!(Tuning::by_name("DADGAD").unwrap(), Tuning::dadgad());
        assert!(Tuning::by_name("nashville").is_err());
    }
}
