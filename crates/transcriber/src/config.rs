use serde::{Deserialize, Serialize};
use thiserror::Error;

use stave_audio::{OnsetMethod, PitchAlgorithm, TempoMethod};
use stave_domain::{Instrument, TimeSignature, Tuning};

/// Canonical note values in quarter-lengths, ascending: sixteenth through
/// whole note, dotted values included.
pub const CANONICAL_DURATIONS: [f64; 9] = [0.25, 0.375, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 4.0];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("confidence_threshold must be within [0, 1], got {0}")]
    ConfidenceThreshold(f64),
    #[error("min_note_duration must be positive, got {0}")]
    MinNoteDuration(f64),
    #[error("pitch_tolerance must be positive, got {0}")]
    PitchTolerance(f64),
    #[error("subdivision_per_beat must be at least 1")]
    SubdivisionPerBeat,
    #[error("canonical_durations must be non-empty, positive, and ascending")]
    CanonicalDurations,
    #[error("max_fret must not exceed 24, got {0}")]
    MaxFret(u8),
}

/// Every knob of the pipeline, fully enumerated. Validated once at pipeline
/// construction instead of looked up ad hoc per call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Frames at or below this confidence are discarded before segmentation.
    pub confidence_threshold: f64,
    /// Shortest run of frames, in seconds, that still becomes a note.
    pub min_note_duration: f64,
    /// Pitch drift, in semitones, still considered the same note.
    pub pitch_tolerance: f64,
    /// Grid divisions per beat; 4 gives sixteenth-note resolution.
    pub subdivision_per_beat: u32,
    /// Note values durations are snapped to, in quarter-lengths, ascending.
    pub canonical_durations: Vec<f64>,
    /// Explicit meter; None means infer from the onset pattern.
    pub time_signature: Option<TimeSignature>,
    pub instrument: Instrument,
    pub key: String,
    /// Open-string pitches used for tablature mapping of fretted instruments.
    pub tuning: Tuning,
    pub max_fret: u8,
    pub pitch_algorithm: PitchAlgorithm,
    pub onset_method: OnsetMethod,
    pub tempo_method: TempoMethod,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            min_note_duration: 0.05,
            pitch_tolerance: 0.5,
            subdivision_per_beat: 4,
            canonical_durations: CANONICAL_DURATIONS.to_vec(),
            time_signature: None,
            instrument: Instrument::Piano,
            key: "C".to_string(),
            tuning: Tuning::standard(),
            max_fret: 24,
            pitch_algorithm: PitchAlgorithm::default(),
            onset_method: OnsetMethod::default(),
            tempo_method: TempoMethod::default(),
        }
    }
}

impl TranscriberConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::ConfidenceThreshold(self.confidence_threshold));
        }
        if self.min_note_duration <= 0.0 {
            return Err(ConfigError::MinNoteDuration(self.min_note_duration));
        }
        if self.pitch_tolerance <= 0.0 {
            return Err(ConfigError::PitchTolerance(self.pitch_tolerance));
        }
        if self.subdivision_per_beat == 0 {
            return Err(ConfigError::SubdivisionPerBeat);
        }
        let ascending = self
            .canonical_durations
            .windows(2)
            .all(|pair| pair[0] < pair[1]);
        if self.canonical_durations.is_empty()
            || !ascending
            || self.canonical_durations[0] <= 0.0
        {
            return Err(ConfigError::CanonicalDurations);
        }
        if self.max_fret > 24 {
            return Err(ConfigError::MaxFret(self.max_fret));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(TranscriberConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let config = TranscriberConfig {
            confidence_threshold: 1.2,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ConfidenceThreshold(_))
        ));
    }

    #[test]
    fn rejects_unordered_durations() {
        let config = TranscriberConfig {
            canonical_durations: vec![1.0, 0.5],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CanonicalDurations)
        ));
    }

    #[test]
    fn rejects_zero_subdivision() {
        let config = TranscriberConfig {
            subdivision_per_beat: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::SubdivisionPerBeat)
        ));
    }

    #[test]
    fn rejects_oversized_fretboard() {
        let config = TranscriberConfig {
            max_fret: 30,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::MaxFret(30))));
    }
}
