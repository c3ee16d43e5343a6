use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::meter::{Tempo, TimeSignature};
use crate::DomainError;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Instrument {
    Piano,
    Guitar,
}

impl Instrument {
    /// Detection range in Hz for this instrument. Frequencies outside the
    /// range are treated as unpitched.
    pub fn frequency_range(&self) -> (f64, f64) {
        match self {
            // Low C to high C
            Instrument::Piano => (65.0, 2093.0),
            // E2 to E6 in standard tuning
            Instrument::Guitar => (82.41, 1318.51),
        }
    }

    pub fn is_fretted(&self) -> bool {
        matches!(self, Instrument::Guitar)
    }
}

impl FromStr for Instrument {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "piano" => Ok(Instrument::Piano),
            "guitar" => Ok(Instrument::Guitar),
            other => Err(DomainError::validation(format!(
                "unknown instrument: {other}"
            ))),
        }
    }
}

/// A pitched note with its onset in seconds and duration in quarter-lengths.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Note {
    /// MIDI note number, 0-127.
    pub pitch: u8,
    /// Onset from the start of the recording, in seconds.
    pub onset: f64,
    /// Duration in quarter-lengths (1.0 = one quarter note).
    pub duration: f64,
    /// Median frame confidence of the run this note was segmented from.
    pub confidence: f64,
}

impl Note {
    pub fn new(pitch: u8, onset: f64, duration: f64, confidence: f64) -> Result<Self, DomainError> {
        if pitch > 127 {
            return Err(DomainError::validation("note pitch must be 0-127"));
        }
        if duration <= 0.0 {
            return Err(DomainError::validation("note duration must be positive"));
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(DomainError::validation(
                "note confidence must be between 0 and 1",
            ));
        }
        Ok(Self {
            pitch,
            onset,
            duration,
            confidence,
        })
    }

    /// End of the note in seconds under the given tempo mapping.
    pub fn end_time(&self, tempo: &Tempo) -> f64 {
        self.onset + tempo.seconds_from_quarters(self.duration)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Rest {
    /// Duration in quarter-lengths.
    pub duration: f64,
}

impl Rest {
    pub fn new(duration: f64) -> Result<Self, DomainError> {
        if duration <= 0.0 {
            return Err(DomainError::validation("rest duration must be positive"));
        }
        Ok(Self { duration })
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub enum ScoreEvent {
    Note(Note),
    Rest(Rest),
}

impl ScoreEvent {
    pub fn duration(&self) -> f64 {
        match self {
            ScoreEvent::Note(note) => note.duration,
            ScoreEvent::Rest(rest) => rest.duration,
        }
    }

    pub fn as_note(&self) -> Option<&Note> {
        match self {
            ScoreEvent::Note(note) => Some(note),
            ScoreEvent::Rest(_) => None,
        }
    }
}

/// An event placed at a quarter-length offset within its measure.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct TimedElement {
    pub offset: f64,
    pub event: ScoreEvent,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Measure {
    /// 1-based measure number.
    pub index: u32,
    /// Start boundary in seconds.
    pub start: f64,
    /// End boundary in seconds, strictly after `start`.
    pub end: f64,
    pub contents: Vec<TimedElement>,
}

impl Measure {
    pub fn new(index: u32, start: f64, end: f64) -> Result<Self, DomainError> {
        if index == 0 {
            return Err(DomainError::validation("measure numbering starts at 1"));
        }
        if end <= start {
            return Err(DomainError::validation(
                "measure end must be after its start",
            ));
        }
        Ok(Self {
            index,
            start,
            end,
            contents: Vec::new(),
        })
    }

    pub fn push(&mut self, offset: f64, event: ScoreEvent) {
        self.contents.push(TimedElement { offset, event });
    }

    pub fn notes(&self) -> impl Iterator<Item = &Note> {
        self.contents
            .iter()
            .filter_map(|element| element.event.as_note())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Part {
    pub instrument: Instrument,
    pub time_signature: TimeSignature,
    pub key: String,
    pub tempo: Tempo,
    pub measures: Vec<Measure>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Score {
    pub title: String,
    pub composer: String,
    pub parts: Vec<Part>,
}

impl Score {
    pub fn new(title: impl Into<String>, composer: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            composer: composer.into(),
            parts: Vec::new(),
        }
    }

    pub fn note_count(&self) -> usize {
        self.parts
            .iter()
            .flat_map(|part| part.measures.iter())
            .map(|measure| measure.notes().count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_validation() {
        assert!(Note::new(128, 0.0, 1.0, 0.9).is_err());
        assert!(Note::new(60, 0.0, 0.0, 0.9).is_err());
        assert!(Note::new(60, 0.0, 1.0, 1.5).is_err());
        assert!(Note::new(60, 0.0, 1.0, 0.9).is_ok());
    }

    #[test]
    fn note_end_time_uses_tempo() {
        let tempo = Tempo::new(120.0).unwrap();
        let note = Note::new(69, 1.0, 2.0, 0.9).unwrap();
        assert_eq!(note.end_time(&tempo), 2.0);
    }

    #[test]
    fn measure_validation() {
        assert!(Measure::new(0, 0.0, 1.0).is_err());
        assert!(Measure::new(1, 1.0, 1.0).is_err());
        assert!(Measure::new(1, 0.0, 2.0).is_ok());
    }

    #[test]
    fn measure_notes_skip_rests() {
        let mut measure = Measure::new(1, 0.0, 2.0).unwrap();
        measure.push(0.0, ScoreEvent::Rest(Rest::new(1.0).unwrap()));
        measure.push(1.0, ScoreEvent::Note(Note::new(64, 0.5, 1.0, 0.8).unwrap()));
        assert_eq!(measure.notes().count(), 1);
    }

    #[test]
    fn instrument_parsing() {
        assert_eq!("guitar".parse::<Instrument>().unwrap(), Instrument::Guitar);
        assert_eq!("Piano".parse::<Instrument>().unwrap(), Instrument::Piano);
        assert!("theremin".parse::<Instrument>().is_err());
        assert!(Instrument::Guitar.is_fretted());
        assert!(!Instrument::Piano.is_fretted());
    }

    #[test]
    fn score_counts_notes_across_parts() {
        let tempo = Tempo::new(120.0).unwrap();
        let mut measure = Measure::new(1, 0.0, 2.0).unwrap();
        measure.push(0.0, ScoreEvent::Note(Note::new(60, 0.0, 1.0, 0.9).unwrap()));
        let mut score = Score::new("Etude", "Anon");
        score.parts.push(Part {
            instrument: Instrument::Piano,
            time_signature: TimeSignature::common(),
            key: "C".to_string(),
            tempo,
            measures: vec![measure],
        });
        assert_eq!(score.note_count(), 1);
    }
}
