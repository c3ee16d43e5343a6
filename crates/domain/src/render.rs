use serde::{Deserialize, Serialize};

use crate::{error::DomainError, score::Score};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum RenderFormat {
    Json,
    MusicXml,
    Midi,
    Png,
}

/// Serializes an assembled score to an interchange format. The transcription
/// core only depends on this contract, never on renderer internals.
pub trait ScoreRenderer {
    fn render(&self, score: &Score, format: RenderFormat) -> Result<Vec<u8>, DomainError>;
}

pub struct JsonRenderer;

impl ScoreRenderer for JsonRenderer {
    fn render(&self, score: &Score, format: RenderFormat) -> Result<Vec<u8>, DomainError> {
        match format {
            RenderFormat::Json => serde_json::to_vec_pretty(score)
                .map_err(|err| DomainError::Serialization(err.to_string())),
            other => Err(DomainError::validation(format!(
                "JsonRenderer cannot handle {:?}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meter::{Tempo, TimeSignature};
    use crate::score::{Instrument, Measure, Note, Part, ScoreEvent};

    fn sample_score() -> Score {
        let mut measure = Measure::new(1, 0.0, 2.0).unwrap();
        measure.push(0.0, ScoreEvent::Note(Note::new(69, 0.0, 4.0, 0.9).unwrap()));
        let mut score = Score::new("Air", "Anon");
        score.parts.push(Part {
            instrument: Instrument::Piano,
            time_signature: TimeSignature::common(),
            key: "C".to_string(),
            tempo: Tempo::new(120.0).unwrap(),
            measures: vec![measure],
        });
        score
    }

    #[test]
    fn renders_json() {
        let renderer = JsonRenderer;
        let bytes = renderer
            .render(&sample_score(), RenderFormat::Json)
            .unwrap();
        let output = String::from_utf8(bytes).unwrap();
        assert!(output.contains("\"title\": \"Air\""));
    }

    #[test]
    fn rejects_unsupported_formats() {
        let renderer = JsonRenderer;
        assert!(renderer
            .render(&sample_score(), RenderFormat::MusicXml)
            .is_err());
    }
}
