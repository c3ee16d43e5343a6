use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("unknown {kind} algorithm: {name}")]
    UnknownAlgorithm { kind: &'static str, name: String },
    #[error("frame arrays must be equal length: {frequencies} frequencies, {times} times, {confidences} confidences")]
    MismatchedFrames {
        frequencies: usize,
        times: usize,
        confidences: usize,
    },
    #[error("beat times must be non-decreasing")]
    UnorderedBeats,
}

impl AudioError {
    pub fn unknown_algorithm(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownAlgorithm {
            kind,
            name: name.into(),
        }
    }
}
