pub mod dsp;
pub mod error;
pub mod io;
pub mod pitch;
pub mod rhythm;

pub use crate::error::AudioError;
pub use crate::io::{AudioDecoder, Recording};
pub use crate::pitch::{
    PitchAlgorithm, PitchEstimator, PitchFrame, PitchTrack, SpectralPitchEstimator,
};
pub use crate::rhythm::{
    EnergyRhythmEstimator, OnsetMethod, RhythmEstimator, RhythmTrack, TempoMethod,
};
