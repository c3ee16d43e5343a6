pub mod error;
pub mod meter;
pub mod render;
pub mod score;
pub mod tab;

pub use crate::error::DomainError;
pub use crate::meter::{Tempo, TimeSignature};
pub use crate::render::{JsonRenderer, RenderFormat, ScoreRenderer};
pub use crate::score::{Instrument, Measure, Note, Part, Rest, Score, ScoreEvent, TimedElement};
pub use crate::tab::{Tablature, TablaturePosition, Tuning};
