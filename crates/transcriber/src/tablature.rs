use std::collections::BTreeSet;

use tracing::debug;

use stave_domain::{Note, Tablature, TablaturePosition, Tempo, Tuning};

/// Maps pitched notes onto fretboard positions for a tuning. Notes with no
/// playable position are dropped from the tablature only; they remain in
/// the pitched score.
pub struct TablatureMapper {
    tuning: Tuning,
    max_fret: u8,
}

impl TablatureMapper {
    pub fn new(tuning: Tuning, max_fret: u8) -> Self {
        Self { tuning, max_fret }
    }

    pub fn map(&self, notes: &[Note], tempo: &Tempo) -> Tablature {
        let mut positions = Vec::with_capacity(notes.len());
        for note in notes {
            match self.position_for(note.pitch) {
                Some((string, fret)) => positions.push(TablaturePosition {
                    string,
                    fret,
                    start: note.onset,
                    duration: tempo.seconds_from_quarters(note.duration),
                    techniques: BTreeSet::new(),
                }),
                None => {
                    debug!(pitch = note.pitch, "unplayable note dropped from tablature");
                }
            }
        }
        Tablature::new(positions)
    }

    /// Lowest playable fret across all strings; a fret tie goes to the
    /// lowest string.
    fn position_for(&self, pitch: u8) -> Option<(usize, u8)> {
        let mut best: Option<(usize, u8)> = None;
        for (string, &open) in self.tuning.strings().iter().enumerate() {
            if pitch < open {
                continue;
            }
            let fret = pitch - open;
            if fret > self.max_fret {
                continue;
            }
            if best.map_or(true, |(_, best_fret)| fret < best_fret) {
                best = Some((string, fret));
            }
        }
        best
    }
}
