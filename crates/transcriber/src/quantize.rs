use serde::{Deserialize, Serialize};
use tracing::debug;

use stave_domain::TimeSignature;

/// Time boundaries of one measure, in seconds. Adjacent spans touch with no
/// gap; the domain `Measure` is built from these by the assembler.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct MeasureSpan {
    pub start: f64,
    pub end: f64,
}

/// Infers meter, lays out measure boundaries over the beat track, and snaps
/// event times to a subdivision grid.
pub struct TemporalQuantizer {
    subdivision_per_beat: u32,
    explicit_signature: Option<TimeSignature>,
}

impl TemporalQuantizer {
    pub fn new(subdivision_per_beat: u32, explicit_signature: Option<TimeSignature>) -> Self {
        Self {
            subdivision_per_beat,
            explicit_signature,
        }
    }

    /// The explicit signature when one was supplied, otherwise the inferred
    /// one.
    pub fn time_signature(&self, onset_times: &[f64], beat_times: &[f64]) -> TimeSignature {
        if let Some(signature) = self.explicit_signature {
            return signature;
        }
        let signature = infer_time_signature(onset_times, beat_times);
        debug!(%signature, "inferred time signature");
        signature
    }

    /// Chunk the beat track into consecutive groups of `numerator` beats.
    /// Each group's end is extended to the following beat when it exists so
    /// adjacent measures touch; trailing beats that do not fill a complete
    /// group are dropped.
    pub fn measure_spans(
        &self,
        beat_times: &[f64],
        signature: TimeSignature,
    ) -> Vec<MeasureSpan> {
        let beats_per_measure = signature.beats_per_measure();
        let mut spans = Vec::new();
        let mut index = 0;
        while index + beats_per_measure <= beat_times.len() {
            let start = beat_times[index];
            let end = if index + beats_per_measure < beat_times.len() {
                beat_times[index + beats_per_measure]
            } else {
                beat_times[index + beats_per_measure - 1]
            };
            // A degenerate last group can collapse to a point; skip it.
            if end > start {
                spans.push(MeasureSpan { start, end });
            }
            index += beats_per_measure;
        }
        spans
    }

    /// Snap each time to the nearest point of the per-beat subdivision grid.
    /// Ties resolve to the earlier grid point. With fewer than two beats
    /// there is no grid, and the input is returned unchanged.
    pub fn snap_times(&self, times: &[f64], beat_times: &[f64]) -> Vec<f64> {
        if times.is_empty() || beat_times.len() < 2 {
            return times.to_vec();
        }
        let mut grid = Vec::with_capacity(
            (beat_times.len() - 1) * self.subdivision_per_beat as usize + 1,
        );
        for pair in beat_times.windows(2) {
            let division = (pair[1] - pair[0]) / self.subdivision_per_beat as f64;
            for step in 0..self.subdivision_per_beat {
                grid.push(pair[0] + step as f64 * division);
            }
        }
        grid.push(*beat_times.last().expect("at least two beats"));

        times
            .iter()
            .map(|&time| {
                let mut best = grid[0];
                let mut best_distance = (grid[0] - time).abs();
                for &point in &grid[1..] {
                    let distance = (point - time).abs();
                    if distance < best_distance {
                        best = point;
                        best_distance = distance;
                    }
                }
                best
            })
            .collect()
    }
}

/// Meter inference from the onsets-per-beat pattern: a repeating 4-beat
/// pattern reads as 4/4, a repeating 3-beat pattern as 3/4, anything else
/// falls back to common time.
fn infer_time_signature(onset_times: &[f64], beat_times: &[f64]) -> TimeSignature {
    let onsets_per_beat: Vec<i64> = beat_times
        .windows(2)
        .map(|pair| {
            onset_times
                .iter()
                .filter(|&&onset| onset >= pair[0] && onset < pair[1])
                .count() as i64
        })
        .collect();

    if onsets_per_beat.len() < 4 {
        return TimeSignature::common();
    }
    for window in [4usize, 3] {
        if onsets_per_beat.len() >= window * 2 {
            let first = &onsets_per_beat[..window];
            let second = &onsets_per_beat[window..window * 2];
            if first
                .iter()
                .zip(second)
                .all(|(a, b)| (a - b).abs() <= 1)
            {
                return match window {
                    4 => TimeSignature::common(),
                    _ => TimeSignature::new(3, 4).expect("3/4 is valid"),
                };
            }
        }
    }
    TimeSignature::common()
}
