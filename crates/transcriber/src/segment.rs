use tracing::debug;

use stave_audio::{PitchFrame, PitchTrack};
use stave_domain::{DomainError, Note, Tempo};

/// MIDI note number for a frequency in Hz (A4 = 440 Hz = 69).
pub fn hz_to_midi(frequency: f64) -> f64 {
    69.0 + 12.0 * (frequency / 440.0).log2()
}

/// Whether two frequencies are the same pitch within `tolerance` semitones.
/// The boundary itself is outside: exactly `tolerance` apart is a different
/// pitch. Non-positive frequencies never match anything.
pub fn is_same_pitch(freq1: f64, freq2: f64, tolerance: f64) -> bool {
    if freq1 <= 0.0 || freq2 <= 0.0 {
        return false;
    }
    (12.0 * (freq1 / freq2).log2()).abs() < tolerance
}

/// Median of an unsorted sample; the mean of the middle pair for even
/// counts. Panics on an empty slice.
pub fn median(values: &[f64]) -> f64 {
    assert!(!values.is_empty(), "median of empty sample");
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("finite samples"));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Groups confident, consecutive, pitch-stable frames into candidate notes.
pub struct NoteSegmenter {
    confidence_threshold: f64,
    min_note_duration: f64,
    pitch_tolerance: f64,
}

struct Run {
    start_time: f64,
    anchor: f64,
    frequencies: Vec<f64>,
    confidences: Vec<f64>,
}

impl Run {
    fn open(frame: &PitchFrame) -> Self {
        Self {
            start_time: frame.time,
            anchor: frame.frequency,
            frequencies: vec![frame.frequency],
            confidences: vec![frame.confidence],
        }
    }

    fn extend(&mut self, frame: &PitchFrame) {
        self.frequencies.push(frame.frequency);
        self.confidences.push(frame.confidence);
    }
}

impl NoteSegmenter {
    pub fn new(confidence_threshold: f64, min_note_duration: f64, pitch_tolerance: f64) -> Self {
        Self {
            confidence_threshold,
            min_note_duration,
            pitch_tolerance,
        }
    }

    /// Segment a pitch track into notes. Provisional durations are expressed
    /// in quarter-lengths under the supplied tempo; the assembler reconciles
    /// them against measure boundaries later.
    pub fn segment(&self, track: &PitchTrack, tempo: &Tempo) -> Result<Vec<Note>, DomainError> {
        let kept: Vec<(usize, &PitchFrame)> = track
            .frames()
            .iter()
            .enumerate()
            .filter(|(_, frame)| {
                frame.confidence > self.confidence_threshold && frame.frequency > 0.0
            })
            .collect();
        if kept.is_empty() {
            debug!("no frames above the confidence threshold");
            return Ok(Vec::new());
        }

        let mut notes = Vec::new();
        let mut run = Run::open(kept[0].1);
        for window in kept.windows(2) {
            let (prev_index, prev_frame) = window[0];
            let (index, frame) = window[1];
            let consecutive = index == prev_index + 1;
            if consecutive && is_same_pitch(frame.frequency, run.anchor, self.pitch_tolerance) {
                run.extend(frame);
            } else {
                self.close_run(&run, prev_frame.time, tempo, &mut notes)?;
                run = Run::open(frame);
            }
        }
        let (_, last_frame) = *kept.last().expect("kept is non-empty");
        self.close_run(&run, last_frame.time, tempo, &mut notes)?;

        debug!(note_count = notes.len(), "segmented pitch track");
        Ok(notes)
    }

    fn close_run(
        &self,
        run: &Run,
        end_time: f64,
        tempo: &Tempo,
        notes: &mut Vec<Note>,
    ) -> Result<(), DomainError> {
        let span = end_time - run.start_time;
        if span < self.min_note_duration {
            return Ok(());
        }
        let midi = hz_to_midi(median(&run.frequencies)).round();
        if !(0.0..=127.0).contains(&midi) {
            return Err(DomainError::validation(format!(
                "segmented pitch {midi} is outside the MIDI range"
            )));
        }
        notes.push(Note::new(
            midi as u8,
            run.start_time,
            tempo.quarters_from_seconds(span),
            median(&run.confidences),
        )?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn track(frames: Vec<(f64, f64, f64)>) -> PitchTrack {
        PitchTrack::new(
            frames
                .into_iter()
                .map(|(time, frequency, confidence)| PitchFrame {
                    time,
                    frequency,
                    confidence,
                })
                .collect(),
        )
    }

    fn tempo() -> Tempo {
        Tempo::new(120.0).unwrap()
    }

    #[test]
    fn same_pitch_is_reflexive() {
        for freq in [27.5, 440.0, 1318.51] {
            assert!(is_same_pitch(freq, freq, 0.5));
        }
    }

    #[test]
    fn same_pitch_boundary_is_exclusive() {
        let half_semitone_up = 440.0 * 2f64.powf(0.5 / 12.0);
        assert!(!is_same_pitch(440.0, half_semitone_up, 0.5));
        let within = 440.0 * 2f64.powf(0.4 / 12.0);
        assert!(is_same_pitch(440.0, within, 0.5));
        assert!(!is_same_pitch(0.0, 440.0, 0.5));
    }

    #[test]
    fn median_of_even_and_odd_samples() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
    }

    #[test]
    fn constant_signal_yields_single_note() {
        // 440 Hz held for two seconds at confidence 0.9, 10 ms frames.
        let frames: Vec<(f64, f64, f64)> =
            (0..=200).map(|i| (i as f64 / 100.0, 440.0, 0.9)).collect();
        let segmenter = NoteSegmenter::new(0.7, 0.05, 0.5);
        let notes = segmenter.segment(&track(frames), &tempo()).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].pitch, 69);
        // Two seconds at 120 bpm is four quarter-lengths.
        assert_abs_diff_eq!(notes[0].duration, 4.0, epsilon = 1e-9);
        assert_abs_diff_eq!(notes[0].confidence, 0.9, epsilon = 1e-12);
    }

    #[test]
    fn no_valid_frames_yields_no_notes() {
        let frames = vec![(0.0, 440.0, 0.2), (0.01, 0.0, 0.9), (0.02, -1.0, 0.95)];
        let segmenter = NoteSegmenter::new(0.7, 0.05, 0.5);
        assert!(segmenter.segment(&track(frames), &tempo()).unwrap().is_empty());
    }

    #[test]
    fn threshold_is_exclusive() {
        let frames: Vec<(f64, f64, f64)> =
            (0..20).map(|i| (i as f64 / 100.0, 440.0, 0.7)).collect();
        let segmenter = NoteSegmenter::new(0.7, 0.05, 0.5);
        assert!(segmenter.segment(&track(frames), &tempo()).unwrap().is_empty());
    }

    #[test]
    fn pitch_change_splits_runs() {
        let mut frames: Vec<(f64, f64, f64)> =
            (0..20).map(|i| (i as f64 / 100.0, 440.0, 0.9)).collect();
        frames.extend((20..40).map(|i| (i as f64 / 100.0, 523.25, 0.9)));
        let segmenter = NoteSegmenter::new(0.7, 0.05, 0.5);
        let notes = segmenter.segment(&track(frames), &tempo()).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].pitch, 69);
        assert_eq!(notes[1].pitch, 72);
    }

    #[test]
    fn gap_in_frames_splits_runs() {
        // Same pitch, but a low-confidence frame in the middle breaks
        // consecutiveness; both halves survive the minimum duration.
        let mut frames: Vec<(f64, f64, f64)> =
            (0..10).map(|i| (i as f64 / 100.0, 440.0, 0.9)).collect();
        frames.push((0.10, 440.0, 0.1));
        frames.extend((11..21).map(|i| (i as f64 / 100.0, 440.0, 0.9)));
        let segmenter = NoteSegmenter::new(0.7, 0.05, 0.5);
        let notes = segmenter.segment(&track(frames), &tempo()).unwrap();
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn short_runs_are_discarded_not_merged() {
        // Two frames of 10 ms never reach the 50 ms minimum.
        let frames = vec![(0.0, 440.0, 0.9), (0.01, 440.0, 0.9)];
        let segmenter = NoteSegmenter::new(0.7, 0.05, 0.5);
        assert!(segmenter.segment(&track(frames), &tempo()).unwrap().is_empty());
    }

    #[test]
    fn exact_minimum_duration_is_kept() {
        // Six frames spanning exactly 50 ms.
        let frames: Vec<(f64, f64, f64)> =
            (0..=5).map(|i| (i as f64 / 100.0, 440.0, 0.9)).collect();
        let segmenter = NoteSegmenter::new(0.7, 0.05, 0.5);
        assert_eq!(segmenter.segment(&track(frames), &tempo()).unwrap().len(), 1);
    }
}
