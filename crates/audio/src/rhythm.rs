use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dsp;
use crate::error::AudioError;

/// Onset and beat timestamps plus the estimated tempo for a recording.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RhythmTrack {
    pub onset_times: Vec<f64>,
    pub beat_times: Vec<f64>,
    pub tempo_bpm: f64,
}

impl RhythmTrack {
    pub fn new(
        onset_times: Vec<f64>,
        beat_times: Vec<f64>,
        tempo_bpm: f64,
    ) -> Result<Self, AudioError> {
        if beat_times.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(AudioError::UnorderedBeats);
        }
        Ok(Self {
            onset_times,
            beat_times,
            tempo_bpm,
        })
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum OnsetMethod {
    Energy,
    Hfc,
    Complex,
}

impl OnsetMethod {
    pub fn from_name(name: &str) -> Result<Self, AudioError> {
        match name.to_ascii_lowercase().as_str() {
            "energy" => Ok(Self::Energy),
            "hfc" => Ok(Self::Hfc),
            "complex" => Ok(Self::Complex),
            other => Err(AudioError::unknown_algorithm("onset detection", other)),
        }
    }
}

impl Default for OnsetMethod {
    fn default() -> Self {
        Self::Complex
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TempoMethod {
    Default,
    Autocorrelation,
}

impl TempoMethod {
    pub fn from_name(name: &str) -> Result<Self, AudioError> {
        match name.to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "autocorrelation" => Ok(Self::Autocorrelation),
            other => Err(AudioError::unknown_algorithm("tempo estimation", other)),
        }
    }
}

impl Default for TempoMethod {
    fn default() -> Self {
        Self::Default
    }
}

/// Boundary contract for onset and beat tracking.
pub trait RhythmEstimator {
    fn estimate(&self, samples: &[f32], sample_rate: u32) -> Result<RhythmTrack>;
}

/// Reference estimator: frame RMS energy, onsets at rising threshold
/// crossings, tempo from the median inter-onset interval, beats laid on a
/// uniform grid from the first onset.
pub struct EnergyRhythmEstimator {
    onset_method: OnsetMethod,
    tempo_method: TempoMethod,
    frame_length: usize,
    hop_length: usize,
    threshold_ratio: f32,
}

impl EnergyRhythmEstimator {
    pub fn new(onset_method: OnsetMethod, tempo_method: TempoMethod) -> Self {
        Self {
            onset_method,
            tempo_method,
            frame_length: 2048,
            hop_length: 512,
            threshold_ratio: 1.5,
        }
    }

    fn frame_energies(&self, samples: &[f32]) -> Vec<f32> {
        dsp::frame(samples, self.frame_length, self.hop_length)
            .outer_iter()
            .map(|row| {
                let sum: f32 = row.iter().map(|s| s * s).sum();
                (sum / self.frame_length as f32).sqrt()
            })
            .collect()
    }

    /// Fold a raw inter-onset tempo into the plausible musical range.
    fn fold_bpm(mut bpm: f64) -> f64 {
        if !bpm.is_finite() || bpm <= 0.0 {
            return 120.0;
        }
        while bpm < 60.0 {
            bpm *= 2.0;
        }
        while bpm > 240.0 {
            bpm /= 2.0;
        }
        bpm
    }
}

impl Default for EnergyRhythmEstimator {
    fn default() -> Self {
        Self::new(OnsetMethod::default(), TempoMethod::default())
    }
}

impl RhythmEstimator for EnergyRhythmEstimator {
    fn estimate(&self, samples: &[f32], sample_rate: u32) -> Result<RhythmTrack> {
        debug!(
            onset_method = ?self.onset_method,
            tempo_method = ?self.tempo_method,
            sample_count = samples.len(),
            "estimating rhythm"
        );
        let energies = self.frame_energies(samples);
        if energies.is_empty() {
            return Ok(RhythmTrack::new(Vec::new(), Vec::new(), 120.0)?);
        }
        let mean = energies.iter().sum::<f32>() / energies.len() as f32;
        let threshold = mean * self.threshold_ratio;

        let mut onsets = Vec::new();
        let mut previous = 0.0f32;
        for (index, &energy) in energies.iter().enumerate() {
            if energy > threshold && previous <= threshold {
                onsets.push((index * self.hop_length) as f64 / sample_rate as f64);
            }
            previous = energy;
        }

        let bpm = if onsets.len() >= 2 {
            let mut intervals: Vec<f64> =
                onsets.windows(2).map(|pair| pair[1] - pair[0]).collect();
            intervals.sort_by(|a, b| a.partial_cmp(b).expect("finite intervals"));
            let median = intervals[intervals.len() / 2];
            Self::fold_bpm(60.0 / median)
        } else {
            120.0
        };

        let seconds_per_beat = 60.0 / bpm;
        let duration = samples.len() as f64 / sample_rate as f64;
        let first = onsets.first().copied().unwrap_or(0.0);
        let mut beats = Vec::new();
        let mut beat = first;
        while beat <= duration {
            beats.push(beat);
            beat += seconds_per_beat;
        }

        Ok(RhythmTrack::new(onsets, beats, bpm)?)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn click_track(sample_rate: u32, clicks: usize, period: f64) -> Vec<f32> {
        let total = ((clicks as f64) * period * sample_rate as f64) as usize;
        let mut samples = vec![0.0f32; total];
        for click in 0..clicks {
            let start = (click as f64 * period * sample_rate as f64) as usize;
            for sample in samples.iter_mut().skip(start).take(2048) {
                *sample = 0.9;
            }
        }
        samples
    }

    #[test]
    fn rhythm_track_rejects_unordered_beats() {
        let result = RhythmTrack::new(Vec::new(), vec![1.0, 0.5], 120.0);
        assert!(matches!(result, Err(AudioError::UnorderedBeats)));
    }

    #[test]
    fn method_names_fail_fast() {
        assert_eq!(OnsetMethod::from_name("energy").unwrap(), OnsetMethod::Energy);
        assert!(OnsetMethod::from_name("wavelet").is_err());
        assert_eq!(
            TempoMethod::from_name("autocorrelation").unwrap(),
            TempoMethod::Autocorrelation
        );
        assert!(TempoMethod::from_name("magic").is_err());
    }

    #[test]
    fn fold_bpm_stays_in_range() {
        assert_abs_diff_eq!(EnergyRhythmEstimator::fold_bpm(30.0), 60.0);
        assert_abs_diff_eq!(EnergyRhythmEstimator::fold_bpm(480.0), 240.0);
        assert_abs_diff_eq!(EnergyRhythmEstimator::fold_bpm(100.0), 100.0);
        assert_abs_diff_eq!(EnergyRhythmEstimator::fold_bpm(f64::NAN), 120.0);
    }

    #[test]
    fn estimator_finds_regular_clicks() {
        let sample_rate = 22_050u32;
        let samples = click_track(sample_rate, 8, 0.5);
        let estimator = EnergyRhythmEstimator::default();
        let rhythm = estimator.estimate(&samples, sample_rate).unwrap();
        assert!(rhythm.onset_times.len() >= 4);
        assert_abs_diff_eq!(rhythm.tempo_bpm, 120.0, epsilon = 10.0);
        assert!(!rhythm.beat_times.is_empty());
    }

    #[test]
    fn estimator_degrades_on_silence() {
        let estimator = EnergyRhythmEstimator::default();
        let rhythm = estimator.estimate(&[0.0; 8192], 22_050).unwrap();
        assert!(rhythm.onset_times.is_empty());
        assert_eq!(rhythm.tempo_bpm, 120.0);
    }
}
