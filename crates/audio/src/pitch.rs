use anyhow::Result;
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dsp;
use crate::error::AudioError;

/// One frame of the pitch estimate grid. A frequency of 0 means no pitch
/// was detected in the frame.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct PitchFrame {
    /// Frame center from the start of the recording, in seconds.
    pub time: f64,
    /// Candidate fundamental in Hz, 0 when unpitched.
    pub frequency: f64,
    /// Estimator confidence in [0, 1].
    pub confidence: f64,
}

/// Frame-aligned pitch estimates for a whole recording.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PitchTrack {
    frames: Vec<PitchFrame>,
}

impl PitchTrack {
    pub fn new(frames: Vec<PitchFrame>) -> Self {
        Self { frames }
    }

    /// Build a track from the three frame-aligned arrays of the estimator
    /// boundary. Mismatched lengths are a terminal error for the job.
    pub fn from_arrays(
        frequencies: &[f64],
        times: &[f64],
        confidences: &[f64],
    ) -> Result<Self, AudioError> {
        if frequencies.len() != times.len() || times.len() != confidences.len() {
            return Err(AudioError::MismatchedFrames {
                frequencies: frequencies.len(),
                times: times.len(),
                confidences: confidences.len(),
            });
        }
        let frames = frequencies
            .iter()
            .zip(times)
            .zip(confidences)
            .map(|((&frequency, &time), &confidence)| PitchFrame {
                time,
                frequency,
                confidence,
            })
            .collect();
        Ok(Self { frames })
    }

    /// Zero out frequencies outside the instrument range, marking those
    /// frames unpitched.
    pub fn constrain_to_range(&mut self, fmin: f64, fmax: f64) {
        for frame in &mut self.frames {
            if frame.frequency < fmin || frame.frequency > fmax {
                frame.frequency = 0.0;
            }
        }
    }

    pub fn frames(&self) -> &[PitchFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PitchAlgorithm {
    Yin,
    Pyin,
    Crepe,
}

impl PitchAlgorithm {
    pub fn from_name(name: &str) -> Result<Self, AudioError> {
        match name.to_ascii_lowercase().as_str() {
            "yin" => Ok(Self::Yin),
            "pyin" => Ok(Self::Pyin),
            "crepe" => Ok(Self::Crepe),
            other => Err(AudioError::unknown_algorithm("pitch detection", other)),
        }
    }
}

impl Default for PitchAlgorithm {
    fn default() -> Self {
        Self::Pyin
    }
}

/// Boundary contract for pitch estimation. The transcription core depends
/// only on this, never on estimator internals.
pub trait PitchEstimator {
    fn estimate(
        &self,
        samples: &[f32],
        sample_rate: u32,
        fmin: f64,
        fmax: f64,
    ) -> Result<PitchTrack>;
}

/// Reference estimator: Hann-windowed frames, a real FFT, and the dominant
/// spectral peak within the requested range. All algorithm variants share
/// this front end for now.
pub struct SpectralPitchEstimator {
    algorithm: PitchAlgorithm,
    frame_length: usize,
    hop_length: usize,
}

impl SpectralPitchEstimator {
    pub fn new(algorithm: PitchAlgorithm) -> Self {
        Self {
            algorithm,
            frame_length: 2048,
            hop_length: 512,
        }
    }
}

impl Default for SpectralPitchEstimator {
    fn default() -> Self {
        Self::new(PitchAlgorithm::default())
    }
}

impl PitchEstimator for SpectralPitchEstimator {
    fn estimate(
        &self,
        samples: &[f32],
        sample_rate: u32,
        fmin: f64,
        fmax: f64,
    ) -> Result<PitchTrack> {
        debug!(
            algorithm = ?self.algorithm,
            sample_rate,
            sample_count = samples.len(),
            "estimating pitch"
        );
        let windows = dsp::frame(samples, self.frame_length, self.hop_length);
        if windows.nrows() == 0 {
            return Ok(PitchTrack::default());
        }
        let window = dsp::hann(self.frame_length);
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(self.frame_length);
        let mut spectrum = fft.make_output_vec();

        let bin_hz = sample_rate as f64 / self.frame_length as f64;
        let low_bin = (fmin / bin_hz).ceil().max(1.0) as usize;
        let high_bin = ((fmax / bin_hz).floor() as usize).min(spectrum.len().saturating_sub(1));

        let mut frames = Vec::with_capacity(windows.nrows());
        for (index, row) in windows.outer_iter().enumerate() {
            let time = (index * self.hop_length) as f64 / sample_rate as f64;
            let mut buf: Vec<f32> = row.iter().zip(&window).map(|(s, w)| s * w).collect();
            fft.process(&mut buf, &mut spectrum)?;

            if low_bin > high_bin {
                frames.push(PitchFrame {
                    time,
                    frequency: 0.0,
                    confidence: 0.0,
                });
                continue;
            }
            let magnitudes: Vec<f64> = spectrum[low_bin..=high_bin]
                .iter()
                .map(|c| c.norm() as f64)
                .collect();
            let (peak_offset, peak) = magnitudes
                .iter()
                .enumerate()
                .fold((0, 0.0f64), |best, (i, &m)| {
                    if m > best.1 {
                        (i, m)
                    } else {
                        best
                    }
                });
            let total: f64 = magnitudes.iter().sum();
            if peak <= 0.0 || total <= 0.0 {
                frames.push(PitchFrame {
                    time,
                    frequency: 0.0,
                    confidence: 0.0,
                });
                continue;
            }
            // Prominence of the peak's main lobe within the band.
            let lobe_start = peak_offset.saturating_sub(2);
            let lobe_end = (peak_offset + 2).min(magnitudes.len() - 1);
            let lobe: f64 = magnitudes[lobe_start..=lobe_end].iter().sum();
            frames.push(PitchFrame {
                time,
                frequency: (low_bin + peak_offset) as f64 * bin_hz,
                confidence: (lobe / total).clamp(0.0, 1.0),
            });
        }
        Ok(PitchTrack::new(frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_rejects_mismatched_arrays() {
        let result = PitchTrack::from_arrays(&[440.0, 441.0], &[0.0], &[0.9]);
        assert!(matches!(result, Err(AudioError::MismatchedFrames { .. })));
    }

    #[test]
    fn track_builds_from_aligned_arrays() {
        let track =
            PitchTrack::from_arrays(&[440.0, 0.0], &[0.0, 0.01], &[0.9, 0.1]).unwrap();
        assert_eq!(track.len(), 2);
        assert_eq!(track.frames()[0].frequency, 440.0);
    }

    #[test]
    fn constrain_zeroes_out_of_range_frames() {
        let mut track =
            PitchTrack::from_arrays(&[50.0, 440.0, 3000.0], &[0.0, 0.01, 0.02], &[0.9; 3])
                .unwrap();
        track.constrain_to_range(82.41, 1318.51);
        let frequencies: Vec<f64> = track.frames().iter().map(|f| f.frequency).collect();
        assert_eq!(frequencies, vec![0.0, 440.0, 0.0]);
    }

    #[test]
    fn algorithm_names_fail_fast() {
        assert_eq!(PitchAlgorithm::from_name("pyin").unwrap(), PitchAlgorithm::Pyin);
        assert_eq!(PitchAlgorithm::from_name("YIN").unwrap(), PitchAlgorithm::Yin);
        assert!(PitchAlgorithm::from_name("swipe").is_err());
    }

    #[test]
    fn spectral_estimator_finds_a_sine() {
        let sample_rate = 44_100u32;
        let samples: Vec<f32> = (0..sample_rate as usize)
            .map(|i| {
                (std::f32::consts::TAU * 440.0 * i as f32 / sample_rate as f32).sin() * 0.5
            })
            .collect();
        let estimator = SpectralPitchEstimator::default();
        let track = estimator
            .estimate(&samples, sample_rate, 65.0, 2093.0)
            .unwrap();
        assert!(!track.is_empty());
        let bin_hz = sample_rate as f64 / 2048.0;
        let mid = &track.frames()[track.len() / 2];
        assert!((mid.frequency - 440.0).abs() <= bin_hz);
        assert!(mid.confidence > 0.7);
    }

    #[test]
    fn spectral_estimator_handles_short_input() {
        let estimator = SpectralPitchEstimator::default();
        let track = estimator.estimate(&[0.0; 100], 44_100, 65.0, 2093.0).unwrap();
        assert!(track.is_empty());
    }
}
