use ndarray::Array2;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeakLevel {
    pub max: f32,
    pub min: f32,
}

impl PeakLevel {
    pub fn silence() -> Self {
        Self { max: 0.0, min: 0.0 }
    }
}

/// Peak-normalize a buffer in place and report the pre-normalization peaks.
pub fn normalize(buffer: &mut [f32]) -> PeakLevel {
    let mut peak = PeakLevel::silence();
    for sample in buffer.iter() {
        peak.max = peak.max.max(*sample);
        peak.min = peak.min.min(*sample);
    }
    let gain = peak.max.abs().max(peak.min.abs()).max(1e-6);
    for sample in buffer.iter_mut() {
        *sample /= gain;
    }
    peak
}

/// Strip leading and trailing samples quieter than `top_db` below the peak
/// amplitude. An all-quiet buffer trims to empty.
pub fn trim_silence(samples: &[f32], top_db: f32) -> &[f32] {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= 0.0 {
        return &samples[..0];
    }
    let threshold = peak * 10f32.powf(-top_db / 20.0);
    let first = samples.iter().position(|s| s.abs() > threshold);
    let last = samples.iter().rposition(|s| s.abs() > threshold);
    match (first, last) {
        (Some(first), Some(last)) => &samples[first..=last],
        _ => &samples[..0],
    }
}

/// Slice a signal into overlapping analysis windows, one row per frame.
/// Only complete frames are produced; a signal shorter than `frame_length`
/// yields no rows.
pub fn frame(samples: &[f32], frame_length: usize, hop_length: usize) -> Array2<f32> {
    assert!(frame_length > 0 && hop_length > 0);
    if samples.len() < frame_length {
        return Array2::zeros((0, frame_length));
    }
    let count = (samples.len() - frame_length) / hop_length + 1;
    let mut frames = Array2::zeros((count, frame_length));
    for (index, mut row) in frames.outer_iter_mut().enumerate() {
        let start = index * hop_length;
        for (slot, sample) in row.iter_mut().zip(&samples[start..start + frame_length]) {
            *slot = *sample;
        }
    }
    frames
}

/// Hann analysis window.
pub fn hann(len: usize) -> Vec<f32> {
    if len <= 1 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|i| {
            let phase = std::f32::consts::TAU * i as f32 / (len - 1) as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn normalize_scales_to_unity() {
        let mut buffer = vec![0.5, -1.0, 0.75];
        let peak = normalize(&mut buffer);
        assert!((peak.max - 0.75).abs() < 1e-6);
        assert!(buffer.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn trim_strips_quiet_edges() {
        let samples = [0.0, 0.0001, 0.8, 0.5, 0.0001, 0.0];
        let trimmed = trim_silence(&samples, 30.0);
        assert_eq!(trimmed, &[0.8, 0.5]);
    }

    #[test]
    fn trim_of_silence_is_empty() {
        let samples = [0.0f32; 16];
        assert!(trim_silence(&samples, 30.0).is_empty());
    }

    #[test]
    fn frame_produces_complete_windows_only() {
        let samples: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let frames = frame(&samples, 4, 2);
        assert_eq!(frames.shape(), &[4, 4]);
        assert_eq!(frames.row(0).to_vec(), vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(frames.row(3).to_vec(), vec![6.0, 7.0, 8.0, 9.0]);
        assert_eq!(frame(&samples[..3], 4, 2).shape(), &[0, 4]);
    }

    #[test]
    fn hann_window_is_symmetric() {
        let window = hann(8);
        assert_abs_diff_eq!(window[0], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(window[7], 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(window[1], window[6], epsilon = 1e-6);
    }
}
