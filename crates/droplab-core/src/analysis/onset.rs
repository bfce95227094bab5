//! Onset-strength envelope via spectral flux

use super::stft::Spectrogram;

/// Compression applied to magnitudes before differencing: ln(1 + C * |X|)
const LOG_COMPRESSION: f32 = 100.0;

/// Onset strength per STFT frame
#[derive(Debug, Clone)]
pub struct OnsetEnvelope {
    /// Half-wave rectified spectral flux, one value per frame
    pub values: Vec<f32>,
    /// Frames per second
    pub frame_rate: f64,
    /// Time of frame 0 (window centre) in seconds
    pub first_frame_time: f64,
}

impl OnsetEnvelope {
    /// Time of a frame, in seconds
    #[inline]
    pub fn frame_time(&self, index: usize) -> f64 {
        self.first_frame_time + index as f64 / self.frame_rate
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when no frame carries any onset energy (silence, pure drones)
    pub fn is_flat(&self) -> bool {
        self.values.iter().all(|&v| v <= f32::EPSILON)
    }
}

/// Compute spectral flux of log-compressed magnitudes
///
/// Only increases in magnitude count, so note releases and decays do not
/// register as onsets. Frame 0 has no predecessor and is zero.
pub fn onset_strength(spec: &Spectrogram) -> OnsetEnvelope {
    let mut values = Vec::with_capacity(spec.num_frames());
    let mut prev: Option<Vec<f32>> = None;

    for frame in spec.frames() {
        let compressed: Vec<f32> = frame
            .iter()
            .map(|&m| (1.0 + LOG_COMPRESSION * m).ln())
            .collect();

        let flux = match prev {
            Some(ref p) => compressed
                .iter()
                .zip(p.iter())
                .map(|(&cur, &old)| (cur - old).max(0.0))
                .sum(),
            None => 0.0,
        };

        values.push(flux);
        prev = Some(compressed);
    }

    OnsetEnvelope {
        values,
        frame_rate: spec.frame_rate(),
        first_frame_time: spec.frame_time(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_signals::{click_track, tone};

    #[test]
    fn test_silence_is_flat() {
        let spec = Spectrogram::compute(&vec![0.0; 44100], 44100, 2048, 512).unwrap();
        let env = onset_strength(&spec);
        assert_eq!(env.len(), spec.num_frames());
        assert!(env.is_flat());
    }

    #[test]
    fn test_clicks_produce_periodic_peaks() {
        // 120 BPM -> a click every 0.5s
        let samples = click_track(120.0, 44100, 4.0);
        let spec = Spectrogram::compute(&samples, 44100, 2048, 512).unwrap();
        let env = onset_strength(&spec);

        let max = env.values.iter().cloned().fold(0.0f32, f32::max);
        assert!(max > 0.0);

        // Strong frames should cluster around click times
        for (i, &v) in env.values.iter().enumerate() {
            if v > 0.5 * max {
                let t = env.frame_time(i);
                let phase = (t / 0.5).fract();
                let distance = phase.min(1.0 - phase) * 0.5;
                assert!(distance < 0.06, "strong onset at {:.3}s far from a click", t);
            }
        }
    }

    #[test]
    fn test_steady_tone_has_little_flux() {
        let clicks = click_track(120.0, 44100, 3.0);
        let click_env = onset_strength(&Spectrogram::compute(&clicks, 44100, 2048, 512).unwrap());
        let drone = tone(220.0, 44100, 3.0, 0.5);
        let drone_env = onset_strength(&Spectrogram::compute(&drone, 44100, 2048, 512).unwrap());

        let click_total: f32 = click_env.values.iter().sum();
        let drone_tail: f32 = drone_env.values.iter().skip(2).sum();
        assert!(drone_tail < click_total * 0.1);
    }
}
