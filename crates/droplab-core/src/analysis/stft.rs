//! Short-time Fourier transform magnitudes
//!
//! Shared by onset detection and segmentation. Frames are independent, so
//! they are computed in parallel on the rayon pool; the result is identical
//! to a sequential pass.

use rayon::prelude::*;
use realfft::RealFftPlanner;

use crate::error::{DropError, Result};

/// Magnitude spectrogram of a mono signal
#[derive(Debug, Clone)]
pub struct Spectrogram {
    /// One magnitude vector (`fft_size / 2 + 1` bins) per frame
    frames: Vec<Vec<f32>>,
    fft_size: usize,
    hop_size: usize,
    sample_rate: u32,
}

impl Spectrogram {
    /// Compute Hann-windowed magnitude frames
    ///
    /// Only frames whose window lies entirely inside the signal are produced,
    /// so a signal shorter than `fft_size` yields an empty spectrogram.
    /// Magnitudes are scaled so a full-scale sine peaks near 1.0.
    pub fn compute(
        samples: &[f32],
        sample_rate: u32,
        fft_size: usize,
        hop_size: usize,
    ) -> Result<Self> {
        if fft_size == 0 || hop_size == 0 {
            return Err(DropError::InvalidBuffer(
                "STFT window and hop must be non-zero".into(),
            ));
        }

        let num_frames = if samples.len() < fft_size {
            0
        } else {
            (samples.len() - fft_size) / hop_size + 1
        };

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);

        let window: Vec<f32> = (0..fft_size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / fft_size as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect();
        let norm_factor = 2.0 / window.iter().sum::<f32>();

        let frames = (0..num_frames)
            .into_par_iter()
            .map_init(
                || (fft.make_input_vec(), fft.make_output_vec(), fft.make_scratch_vec()),
                |(frame_buf, spectrum, scratch), frame_idx| -> Result<Vec<f32>> {
                    let start = frame_idx * hop_size;
                    for ((dst, &s), &w) in frame_buf
                        .iter_mut()
                        .zip(&samples[start..start + fft_size])
                        .zip(&window)
                    {
                        *dst = s * w;
                    }

                    fft.process_with_scratch(frame_buf, spectrum, scratch)
                        .map_err(|e| DropError::InvalidBuffer(format!("FFT failed: {:?}", e)))?;

                    let magnitudes: Vec<f32> =
                        spectrum.iter().map(|c| c.norm() * norm_factor).collect();
                    Ok(magnitudes)
                },
            )
            .collect::<Result<Vec<Vec<f32>>>>()?;

        log::debug!(
            "Spectrogram::compute: {} frames of {} bins ({} samples, hop {})",
            num_frames,
            fft_size / 2 + 1,
            samples.len(),
            hop_size
        );

        Ok(Self {
            frames,
            fft_size,
            hop_size,
            sample_rate,
        })
    }

    #[inline]
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    #[inline]
    pub fn frame(&self, index: usize) -> &[f32] {
        &self.frames[index]
    }

    pub fn frames(&self) -> &[Vec<f32>] {
        &self.frames
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames per second
    pub fn frame_rate(&self) -> f64 {
        self.sample_rate as f64 / self.hop_size as f64
    }

    /// Time of the centre of a frame, in seconds
    pub fn frame_time(&self, index: usize) -> f64 {
        (index * self.hop_size + self.fft_size / 2) as f64 / self.sample_rate as f64
    }

    /// Centre frequency of a bin, in Hz
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.fft_size as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_signals::tone;

    #[test]
    fn test_frame_count() {
        let samples = vec![0.0f32; 2048 + 512 * 9];
        let spec = Spectrogram::compute(&samples, 44100, 2048, 512).unwrap();
        assert_eq!(spec.num_frames(), 10);
        assert_eq!(spec.num_bins(), 1025);
    }

    #[test]
    fn test_short_signal_is_empty() {
        let spec = Spectrogram::compute(&[0.0; 100], 44100, 2048, 512).unwrap();
        assert_eq!(spec.num_frames(), 0);
    }

    #[test]
    fn test_sine_peak_bin() {
        // 1 kHz at 44.1 kHz with 2048-point FFT -> bin 46.4
        let samples = tone(1000.0, 44100, 0.5, 1.0);
        let spec = Spectrogram::compute(&samples, 44100, 2048, 512).unwrap();
        let frame = spec.frame(3);
        let (peak_bin, &peak) = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();
        assert!((spec.bin_frequency(peak_bin) - 1000.0).abs() < 25.0);
        assert!(peak > 0.5 && peak <= 1.05, "peak magnitude {}", peak);
    }

    #[test]
    fn test_frame_time_is_window_centre() {
        let spec = Spectrogram::compute(&vec![0.0; 48000], 48000, 1024, 480).unwrap();
        assert!((spec.frame_time(0) - 512.0 / 48000.0).abs() < 1e-12);
        assert!((spec.frame_time(10) - (4800.0 + 512.0) / 48000.0).abs() < 1e-12);
        assert!((spec.frame_rate() - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_zero_hop() {
        assert!(Spectrogram::compute(&[0.0; 4096], 44100, 2048, 0).is_err());
    }
}
