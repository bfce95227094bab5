//! Filter sweep effect - low-pass with a rising cutoff

use crate::effect::{Effect, EffectBase, EffectInfo, ParamInfo, ParamValue};
use crate::types::SampleBuffer;

/// Frames between coefficient updates while sweeping
const SWEEP_BLOCK: usize = 64;

/// Two-pole (12dB/octave) state-variable filter, any channel count
struct SvfFilter {
    // (ic1eq, ic2eq) per channel
    state: Vec<(f32, f32)>,
    // Coefficients
    a1: f32,
    a2: f32,
    a3: f32,
}

impl SvfFilter {
    fn new() -> Self {
        Self {
            state: Vec::new(),
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
        }
    }

    fn set_params(&mut self, cutoff: f32, q: f32, sample_rate: u32) {
        let nyquist_guard = sample_rate as f32 * 0.49;
        let cutoff = cutoff.clamp(20.0, 20000.0).min(nyquist_guard);
        let q = q.clamp(0.1, 10.0);

        let g = (std::f32::consts::PI * cutoff / sample_rate as f32).tan();
        let k = 1.0 / q;
        self.a1 = 1.0 / (1.0 + g * (g + k));
        self.a2 = g * self.a1;
        self.a3 = g * self.a2;
    }

    /// Low-pass output for one sample of one channel
    #[inline]
    fn process(&mut self, channel: usize, input: f32) -> f32 {
        let (ic1eq, ic2eq) = self.state[channel];
        let v3 = input - ic2eq;
        let v1 = self.a1 * ic1eq + self.a2 * v3;
        let v2 = ic2eq + self.a2 * ic1eq + self.a3 * v3;
        self.state[channel] = (2.0 * v1 - ic1eq, 2.0 * v2 - ic2eq);
        v2
    }

    fn ensure_channels(&mut self, channels: usize) {
        if self.state.len() != channels {
            self.state = vec![(0.0, 0.0); channels];
        }
    }

    fn reset(&mut self) {
        self.state.iter_mut().for_each(|s| *s = (0.0, 0.0));
    }
}

/// Low-pass filter whose cutoff moves linearly across the buffer
///
/// Parameters:
/// - Start: cutoff at the first frame (Hz)
/// - End: cutoff at the last frame (Hz)
/// - Resonance: filter Q
///
/// Start below End opens the filter up over the course of the buffer.
pub struct FilterSweepEffect {
    base: EffectBase,
    filter: SvfFilter,
}

impl FilterSweepEffect {
    pub fn new() -> Self {
        let info = EffectInfo::new("Filter Sweep", "Filter")
            .with_param(
                ParamInfo::new("Start", 0.0)
                    .with_range(20.0, 20000.0)
                    .with_unit("Hz"),
            )
            .with_param(
                ParamInfo::new("End", 1.0)
                    .with_range(20.0, 20000.0)
                    .with_unit("Hz"),
            )
            .with_param(
                ParamInfo::new("Resonance", 0.0)
                    .with_range(0.5, 10.0)
                    .with_unit("Q"),
            );

        Self {
            base: EffectBase::new(info),
            filter: SvfFilter::new(),
        }
    }

    /// Configure the sweep in Hz
    pub fn with_sweep(mut self, start_hz: f32, end_hz: f32, resonance: f32) -> Self {
        self.base.set_actual(0, start_hz);
        self.base.set_actual(1, end_hz);
        self.base.set_actual(2, resonance);
        self
    }

    pub fn start_hz(&self) -> f32 {
        self.base.param_actual(0)
    }

    pub fn end_hz(&self) -> f32 {
        self.base.param_actual(1)
    }

    fn resonance(&self) -> f32 {
        self.base.param_actual(2)
    }

    /// Cutoff at a position in [0, 1] through the buffer
    fn cutoff_at(&self, t: f32) -> f32 {
        let (start, end) = (self.start_hz(), self.end_hz());
        start + (end - start) * t.clamp(0.0, 1.0)
    }
}

impl Default for FilterSweepEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for FilterSweepEffect {
    fn process(&mut self, buffer: &mut SampleBuffer) {
        if self.base.is_bypassed() || buffer.is_empty() {
            return;
        }

        let channels = buffer.channels() as usize;
        let sample_rate = buffer.sample_rate();
        let frames = buffer.frames();
        let span = (frames.saturating_sub(1)).max(1) as f32;
        let resonance = self.resonance();

        self.filter.ensure_channels(channels);

        let mut block_start = 0;
        while block_start < frames {
            let block_end = (block_start + SWEEP_BLOCK).min(frames);
            let centre = 0.5 * (block_start + block_end - 1) as f32;
            let cutoff = self.cutoff_at(centre / span);
            self.filter.set_params(cutoff, resonance, sample_rate);

            let samples = &mut buffer.samples_mut()[block_start * channels..block_end * channels];
            for frame in samples.chunks_exact_mut(channels) {
                for (ch, sample) in frame.iter_mut().enumerate() {
                    *sample = self.filter.process(ch, *sample);
                }
            }
            block_start = block_end;
        }
    }

    fn info(&self) -> &EffectInfo {
        self.base.info()
    }

    fn get_params(&self) -> &[ParamValue] {
        self.base.get_params()
    }

    fn set_param(&mut self, index: usize, value: f32) {
        self.base.set_param(index, value);
    }

    fn set_bypass(&mut self, bypass: bool) {
        self.base.set_bypass(bypass);
    }

    fn is_bypassed(&self) -> bool {
        self.base.is_bypassed()
    }

    fn reset(&mut self) {
        self.filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_signals::tone;

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_filter_creation() {
        let effect = FilterSweepEffect::new().with_sweep(200.0, 16000.0, 0.707);
        assert_eq!(effect.info().name, "Filter Sweep");
        assert_eq!(effect.info().category, "Filter");
        assert_eq!(effect.info().param_count(), 3);
        assert!((effect.start_hz() - 200.0).abs() < 0.01);
        assert!((effect.end_hz() - 16000.0).abs() < 0.1);
    }

    #[test]
    fn test_closed_filter_attenuates_highs() {
        let mut effect = FilterSweepEffect::new().with_sweep(200.0, 200.0, 0.707);
        let mut buffer = SampleBuffer::from_mono(tone(5000.0, 44100, 0.5, 0.5), 44100).unwrap();
        effect.process(&mut buffer);
        assert!(rms(&buffer.samples()[4410..]) < 0.01);
    }

    #[test]
    fn test_open_filter_passes_lows() {
        let mut effect = FilterSweepEffect::new().with_sweep(16000.0, 16000.0, 0.707);
        let mut buffer = SampleBuffer::from_mono(tone(200.0, 44100, 0.5, 0.5), 44100).unwrap();
        effect.process(&mut buffer);
        let level = rms(&buffer.samples()[4410..]);
        assert!((level - 0.3536).abs() < 0.02, "rms {}", level);
    }

    #[test]
    fn test_sweep_opens_over_time() {
        let mut effect = FilterSweepEffect::new().with_sweep(200.0, 16000.0, 0.707);
        let mut buffer = SampleBuffer::from_mono(tone(8000.0, 44100, 2.0, 0.5), 44100).unwrap();
        effect.process(&mut buffer);

        let quarter = buffer.frames() / 4;
        let first = rms(&buffer.samples()[..quarter]);
        let last = rms(&buffer.samples()[3 * quarter..]);
        assert!(last > 4.0 * first, "first {} last {}", first, last);
    }

    #[test]
    fn test_channels_are_independent() {
        // Left carries a tone, right is silent
        let left = tone(300.0, 48000, 0.25, 0.5);
        let interleaved: Vec<f32> = left.iter().flat_map(|&s| [s, 0.0]).collect();
        let mut buffer = SampleBuffer::new(interleaved, 2, 48000).unwrap();

        let mut effect = FilterSweepEffect::new().with_sweep(1000.0, 1000.0, 0.707);
        effect.process(&mut buffer);

        let right_peak = buffer
            .samples()
            .iter()
            .skip(1)
            .step_by(2)
            .fold(0.0f32, |m, s| m.max(s.abs()));
        assert_eq!(right_peak, 0.0);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut effect = FilterSweepEffect::new().with_sweep(500.0, 500.0, 0.707);
        let mut first = SampleBuffer::from_mono(vec![1.0; 256], 44100).unwrap();
        effect.process(&mut first);
        effect.reset();

        let mut again = SampleBuffer::from_mono(vec![1.0; 256], 44100).unwrap();
        effect.process(&mut again);

        let mut fresh_effect = FilterSweepEffect::new().with_sweep(500.0, 500.0, 0.707);
        let mut fresh = SampleBuffer::from_mono(vec![1.0; 256], 44100).unwrap();
        fresh_effect.process(&mut fresh);

        assert_eq!(again.samples(), fresh.samples());
    }
}
