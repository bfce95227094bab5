//! Percussive grains for each pattern voice
//!
//! Grains are rendered once per sample rate and reused for every trigger.
//! Noise comes from a fixed-seed xorshift generator so output is
//! reproducible run to run.

use std::f32::consts::PI;

use crate::pattern::Voice;
use crate::types::Sample;

/// Fixed-seed xorshift32 noise in [-1, 1]
struct Noise(u32);

impl Noise {
    fn new(seed: u32) -> Self {
        Self(seed.max(1))
    }

    fn next(&mut self) -> Sample {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        (x as f64 / u32::MAX as f64 * 2.0 - 1.0) as Sample
    }
}

fn frames_for(seconds: f32, sample_rate: u32) -> usize {
    (seconds * sample_rate as f32).round() as usize
}

/// Sine whose pitch falls from 150 Hz towards 45 Hz
fn kick(sample_rate: u32) -> Vec<Sample> {
    let sr = sample_rate as f32;
    let mut phase = 0.0f32;
    (0..frames_for(0.25, sample_rate))
        .map(|i| {
            let t = i as f32 / sr;
            let freq = 45.0 + 105.0 * (-t * 30.0).exp();
            phase += 2.0 * PI * freq / sr;
            phase.sin() * (-t * 12.0).exp()
        })
        .collect()
}

/// Three quick noise bursts followed by a short tail
fn clap(sample_rate: u32) -> Vec<Sample> {
    let sr = sample_rate as f32;
    let mut noise = Noise::new(0x00C1_A9C1);
    (0..frames_for(0.12, sample_rate))
        .map(|i| {
            let t = i as f32 / sr;
            let burst = if t < 0.03 {
                (-(t % 0.01) * 300.0).exp()
            } else {
                (-(t - 0.03) * 30.0).exp()
            };
            noise.next() * burst * 0.8
        })
        .collect()
}

/// Short high-passed noise tick
fn hat(sample_rate: u32) -> Vec<Sample> {
    let sr = sample_rate as f32;
    let mut noise = Noise::new(0x0000_4A7F);
    let mut prev = 0.0;
    (0..frames_for(0.05, sample_rate))
        .map(|i| {
            let t = i as f32 / sr;
            let n = noise.next();
            // First difference removes the low end
            let bright = 0.5 * (n - prev);
            prev = n;
            bright * (-t * 80.0).exp()
        })
        .collect()
}

/// High pitched wooden tone
fn perc(sample_rate: u32) -> Vec<Sample> {
    let sr = sample_rate as f32;
    (0..frames_for(0.08, sample_rate))
        .map(|i| {
            let t = i as f32 / sr;
            (2.0 * PI * 820.0 * t).sin() * (-t * 40.0).exp() * 0.6
        })
        .collect()
}

/// Low sine note with a soft attack
fn bass(sample_rate: u32) -> Vec<Sample> {
    let sr = sample_rate as f32;
    (0..frames_for(0.2, sample_rate))
        .map(|i| {
            let t = i as f32 / sr;
            let attack = (t / 0.005).min(1.0);
            (2.0 * PI * 55.0 * t).sin() * attack * (-t * 8.0).exp() * 0.8
        })
        .collect()
}

/// Pre-rendered grains for one sample rate
pub(crate) struct GrainBank {
    kick: Vec<Sample>,
    clap: Vec<Sample>,
    hat: Vec<Sample>,
    perc: Vec<Sample>,
    bass: Vec<Sample>,
}

impl GrainBank {
    pub(crate) fn new(sample_rate: u32) -> Self {
        Self {
            kick: kick(sample_rate),
            clap: clap(sample_rate),
            hat: hat(sample_rate),
            perc: perc(sample_rate),
            bass: bass(sample_rate),
        }
    }

    pub(crate) fn get(&self, voice: Voice) -> &[Sample] {
        match voice {
            Voice::Kick => &self.kick,
            Voice::Clap => &self.clap,
            Voice::Hat => &self.hat,
            Voice::Perc => &self.perc,
            Voice::Bass => &self.bass,
        }
    }

    /// Add a grain into a mono layer starting at `frame`, truncated at the end
    pub(crate) fn trigger(&self, voice: Voice, layer: &mut [Sample], frame: usize, gain: Sample) {
        if frame >= layer.len() {
            return;
        }
        for (dst, &g) in layer[frame..].iter_mut().zip(self.get(voice)) {
            *dst += g * gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VOICES: [Voice; 5] = [Voice::Kick, Voice::Clap, Voice::Hat, Voice::Perc, Voice::Bass];

    #[test]
    fn test_grains_are_bounded_and_nonempty() {
        let bank = GrainBank::new(44100);
        for voice in VOICES {
            let grain = bank.get(voice);
            assert!(!grain.is_empty(), "{} grain empty", voice.name());
            let peak = grain.iter().fold(0.0f32, |m, s| m.max(s.abs()));
            assert!(peak > 0.05 && peak <= 1.0, "{} peak {}", voice.name(), peak);
        }
    }

    #[test]
    fn test_grain_length_follows_sample_rate() {
        let a = GrainBank::new(44100);
        let b = GrainBank::new(48000);
        assert_eq!(a.get(Voice::Kick).len(), 11025);
        assert_eq!(b.get(Voice::Kick).len(), 12000);
    }

    #[test]
    fn test_noise_is_deterministic() {
        let a = GrainBank::new(44100);
        let b = GrainBank::new(44100);
        assert_eq!(a.get(Voice::Clap), b.get(Voice::Clap));
        assert_eq!(a.get(Voice::Hat), b.get(Voice::Hat));
    }

    #[test]
    fn test_trigger_truncates_at_layer_end() {
        let bank = GrainBank::new(44100);
        let mut layer = vec![0.0; 100];
        bank.trigger(Voice::Kick, &mut layer, 90, 1.0);
        assert!(layer[..90].iter().all(|&s| s == 0.0));
        bank.trigger(Voice::Kick, &mut layer, 500, 1.0);
    }
}
