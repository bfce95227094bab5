//! DropLab configuration
//!
//! All analysis thresholds and effect curve shapes are tunable here rather
//! than baked into the algorithms. Configuration is stored as YAML; every
//! section uses `#[serde(default)]` so partial files are valid.
//!
//! # Usage
//!
//! ```ignore
//! use droplab_core::config::{load_config, default_config_path, DropConfig};
//!
//! let mut config: DropConfig = load_config(&default_config_path());
//! config.validate();
//! ```

mod io;
mod paths;

pub use io::{load_config, read_config, save_config};
pub use paths::{default_config_dir, default_config_path};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DropConfig {
    /// Tempo and beat tracking
    pub tempo: TempoConfig,
    /// Section detection
    pub segment: SegmentConfig,
    /// Pattern rendering and effects
    pub synthesis: SynthesisConfig,
    /// Request handling
    pub pipeline: PipelineConfig,
}

impl DropConfig {
    /// Load from YAML (defaults on any problem) and clamp into valid ranges
    pub fn load(path: &Path) -> Self {
        let mut config: DropConfig = load_config(path);
        config.validate();
        log::info!(
            "DropConfig::load: tempo range {:.0}-{:.0} BPM, sweep {:.0}->{:.0} Hz",
            config.tempo.min_bpm,
            config.tempo.max_bpm,
            config.synthesis.sweep_start_hz,
            config.synthesis.sweep_end_hz
        );
        config
    }

    /// Clamp every section into its supported range
    pub fn validate(&mut self) {
        self.tempo.validate();
        self.segment.validate();
        self.synthesis.validate();
        self.pipeline.validate();
    }
}

/// Tempo estimation and beat tracking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TempoConfig {
    /// Lowest tempo considered, in BPM
    pub min_bpm: f64,
    /// Highest tempo considered, in BPM
    pub max_bpm: f64,
    /// Centre of the log-normal tempo prior, in BPM
    pub prior_bpm: f64,
    /// Shorter buffers are rejected as insufficient audio
    pub min_duration_secs: f64,
    /// STFT window length (power of two)
    pub fft_size: usize,
    /// STFT hop length in samples
    pub hop_size: usize,
    /// How strongly the beat tracker penalizes deviations from the period
    pub tightness: f64,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            min_bpm: 60.0,
            max_bpm: 180.0,
            prior_bpm: 120.0,
            min_duration_secs: 2.0,
            fft_size: 2048,
            hop_size: 512,
            tightness: 100.0,
        }
    }
}

impl TempoConfig {
    /// Clamp values to supported ranges
    pub fn validate(&mut self) {
        let defaults = Self::default();
        self.min_bpm = finite_or(self.min_bpm, defaults.min_bpm);
        self.max_bpm = finite_or(self.max_bpm, defaults.max_bpm);
        self.prior_bpm = finite_or(self.prior_bpm, defaults.prior_bpm);
        self.min_duration_secs = finite_or(self.min_duration_secs, defaults.min_duration_secs);
        self.tightness = finite_or(self.tightness, defaults.tightness);

        self.min_bpm = self.min_bpm.clamp(30.0, 300.0);
        self.max_bpm = self.max_bpm.clamp(40.0, 400.0);

        // Ensure min < max with at least 10 BPM gap
        if self.max_bpm < self.min_bpm + 10.0 {
            self.max_bpm = self.min_bpm + 10.0;
        }
        self.prior_bpm = self.prior_bpm.clamp(self.min_bpm, self.max_bpm);
        self.min_duration_secs = self.min_duration_secs.max(0.5);
        self.fft_size = self.fft_size.clamp(256, 8192).next_power_of_two();
        self.hop_size = self.hop_size.clamp(64, self.fft_size);
        if !(self.tightness > 0.0) {
            self.tightness = 100.0;
        }
    }

    /// Create config restricted to a tempo range (e.g. DnB: 160-190)
    pub fn for_range(min_bpm: f64, max_bpm: f64) -> Self {
        let mut config = Self {
            min_bpm,
            max_bpm,
            ..Default::default()
        };
        config.validate();
        config
    }
}

/// Novelty-based segmentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentConfig {
    /// Beats on each side of a candidate boundary compared for novelty
    pub novelty_window_beats: usize,
    /// Minimum distance between boundaries (and from the track edges)
    pub min_segment_beats: usize,
    /// Peaks below this fraction of the strongest novelty are ignored
    pub peak_threshold: f64,
    /// Absolute novelty floor (feature distance in dB)
    pub min_novelty: f64,
    /// Energy slope above which a section counts as a build (dB per second)
    pub rising_slope_db_per_sec: f64,
    /// Number of log-spaced spectral bands in the frame features
    pub bands: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            novelty_window_beats: 4,
            min_segment_beats: 8,
            peak_threshold: 0.3,
            min_novelty: 3.0,
            rising_slope_db_per_sec: 0.5,
            bands: 8,
        }
    }
}

impl SegmentConfig {
    /// Clamp values to supported ranges
    pub fn validate(&mut self) {
        let defaults = Self::default();
        self.peak_threshold = finite_or(self.peak_threshold, defaults.peak_threshold);
        self.min_novelty = finite_or(self.min_novelty, defaults.min_novelty);
        self.rising_slope_db_per_sec =
            finite_or(self.rising_slope_db_per_sec, defaults.rising_slope_db_per_sec);

        self.novelty_window_beats = self.novelty_window_beats.clamp(1, 32);
        self.min_segment_beats = self.min_segment_beats.max(self.novelty_window_beats);
        self.peak_threshold = self.peak_threshold.clamp(0.0, 1.0);
        self.min_novelty = self.min_novelty.max(0.0);
        self.rising_slope_db_per_sec = self.rising_slope_db_per_sec.max(0.01);
        self.bands = self.bands.clamp(2, 32);
    }
}

/// Drop rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Low-pass cutoff at the start of the segment (Hz)
    pub sweep_start_hz: f32,
    /// Low-pass cutoff at the end of the segment (Hz)
    pub sweep_end_hz: f32,
    /// Filter resonance (Q)
    pub resonance: f32,
    /// Fraction of the segment used for each of the fade-in and fade-out
    pub fade_fraction: f32,
    /// Peak level of a full-accent grain
    pub grain_gain: f32,
    /// Level of the source material under the pattern
    pub source_mix: f32,
    /// Level of the rendered pattern
    pub pattern_mix: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            sweep_start_hz: 200.0,
            sweep_end_hz: 16000.0,
            resonance: 0.707,
            fade_fraction: 0.1,
            grain_gain: 0.6,
            source_mix: 0.7,
            pattern_mix: 1.0,
        }
    }
}

impl SynthesisConfig {
    /// Clamp values to supported ranges
    pub fn validate(&mut self) {
        let defaults = Self::default();
        self.sweep_start_hz = finite_or(self.sweep_start_hz, defaults.sweep_start_hz);
        self.sweep_end_hz = finite_or(self.sweep_end_hz, defaults.sweep_end_hz);
        self.resonance = finite_or(self.resonance, defaults.resonance);
        self.fade_fraction = finite_or(self.fade_fraction, defaults.fade_fraction);
        self.grain_gain = finite_or(self.grain_gain, defaults.grain_gain);
        self.source_mix = finite_or(self.source_mix, defaults.source_mix);
        self.pattern_mix = finite_or(self.pattern_mix, defaults.pattern_mix);

        self.sweep_start_hz = self.sweep_start_hz.clamp(20.0, 20000.0);
        self.sweep_end_hz = self.sweep_end_hz.clamp(20.0, 20000.0);
        self.resonance = self.resonance.clamp(0.1, 10.0);
        self.fade_fraction = self.fade_fraction.clamp(0.0, 0.5);
        self.grain_gain = self.grain_gain.clamp(0.0, 1.0);
        self.source_mix = self.source_mix.clamp(0.0, 1.0);
        self.pattern_mix = self.pattern_mix.clamp(0.0, 1.0);
    }
}

/// Replace NaN and infinities with a default
fn finite_or<T: Into<f64> + Copy>(value: T, default: T) -> T {
    if value.into().is_finite() {
        value
    } else {
        default
    }
}

/// Request handling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Treat the whole track as one segment when no boundaries are found
    pub fallback_to_whole_track: bool,
    /// Worker threads used by batch processing
    pub parallel_requests: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fallback_to_whole_track: true,
            parallel_requests: 4,
        }
    }
}

impl PipelineConfig {
    /// Clamp values to supported ranges
    pub fn validate(&mut self) {
        self.parallel_requests = self.parallel_requests.clamp(1, 16);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DropConfig::default();
        assert_eq!(config.tempo.min_bpm, 60.0);
        assert_eq!(config.tempo.max_bpm, 180.0);
        assert_eq!(config.tempo.min_duration_secs, 2.0);
        assert_eq!(config.synthesis.fade_fraction, 0.1);
        assert!(config.pipeline.fallback_to_whole_track);
    }

    #[test]
    fn test_tempo_validation() {
        let config = TempoConfig::for_range(150.0, 100.0);
        assert_eq!(config.min_bpm, 150.0);
        assert_eq!(config.max_bpm, 160.0);
        assert_eq!(config.prior_bpm, 150.0);

        let mut config = TempoConfig {
            fft_size: 3000,
            hop_size: 10,
            ..Default::default()
        };
        config.validate();
        assert_eq!(config.fft_size, 4096);
        assert_eq!(config.hop_size, 64);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "tempo:\n  min_bpm: 90\nsynthesis:\n  sweep_end_hz: 8000\n";
        let config: DropConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tempo.min_bpm, 90.0);
        assert_eq!(config.tempo.max_bpm, 180.0);
        assert_eq!(config.synthesis.sweep_end_hz, 8000.0);
        assert_eq!(config.segment, SegmentConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = DropConfig::default();
        config.tempo.max_bpm = 140.0;
        config.pipeline.parallel_requests = 2;
        save_config(&config, &path).unwrap();

        let loaded = DropConfig::load(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_non_finite_values_fall_back_to_defaults() {
        let yaml = "tempo:\n  min_bpm: .nan\n  prior_bpm: .inf\nsegment:\n  peak_threshold: .nan\nsynthesis:\n  sweep_end_hz: .nan\n  grain_gain: -.inf\n";
        let mut config: DropConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate();
        assert_eq!(config.tempo, TempoConfig::default());
        assert_eq!(config.segment, SegmentConfig::default());
        assert_eq!(config.synthesis, SynthesisConfig::default());
    }

    #[test]
    fn test_load_survives_nan_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "tempo:\n  min_bpm: .nan\n  max_bpm: .nan\n").unwrap();

        let config = DropConfig::load(&path);
        assert_eq!(config.tempo.min_bpm, 60.0);
        assert_eq!(config.tempo.max_bpm, 180.0);
        assert_eq!(config.tempo.prior_bpm, 120.0);
    }

    #[test]
    fn test_segment_validation_keeps_min_length_above_window() {
        let mut config = SegmentConfig {
            novelty_window_beats: 6,
            min_segment_beats: 2,
            ..Default::default()
        };
        config.validate();
        assert_eq!(config.min_segment_beats, 6);
    }
}
