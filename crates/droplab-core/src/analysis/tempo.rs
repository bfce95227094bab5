//! Tempo estimation and beat tracking
//!
//! 1. Spectral-flux onset envelope ([`super::onset`])
//! 2. Autocorrelation of the envelope over the configured lag range,
//!    weighted by a log-normal prior centred on `prior_bpm`
//! 3. Octave check against half the winning lag, then parabolic refinement
//! 4. Dynamic-programming beat tracker that trades onset strength against
//!    deviation from the estimated period

use crate::config::TempoConfig;
use crate::error::{DropError, Result};
use crate::types::SampleBuffer;

use super::beatgrid::BeatGrid;
use super::onset::{onset_strength, OnsetEnvelope};
use super::stft::Spectrogram;

/// Beats are only allowed to start once the local score passes this
/// fraction of its maximum
const FIRST_BEAT_THRESHOLD: f64 = 0.01;

/// Share of the best lag's correlation the half lag needs to win
const OCTAVE_RATIO: f64 = 0.8;

/// Estimate the tempo of a buffer and track its beats
///
/// Buffers shorter than `config.min_duration_secs` are rejected with
/// [`DropError::InsufficientAudio`]. Input without any onsets (silence,
/// sustained tones) yields a uniform grid at the prior tempo.
pub fn estimate_tempo(buffer: &SampleBuffer, config: &TempoConfig) -> Result<BeatGrid> {
    let duration = buffer.duration_seconds();
    if duration < config.min_duration_secs {
        return Err(DropError::InsufficientAudio {
            duration,
            minimum: config.min_duration_secs,
        });
    }

    log::info!(
        "estimate_tempo: {:.2}s of audio at {} Hz, range {:.0}-{:.0} BPM",
        duration,
        buffer.sample_rate(),
        config.min_bpm,
        config.max_bpm
    );

    let mono = buffer.to_mono();
    let spec = Spectrogram::compute(&mono, buffer.sample_rate(), config.fft_size, config.hop_size)?;
    let envelope = onset_strength(&spec);

    if envelope.len() < 2 || envelope.is_flat() {
        log::warn!(
            "estimate_tempo: no onsets found, using {:.1} BPM uniform grid",
            config.prior_bpm
        );
        return prior_grid(config, duration);
    }

    let bpm = match autocorrelation_bpm(&envelope, config) {
        Some(bpm) => bpm,
        None => {
            log::warn!("estimate_tempo: envelope too short for lag range, using prior tempo");
            return prior_grid(config, duration);
        }
    };

    let frames = track_beats(&envelope, bpm, config.tightness);
    let beats: Vec<f64> = frames.iter().map(|&f| envelope.frame_time(f)).collect();

    if beats.is_empty() {
        log::warn!("estimate_tempo: beat tracker found no beats, using uniform grid");
        return BeatGrid::uniform(bpm, 0.0, duration).ok_or_else(invalid_grid);
    }

    log::info!(
        "estimate_tempo: {:.2} BPM, {} beats, first at {:.3}s",
        bpm,
        beats.len(),
        beats[0]
    );

    BeatGrid::new(bpm, beats).ok_or_else(invalid_grid)
}

fn prior_grid(config: &TempoConfig, duration: f64) -> Result<BeatGrid> {
    BeatGrid::uniform(config.prior_bpm, 0.0, duration).ok_or_else(invalid_grid)
}

fn invalid_grid() -> DropError {
    DropError::InvalidBuffer("beat tracker produced an invalid grid".into())
}

/// Log-normal tempo prior, one octave standard deviation
fn tempo_prior(bpm: f64, centre: f64) -> f64 {
    let octaves = (bpm / centre).log2();
    (-0.5 * octaves * octaves).exp()
}

/// Pick the tempo whose lag maximises prior-weighted autocorrelation
///
/// Returns `None` when the envelope cannot hold even the shortest lag.
fn autocorrelation_bpm(envelope: &OnsetEnvelope, config: &TempoConfig) -> Option<f64> {
    let fps = envelope.frame_rate;
    let n = envelope.len();

    let min_lag = ((60.0 * fps / config.max_bpm).floor() as usize).max(1);
    let max_lag = ((60.0 * fps / config.min_bpm).ceil() as usize).min(n.saturating_sub(1));
    if max_lag <= min_lag {
        return None;
    }

    let mean = envelope.values.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    let centred: Vec<f64> = envelope.values.iter().map(|&v| v as f64 - mean).collect();

    // Biased estimate (divide by n) so long lags are not favoured by
    // having fewer terms
    let acf: Vec<f64> = (min_lag..=max_lag)
        .map(|lag| {
            centred[..n - lag]
                .iter()
                .zip(&centred[lag..])
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / n as f64
        })
        .collect();
    let scores: Vec<f64> = acf
        .iter()
        .enumerate()
        .map(|(i, &a)| a * tempo_prior(60.0 * fps / (min_lag + i) as f64, config.prior_bpm))
        .collect();

    let (mut best_idx, _) = scores
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| {
            if v > bv {
                (i, v)
            } else {
                (bi, bv)
            }
        });

    // A pulse train correlates as well at twice its period as at the period
    // itself; take the faster octave when its correlation holds up. Sums
    // over neighbouring lags absorb periods that fall between frames.
    let around = |idx: usize| -> f64 {
        acf[idx.saturating_sub(1)..=(idx + 1).min(acf.len() - 1)]
            .iter()
            .sum()
    };
    let best_lag = min_lag + best_idx;
    let half = (best_lag as f64 / 2.0).round() as usize;
    let best_strength = around(best_idx);
    if half > min_lag && best_strength > 0.0 {
        let half_idx = half - min_lag;
        let half_strength = around(half_idx);
        if half_strength >= OCTAVE_RATIO * best_strength {
            let peak = (half_idx - 1..=(half_idx + 1).min(acf.len() - 1))
                .max_by(|&a, &b| acf[a].total_cmp(&acf[b]))
                .unwrap_or(half_idx);
            log::debug!(
                "autocorrelation_bpm: lag {} -> {} (octave up, strength ratio {:.2})",
                best_lag,
                min_lag + peak,
                half_strength / best_strength
            );
            best_idx = peak;
        }
    }

    // Parabolic interpolation between neighbouring lags
    let mut lag = (min_lag + best_idx) as f64;
    if best_idx > 0 && best_idx + 1 < scores.len() {
        let (a, b, c) = (scores[best_idx - 1], scores[best_idx], scores[best_idx + 1]);
        let denom = a - 2.0 * b + c;
        if denom.abs() > f64::EPSILON {
            let offset = 0.5 * (a - c) / denom;
            if offset.abs() <= 0.5 {
                lag += offset;
            }
        }
    }

    let bpm = (60.0 * fps / lag).clamp(config.min_bpm, config.max_bpm);
    log::debug!(
        "autocorrelation_bpm: best lag {:.2} frames ({} candidates) -> {:.2} BPM",
        lag,
        scores.len(),
        bpm
    );
    Some(bpm)
}

/// Dynamic-programming beat tracker
///
/// Every frame's cumulative score is its smoothed onset strength plus the
/// best predecessor score, where predecessors 0.5 to 2 periods back are
/// penalised by the squared log ratio of their spacing to the period.
/// Returns beat frame indices in increasing order.
fn track_beats(envelope: &OnsetEnvelope, bpm: f64, tightness: f64) -> Vec<usize> {
    let n = envelope.len();
    let period = 60.0 * envelope.frame_rate / bpm;
    if n == 0 || period < 1.0 {
        return Vec::new();
    }

    let std = {
        let mean = envelope.values.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
        let var = envelope
            .values
            .iter()
            .map(|&v| (v as f64 - mean).powi(2))
            .sum::<f64>()
            / (n.max(2) - 1) as f64;
        var.sqrt()
    };
    let onsets: Vec<f64> = envelope
        .values
        .iter()
        .map(|&v| if std > 0.0 { v as f64 / std } else { v as f64 })
        .collect();

    let local = local_score(&onsets, period);
    let local_max = local.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let first_threshold = FIRST_BEAT_THRESHOLD * local_max;

    let near = (period / 2.0).round() as usize;
    let far = (2.0 * period).round() as usize;

    let mut cumulative = vec![0.0f64; n];
    let mut backlink: Vec<Option<usize>> = vec![None; n];
    let mut started = false;

    for i in 0..n {
        let mut best: Option<(usize, f64)> = None;
        if i >= near {
            let lo = i.saturating_sub(far);
            for prev in lo..=(i - near) {
                let ratio = (i - prev) as f64 / period;
                let penalty = -tightness * ratio.ln().powi(2);
                let candidate = cumulative[prev] + penalty;
                if best.map_or(true, |(_, v)| candidate > v) {
                    best = Some((prev, candidate));
                }
            }
        }

        cumulative[i] = local[i] + best.map_or(0.0, |(_, v)| v);

        if !started && local[i] < first_threshold {
            backlink[i] = None;
        } else {
            backlink[i] = best.map(|(p, _)| p);
            started = true;
        }
    }

    let Some(last) = last_beat(&cumulative) else {
        return Vec::new();
    };

    let mut beats = vec![last];
    let mut cursor = last;
    while let Some(prev) = backlink[cursor] {
        beats.push(prev);
        cursor = prev;
    }
    beats.reverse();

    trim_weak_edges(&mut beats, &local);
    beats
}

/// Onset strength smoothed by a Gaussian spanning one period each side
fn local_score(onsets: &[f64], period: f64) -> Vec<f64> {
    let half = period.round() as isize;
    let sigma = period / 32.0;
    let kernel: Vec<f64> = (-half..=half)
        .map(|k| (-0.5 * (k as f64 / sigma).powi(2)).exp())
        .collect();

    let n = onsets.len() as isize;
    (0..n)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(j, &w)| {
                    let idx = i + j as isize - half;
                    (0..n).contains(&idx).then(|| w * onsets[idx as usize])
                })
                .sum()
        })
        .collect()
}

/// Final beat: the last local maximum of the cumulative score above half
/// the median of all local maxima
fn last_beat(cumulative: &[f64]) -> Option<usize> {
    let n = cumulative.len();
    if n == 0 {
        return None;
    }
    if n < 3 {
        return Some(n - 1);
    }

    let maxima: Vec<usize> = (1..n - 1)
        .filter(|&i| cumulative[i] > cumulative[i - 1] && cumulative[i] >= cumulative[i + 1])
        .collect();
    if maxima.is_empty() {
        return Some(n - 1);
    }

    let mut values: Vec<f64> = maxima.iter().map(|&i| cumulative[i]).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    let median = values[values.len() / 2];

    maxima
        .iter()
        .rev()
        .find(|&&i| cumulative[i] > 0.5 * median)
        .copied()
        .or_else(|| maxima.last().copied())
}

/// Drop leading and trailing beats that sit on weak onsets
fn trim_weak_edges(beats: &mut Vec<usize>, local: &[f64]) {
    if beats.len() < 3 {
        return;
    }
    let rms = (beats.iter().map(|&b| local[b].powi(2)).sum::<f64>() / beats.len() as f64).sqrt();
    let threshold = 0.5 * rms;

    let start = beats.iter().position(|&b| local[b] >= threshold).unwrap_or(0);
    let end = beats
        .iter()
        .rposition(|&b| local[b] >= threshold)
        .map_or(beats.len(), |i| i + 1);
    if start < end {
        beats.truncate(end);
        beats.drain(..start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_signals::{click_track, stepped_track, tone};

    fn mono(samples: Vec<f32>, sample_rate: u32) -> SampleBuffer {
        SampleBuffer::from_mono(samples, sample_rate).unwrap()
    }

    #[test]
    fn test_120_bpm_click_track() {
        let buffer = mono(click_track(120.0, 44100, 10.0), 44100);
        let grid = estimate_tempo(&buffer, &TempoConfig::default()).unwrap();

        assert!((grid.bpm() - 120.0).abs() < 2.0, "detected {:.2} BPM", grid.bpm());
        assert!(grid.len() >= 16 && grid.len() <= 21, "{} beats", grid.len());

        // Consecutive beats about half a second apart
        for pair in grid.beats().windows(2) {
            let interval = pair[1] - pair[0];
            assert!((interval - 0.5).abs() < 0.05, "interval {:.3}", interval);
        }
        assert!(grid.beats()[0] >= 0.0);
        assert!(*grid.beats().last().unwrap() <= buffer.duration_seconds());
    }

    #[test]
    fn test_fast_click_track_keeps_its_octave() {
        for bpm in [170.0, 175.0] {
            let buffer = mono(click_track(bpm, 44100, 10.0), 44100);
            let grid = estimate_tempo(&buffer, &TempoConfig::default()).unwrap();
            assert!((grid.bpm() - bpm).abs() < 2.0, "{} BPM detected as {:.2}", bpm, grid.bpm());
            assert!(*grid.beats().last().unwrap() <= buffer.duration_seconds());
        }
    }

    #[test]
    fn test_slow_click_track_not_doubled() {
        for bpm in [65.0, 90.0] {
            let buffer = mono(click_track(bpm, 44100, 12.0), 44100);
            let grid = estimate_tempo(&buffer, &TempoConfig::default()).unwrap();
            assert!((grid.bpm() - bpm).abs() < 2.0, "{} BPM detected as {:.2}", bpm, grid.bpm());
        }
    }

    #[test]
    fn test_128_bpm_click_track() {
        let buffer = mono(click_track(128.0, 44100, 10.0), 44100);
        let grid = estimate_tempo(&buffer, &TempoConfig::default()).unwrap();
        assert!((grid.bpm() - 128.0).abs() < 2.0, "detected {:.2} BPM", grid.bpm());
    }

    #[test]
    fn test_48khz_input() {
        let buffer = mono(click_track(120.0, 48000, 8.0), 48000);
        let grid = estimate_tempo(&buffer, &TempoConfig::default()).unwrap();
        assert!((grid.bpm() - 120.0).abs() < 2.0, "detected {:.2} BPM", grid.bpm());
    }

    #[test]
    fn test_stereo_input() {
        let clicks = click_track(120.0, 44100, 6.0);
        let interleaved: Vec<f32> = clicks.iter().flat_map(|&s| [s, s]).collect();
        let buffer = SampleBuffer::new(interleaved, 2, 44100).unwrap();
        let grid = estimate_tempo(&buffer, &TempoConfig::default()).unwrap();
        assert!((grid.bpm() - 120.0).abs() < 2.0);
    }

    #[test]
    fn test_short_input_rejected() {
        let buffer = mono(click_track(120.0, 44100, 1.0), 44100);
        match estimate_tempo(&buffer, &TempoConfig::default()) {
            Err(DropError::InsufficientAudio { duration, minimum }) => {
                assert!((duration - 1.0).abs() < 1e-6);
                assert_eq!(minimum, 2.0);
            }
            other => panic!("expected InsufficientAudio, got {:?}", other),
        }
    }

    #[test]
    fn test_silence_uses_prior_tempo() {
        let config = TempoConfig::default();
        let buffer = mono(vec![0.0; 44100 * 5], 44100);
        let grid = estimate_tempo(&buffer, &config).unwrap();
        assert!(grid.bpm() >= config.min_bpm && grid.bpm() <= config.max_bpm);
        assert_eq!(grid.bpm(), config.prior_bpm);
        assert!(!grid.is_empty());
    }

    #[test]
    fn test_sustained_tone_stays_in_range() {
        let config = TempoConfig::default();
        let buffer = mono(tone(440.0, 44100, 4.0, 0.5), 44100);
        let grid = estimate_tempo(&buffer, &config).unwrap();
        assert!(grid.bpm() >= config.min_bpm && grid.bpm() <= config.max_bpm);
    }

    #[test]
    fn test_stepped_track_tempo() {
        let buffer = mono(stepped_track(44100), 44100);
        let grid = estimate_tempo(&buffer, &TempoConfig::default()).unwrap();
        assert!((grid.bpm() - 120.0).abs() < 2.0, "detected {:.2} BPM", grid.bpm());
        assert!(grid.len() > 50);
        let duration = buffer.duration_seconds();
        assert!(grid.beats().iter().all(|&b| (0.0..=duration).contains(&b)));
    }

    #[test]
    fn test_prior_prefers_nearby_octave() {
        assert!(tempo_prior(120.0, 120.0) > tempo_prior(60.0, 120.0));
        assert!((tempo_prior(240.0, 120.0) - tempo_prior(60.0, 120.0)).abs() < 1e-12);
    }

    #[test]
    fn test_last_beat_picks_final_strong_peak() {
        let cumulative = [0.0, 5.0, 1.0, 6.0, 2.0, 7.0, 3.0, 0.5, 1.0];
        assert_eq!(last_beat(&cumulative), Some(5));
    }
}
