//! Section detection over beat-synchronous frames
//!
//! The track is cut at every grid beat. Each cut-to-cut frame is summarised
//! by log band energies plus RMS level; novelty at a beat is the distance
//! between the average features just before and just after it. Novelty
//! peaks become section boundaries and each section is labelled by its
//! energy trend.

use std::fmt;

use crate::analysis::{BeatGrid, Spectrogram};
use crate::config::SegmentConfig;
use crate::error::{DropError, Result};
use crate::types::SampleBuffer;

const FFT_SIZE: usize = 2048;
const HOP_SIZE: usize = 512;
const DB_FLOOR: f64 = -80.0;
const LOWEST_BAND_HZ: f32 = 60.0;
const HIGHEST_BAND_HZ: f32 = 16000.0;

/// Energy spread used to turn level differences into confidence
const ENERGY_SCALE_DB: f64 = 12.0;

/// Role of a section in the arrangement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentLabel {
    /// Quiet flat section in the first half of the track
    Intro,
    /// Section with rising energy
    Build,
    /// Flat section at or above the track's mean energy
    Steady,
    /// Quiet flat section in the second half of the track
    Outro,
}

impl SegmentLabel {
    pub fn name(&self) -> &'static str {
        match self {
            SegmentLabel::Intro => "intro",
            SegmentLabel::Build => "build",
            SegmentLabel::Steady => "steady",
            SegmentLabel::Outro => "outro",
        }
    }
}

impl fmt::Display for SegmentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A labelled section of the track
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds (exclusive, greater than `start`)
    pub end: f64,
    pub label: SegmentLabel,
    /// How decisively the section matched its label, in [0, 1]
    pub confidence: f64,
    /// Mean RMS level in dBFS
    pub energy_db: f64,
}

impl Segment {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>7.2}s - {:>7.2}s  {:<6}  conf {:.2}  {:.1} dB",
            self.start, self.end, self.label, self.confidence, self.energy_db
        )
    }
}

/// Features of one beat-synchronous frame
struct BeatFrame {
    start: f64,
    end: f64,
    /// Band energies followed by RMS level, all in dB
    features: Vec<f64>,
    rms_db: f64,
}

impl BeatFrame {
    fn centre(&self) -> f64 {
        0.5 * (self.start + self.end)
    }
}

/// Partition a track into labelled sections
///
/// Returned segments are ordered, share their endpoints and cover
/// `[0, duration]`. Fails with [`DropError::Segmentation`] when no internal
/// boundary is found, i.e. the track is too short or too uniform.
pub fn segment(buffer: &SampleBuffer, grid: &BeatGrid, config: &SegmentConfig) -> Result<Vec<Segment>> {
    let duration = buffer.duration_seconds();
    let window = config.novelty_window_beats.max(1);
    let min_gap = config.min_segment_beats.max(window);

    let frames = beat_frames(buffer, grid, config.bands)?;
    log::info!(
        "segment: {} beat frames over {:.2}s, window {} beats",
        frames.len(),
        duration,
        window
    );

    if frames.len() < 2 * min_gap {
        return Err(DropError::Segmentation(format!(
            "{} beat frames, at least {} needed",
            frames.len(),
            2 * min_gap
        )));
    }

    let novelty = novelty_curve(&frames, window);
    let cuts = pick_peaks(&novelty, window, min_gap, config);
    if cuts.is_empty() {
        return Err(DropError::Segmentation(
            "no section boundary found (track too uniform)".into(),
        ));
    }

    // Cut indices refer to the frame a new section starts at
    let mut ranges = Vec::with_capacity(cuts.len() + 1);
    let mut first = 0;
    for &cut in &cuts {
        ranges.push(first..cut);
        first = cut;
    }
    ranges.push(first..frames.len());

    let track_mean = mean(frames.iter().map(|f| f.rms_db));
    let segments: Vec<Segment> = ranges
        .into_iter()
        .map(|range| {
            let slice = &frames[range];
            let start = slice[0].start;
            let end = slice[slice.len() - 1].end;
            classify(slice, start, end, duration, track_mean, config)
        })
        .collect();

    for seg in &segments {
        log::debug!("segment: {}", seg);
    }
    log::info!("segment: {} sections", segments.len());

    Ok(segments)
}

/// The whole track as one steady section with zero confidence
///
/// Used when segmentation finds no boundary and the caller still wants to
/// render something.
pub fn whole_track(buffer: &SampleBuffer) -> Segment {
    let mono = buffer.to_mono();
    Segment {
        start: 0.0,
        end: buffer.duration_seconds(),
        label: SegmentLabel::Steady,
        confidence: 0.0,
        energy_db: rms_db(&mono),
    }
}

fn beat_frames(buffer: &SampleBuffer, grid: &BeatGrid, bands: usize) -> Result<Vec<BeatFrame>> {
    let duration = buffer.duration_seconds();
    let sample_rate = buffer.sample_rate();
    let mono = buffer.to_mono();

    let spec = Spectrogram::compute(&mono, sample_rate, FFT_SIZE, HOP_SIZE)?;
    if spec.num_frames() == 0 {
        return Err(DropError::Segmentation(format!(
            "{:.2}s is too short to analyse",
            duration
        )));
    }

    // Boundaries: 0, every beat strictly inside the track, duration
    let mut bounds = Vec::with_capacity(grid.len() + 2);
    bounds.push(0.0);
    bounds.extend(grid.beats().iter().copied().filter(|&b| b > 0.0 && b < duration));
    bounds.push(duration);

    let edges = band_edges(bands, sample_rate);

    let frames = bounds
        .windows(2)
        .filter(|w| w[1] > w[0])
        .map(|w| {
            let (start, end) = (w[0], w[1]);
            let lo = buffer.frame_at(start);
            let hi = buffer.frame_at(end).max(lo);
            let level = rms_db(&mono[lo..hi]);

            let power = mean_power(&spec, start, end);
            let mut features: Vec<f64> = edges
                .windows(2)
                .map(|e| band_db(&power, e[0], e[1]))
                .collect();
            features.push(level);

            BeatFrame {
                start,
                end,
                features,
                rms_db: level,
            }
        })
        .collect();

    Ok(frames)
}

/// Log-spaced bin edges for `bands` bands
fn band_edges(bands: usize, sample_rate: u32) -> Vec<usize> {
    let bins = FFT_SIZE / 2 + 1;
    let hz_per_bin = sample_rate as f32 / FFT_SIZE as f32;
    let top = HIGHEST_BAND_HZ.min(sample_rate as f32 / 2.0).max(LOWEST_BAND_HZ * 2.0);
    let ratio = (top / LOWEST_BAND_HZ).powf(1.0 / bands as f32);

    let mut edges: Vec<usize> = (0..=bands)
        .map(|i| {
            let hz = LOWEST_BAND_HZ * ratio.powi(i as i32);
            ((hz / hz_per_bin).round() as usize).min(bins - 1)
        })
        .collect();
    // Every band gets at least one bin
    for i in 1..edges.len() {
        if edges[i] <= edges[i - 1] {
            edges[i] = edges[i - 1] + 1;
        }
    }
    edges
}

/// Average power spectrum of the STFT frames centred in `[start, end)`
fn mean_power(spec: &Spectrogram, start: f64, end: f64) -> Vec<f64> {
    let last = spec.num_frames() - 1;
    let mut indices: Vec<usize> = (0..=last)
        .skip_while(|&k| spec.frame_time(k) < start)
        .take_while(|&k| spec.frame_time(k) < end)
        .collect();
    if indices.is_empty() {
        let centre = 0.5 * (start + end);
        let nearest = (0..=last)
            .min_by(|&a, &b| {
                (spec.frame_time(a) - centre)
                    .abs()
                    .total_cmp(&(spec.frame_time(b) - centre).abs())
            })
            .unwrap_or(0);
        indices.push(nearest);
    }

    let mut power = vec![0.0f64; spec.num_bins()];
    for &k in &indices {
        for (p, &m) in power.iter_mut().zip(spec.frame(k)) {
            *p += (m as f64) * (m as f64);
        }
    }
    let scale = 1.0 / indices.len() as f64;
    power.iter_mut().for_each(|p| *p *= scale);
    power
}

fn band_db(power: &[f64], lo: usize, hi: usize) -> f64 {
    let hi = hi.min(power.len());
    if hi <= lo {
        return DB_FLOOR;
    }
    let band = power[lo..hi].iter().sum::<f64>() / (hi - lo) as f64;
    to_db(band)
}

fn rms_db(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return DB_FLOOR;
    }
    let power = samples.iter().map(|&s| (s as f64) * (s as f64)).sum::<f64>() / samples.len() as f64;
    to_db(power)
}

fn to_db(power: f64) -> f64 {
    if power <= 0.0 {
        DB_FLOOR
    } else {
        (10.0 * power.log10()).max(DB_FLOOR)
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Novelty at each frame start: distance between the mean features of the
/// `window` frames before and the `window` frames after
fn novelty_curve(frames: &[BeatFrame], window: usize) -> Vec<f64> {
    let dims = frames.first().map_or(0, |f| f.features.len());
    let average = |range: std::ops::Range<usize>| -> Vec<f64> {
        let count = range.len() as f64;
        let mut acc = vec![0.0; dims];
        for frame in &frames[range] {
            for (a, &v) in acc.iter_mut().zip(&frame.features) {
                *a += v;
            }
        }
        acc.iter_mut().for_each(|a| *a /= count);
        acc
    };

    (0..frames.len())
        .map(|i| {
            if i < window || i + window > frames.len() {
                return 0.0;
            }
            let before = average(i - window..i);
            let after = average(i..i + window);
            before
                .iter()
                .zip(&after)
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f64>()
                .sqrt()
        })
        .collect()
}

/// Boundary frame indices, ascending
fn pick_peaks(novelty: &[f64], window: usize, min_gap: usize, config: &SegmentConfig) -> Vec<usize> {
    let n = novelty.len();
    let max = novelty.iter().cloned().fold(0.0f64, f64::max);
    let threshold = (config.peak_threshold * max).max(config.min_novelty);

    let mut candidates: Vec<usize> = (min_gap..=n.saturating_sub(min_gap))
        .filter(|&i| i < n && novelty[i] >= threshold)
        .filter(|&i| {
            let lo = i.saturating_sub(window);
            let hi = (i + window).min(n - 1);
            (lo..=hi).all(|j| novelty[j] <= novelty[i])
        })
        .collect();

    // Strongest first; the spacing rule then drops weaker neighbours
    candidates.sort_by(|&a, &b| novelty[b].total_cmp(&novelty[a]).then(a.cmp(&b)));
    let mut picked: Vec<usize> = Vec::new();
    for c in candidates {
        if picked.iter().all(|&p| p.abs_diff(c) >= min_gap) {
            picked.push(c);
        }
    }
    picked.sort_unstable();

    log::debug!(
        "pick_peaks: max novelty {:.2}, threshold {:.2}, {} boundaries",
        max,
        threshold,
        picked.len()
    );
    picked
}

/// Least-squares slope of level over time, in dB per second
fn energy_slope(frames: &[BeatFrame]) -> f64 {
    if frames.len() < 2 {
        return 0.0;
    }
    let mx = mean(frames.iter().map(BeatFrame::centre));
    let my = mean(frames.iter().map(|f| f.rms_db));
    let (cov, var) = frames.iter().fold((0.0, 0.0), |(c, v), f| {
        let dx = f.centre() - mx;
        (c + dx * (f.rms_db - my), v + dx * dx)
    });
    if var <= 0.0 {
        0.0
    } else {
        cov / var
    }
}

fn classify(
    frames: &[BeatFrame],
    start: f64,
    end: f64,
    duration: f64,
    track_mean: f64,
    config: &SegmentConfig,
) -> Segment {
    let energy_db = mean(frames.iter().map(|f| f.rms_db));

    // Frames at the edges may straddle a transition
    let core = if frames.len() >= 6 {
        &frames[1..frames.len() - 1]
    } else {
        frames
    };
    let slope = energy_slope(core);
    let rising = config.rising_slope_db_per_sec;
    let flatness = (1.0 - slope.abs() / rising).clamp(0.0, 1.0);
    let margin = (energy_db - track_mean) / ENERGY_SCALE_DB;

    let (label, confidence) = if slope > rising {
        (SegmentLabel::Build, 1.0 - rising / slope)
    } else if energy_db >= track_mean {
        (SegmentLabel::Steady, 0.5 * flatness + 0.5 * (0.5 + margin).clamp(0.0, 1.0))
    } else {
        let label = if start < duration / 2.0 {
            SegmentLabel::Intro
        } else {
            SegmentLabel::Outro
        };
        (label, 0.5 * flatness + 0.5 * (0.5 - margin).clamp(0.0, 1.0))
    };

    Segment {
        start,
        end,
        label,
        confidence: confidence.clamp(0.0, 1.0),
        energy_db,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::estimate_tempo;
    use crate::config::TempoConfig;
    use crate::test_signals::{click_track, stepped_track, tone};
    use std::f32::consts::PI;

    fn assert_partition(segments: &[Segment], duration: f64) {
        assert_eq!(segments[0].start, 0.0);
        assert!((segments[segments.len() - 1].end - duration).abs() < 1e-9);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
        for seg in segments {
            assert!(seg.end > seg.start);
            assert!((0.0..=1.0).contains(&seg.confidence));
        }
    }

    #[test]
    fn test_stepped_track_boundaries() {
        let buffer = SampleBuffer::from_mono(stepped_track(44100), 44100).unwrap();
        let grid = BeatGrid::uniform(120.0, 0.0, buffer.duration_seconds()).unwrap();
        let segments = segment(&buffer, &grid, &SegmentConfig::default()).unwrap();

        assert_eq!(segments.len(), 3, "{:?}", segments);
        assert_partition(&segments, 30.0);
        assert!((segments[1].start - 10.0).abs() <= 0.5);
        assert!((segments[2].start - 20.0).abs() <= 0.5);

        assert_eq!(segments[0].label, SegmentLabel::Intro);
        assert_eq!(segments[2].label, SegmentLabel::Steady);
        assert!(segments[2].energy_db > segments[1].energy_db);
        assert!(segments[1].energy_db > segments[0].energy_db);
    }

    #[test]
    fn test_stepped_track_with_tracked_beats() {
        let buffer = SampleBuffer::from_mono(stepped_track(44100), 44100).unwrap();
        let grid = estimate_tempo(&buffer, &TempoConfig::default()).unwrap();
        let segments = segment(&buffer, &grid, &SegmentConfig::default()).unwrap();

        assert!(segments.len() >= 2 && segments.len() <= 3, "{:?}", segments);
        assert_partition(&segments, buffer.duration_seconds());
        for seg in &segments[1..] {
            let near_step = (seg.start - 10.0).abs() <= 0.5 || (seg.start - 20.0).abs() <= 0.5;
            assert!(near_step, "boundary at {:.2}s", seg.start);
        }
    }

    #[test]
    fn test_uniform_track_fails() {
        let mut samples = tone(220.0, 44100, 20.0, 0.2);
        crate::test_signals::add_clicks(&mut samples, 120.0, 44100, 0.35);
        let buffer = SampleBuffer::from_mono(samples, 44100).unwrap();
        let grid = BeatGrid::uniform(120.0, 0.0, 20.0).unwrap();

        match segment(&buffer, &grid, &SegmentConfig::default()) {
            Err(DropError::Segmentation(_)) => {}
            other => panic!("expected Segmentation error, got {:?}", other),
        }
    }

    #[test]
    fn test_too_few_beats_fails() {
        let buffer = SampleBuffer::from_mono(click_track(120.0, 44100, 3.0), 44100).unwrap();
        let grid = BeatGrid::uniform(120.0, 0.0, 3.0).unwrap();
        assert!(matches!(
            segment(&buffer, &grid, &SegmentConfig::default()),
            Err(DropError::Segmentation(_))
        ));
    }

    #[test]
    fn test_rising_section_is_build() {
        // 16s flat quiet, then 16s swelling from quiet to loud
        let sr = 44100;
        let samples: Vec<f32> = (0..sr * 32)
            .map(|i| {
                let t = i as f32 / sr as f32;
                let level = if t < 16.0 {
                    0.01
                } else {
                    0.02 * 10f32.powf((t - 16.0) / 16.0 * 1.5)
                };
                level * (2.0 * PI * 330.0 * t).sin()
            })
            .collect();
        let buffer = SampleBuffer::from_mono(samples, sr as u32).unwrap();
        let grid = BeatGrid::uniform(120.0, 0.0, 32.0).unwrap();
        let segments = segment(&buffer, &grid, &SegmentConfig::default()).unwrap();

        assert_partition(&segments, 32.0);
        let last = &segments[segments.len() - 1];
        assert_eq!(last.label, SegmentLabel::Build);
        assert!(last.confidence > 0.0);
    }

    #[test]
    fn test_whole_track_fallback() {
        let buffer = SampleBuffer::from_mono(tone(440.0, 44100, 4.0, 0.5), 44100).unwrap();
        let seg = whole_track(&buffer);
        assert_eq!(seg.start, 0.0);
        assert!((seg.end - 4.0).abs() < 1e-9);
        assert_eq!(seg.label, SegmentLabel::Steady);
        assert_eq!(seg.confidence, 0.0);
        // 0.5 amplitude sine: RMS 0.354 = -9 dB
        assert!((seg.energy_db + 9.03).abs() < 0.1);
    }

    #[test]
    fn test_band_edges_are_increasing() {
        let edges = band_edges(8, 44100);
        assert_eq!(edges.len(), 9);
        assert!(edges.windows(2).all(|w| w[1] > w[0]));

        let edges = band_edges(8, 8000);
        assert!(*edges.last().unwrap() <= FFT_SIZE / 2 + 1);
    }
}
