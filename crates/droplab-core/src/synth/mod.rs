//! Drop synthesis
//!
//! Renders a rhythm pattern over one segment of the source track, then runs
//! the result through a low-pass sweep, a fade envelope and a peak ceiling.
//! The output spans exactly the segment's frames.

mod grain;

use std::fmt;

use crate::analysis::BeatGrid;
use crate::config::SynthesisConfig;
use crate::effect::native::{FadeEffect, FilterSweepEffect, LimiterEffect};
use crate::effect::{EffectChain, EffectSnapshot};
use crate::error::{DropError, Result};
use crate::pattern::{select_pattern, Groove, Onset, RhythmPattern, Style};
use crate::segment::{Segment, SegmentLabel};
use crate::types::{Sample, SampleBuffer};

use grain::GrainBank;

/// Which segment a drop is rendered over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Most confident build, else loudest steady section
    #[default]
    Auto,
    /// Explicit segment index
    Index(usize),
}

/// What to generate
///
/// Style and groove stay as the names the user picked; they are resolved
/// against the pattern registry when the drop is generated, so an unknown
/// name surfaces as `UnknownStyle`/`UnknownGroove` at that point.
#[derive(Debug, Clone, PartialEq)]
pub struct DropRequest {
    /// Style name, e.g. "Afro House"
    pub style: String,
    /// Groove name, e.g. "Shuffle"
    pub groove: String,
    pub selection: SelectionPolicy,
}

impl DropRequest {
    pub fn new(style: impl Into<String>, groove: impl Into<String>) -> Self {
        Self {
            style: style.into(),
            groove: groove.into(),
            selection: SelectionPolicy::Auto,
        }
    }

    /// Request a known style and groove
    pub fn for_pattern(style: Style, groove: Groove) -> Self {
        Self::new(style.display_name(), groove.display_name())
    }

    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    /// Resolve the requested pattern
    pub fn pattern(&self) -> Result<&'static RhythmPattern> {
        select_pattern(&self.style, &self.groove)
    }
}

impl Default for DropRequest {
    fn default() -> Self {
        Self::for_pattern(Style::House, Groove::Standard)
    }
}

/// A rendered drop and how it was made
#[derive(Debug, Clone)]
pub struct DropResult {
    /// Rendered audio, same channel count and sample rate as the source
    pub audio: SampleBuffer,
    /// Index of the segment used
    pub segment_index: usize,
    pub segment: Segment,
    pub style: Style,
    pub groove: Groove,
    /// Tempo the pattern was rendered at
    pub bpm: f64,
    /// Number of voice triggers rendered
    pub grains: usize,
    /// Effect parameters, in processing order
    pub effects: Vec<EffectSnapshot>,
}

impl DropResult {
    pub fn duration_seconds(&self) -> f64 {
        self.audio.duration_seconds()
    }
}

impl fmt::Display for DropResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} / {} at {:.1} BPM over segment {} ({})",
            self.style, self.groove, self.bpm, self.segment_index, self.segment.label
        )?;
        writeln!(
            f,
            "  {:.2}s - {:.2}s, {} grains",
            self.segment.start, self.segment.end, self.grains
        )?;
        for effect in &self.effects {
            write!(f, "  {}:", effect.name)?;
            for (name, value, unit) in &effect.params {
                write!(f, " {}={:.2}{}", name, value, unit)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Pick the segment a drop is rendered over
///
/// `Auto` takes the build with the highest confidence, otherwise the steady
/// section with the highest energy; ties go to the earliest segment.
pub fn select_segment(segments: &[Segment], policy: SelectionPolicy) -> Result<usize> {
    match policy {
        SelectionPolicy::Index(i) => {
            if i < segments.len() {
                Ok(i)
            } else {
                Err(DropError::Synthesis(format!(
                    "segment index {} out of range ({} segments)",
                    i,
                    segments.len()
                )))
            }
        }
        SelectionPolicy::Auto => {
            let best = |label: SegmentLabel, key: fn(&Segment) -> f64| {
                segments
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.label == label)
                    .fold(None, |acc: Option<(usize, f64)>, (i, s)| match acc {
                        Some((_, v)) if key(s) <= v => acc,
                        _ => Some((i, key(s))),
                    })
                    .map(|(i, _)| i)
            };

            best(SegmentLabel::Build, |s| s.confidence)
                .or_else(|| best(SegmentLabel::Steady, |s| s.energy_db))
                .ok_or_else(|| {
                    DropError::Synthesis("no build or steady segment to render over".into())
                })
        }
    }
}

/// Select a segment, look up the pattern and render the drop
pub fn generate_drop(
    buffer: &SampleBuffer,
    grid: &BeatGrid,
    segments: &[Segment],
    request: &DropRequest,
    config: &SynthesisConfig,
) -> Result<DropResult> {
    let pattern = request.pattern()?;
    let index = select_segment(segments, request.selection)?;
    render_drop(buffer, grid, &segments[index], index, pattern, config)
}

/// Onset times of a pattern laid over `[start, end)`
///
/// Cycles start on the first beat position in the range. An offset within a
/// beat is scaled by that beat's own length, so onsets stay between the
/// tracked beats.
fn schedule(
    grid: &BeatGrid,
    pattern: &'static RhythmPattern,
    start: f64,
    end: f64,
) -> Vec<(f64, &'static Onset)> {
    let beats = grid.positions(start, end);
    let cycle = pattern.cycle_beats.max(1) as usize;
    let mut times = Vec::new();
    for (k, &beat) in beats.iter().enumerate() {
        let length = beats.get(k + 1).map_or(grid.period(), |next| next - beat);
        let beat_in_cycle = (k % cycle) as u8;
        for onset in pattern.onsets_on(beat_in_cycle) {
            times.push((beat + onset.offset as f64 * length, onset));
        }
    }
    times
}

/// Render a pattern over one segment
///
/// The segment bounds are snapped to sample frames; the returned
/// [`DropResult::segment`] carries the snapped times.
pub fn render_drop(
    buffer: &SampleBuffer,
    grid: &BeatGrid,
    segment: &Segment,
    segment_index: usize,
    pattern: &'static RhythmPattern,
    config: &SynthesisConfig,
) -> Result<DropResult> {
    let sample_rate = buffer.sample_rate();
    let start_frame = buffer.frame_at(segment.start);
    let end_frame = buffer.frame_at(segment.end);
    let frames = end_frame.saturating_sub(start_frame);
    let seconds = frames as f64 / sample_rate as f64;

    let period = grid.period();
    let cycle = pattern.cycle_beats as f64 * period;
    if seconds < cycle {
        return Err(DropError::Synthesis(format!(
            "segment of {:.2}s is shorter than one {}-beat cycle ({:.2}s at {:.1} BPM)",
            seconds,
            pattern.cycle_beats,
            cycle,
            grid.bpm()
        )));
    }

    log::info!(
        "render_drop: {} / {} over {:.2}s-{:.2}s ({} frames) at {:.1} BPM",
        pattern.style,
        pattern.groove,
        segment.start,
        segment.end,
        frames,
        grid.bpm()
    );

    // Pattern layer
    let bank = GrainBank::new(sample_rate);
    let mut layer: Vec<Sample> = vec![0.0; frames];
    let mut grains = 0usize;
    let segment_start = start_frame as f64 / sample_rate as f64;
    let segment_end = end_frame as f64 / sample_rate as f64;

    for (time, onset) in schedule(grid, pattern, segment_start, segment_end) {
        let offset = ((time - segment_start) * sample_rate as f64).round();
        if offset < 0.0 || offset as usize >= frames {
            continue;
        }
        let gain = onset.accent * config.grain_gain;
        for &voice in onset.voices {
            bank.trigger(voice, &mut layer, offset as usize, gain);
            grains += 1;
        }
    }

    // Mix pattern over the source
    let mut audio = buffer.slice_frames(start_frame, end_frame);
    let channels = audio.channels() as usize;
    for (frame, &hit) in audio.samples_mut().chunks_exact_mut(channels).zip(&layer) {
        for sample in frame.iter_mut() {
            *sample = *sample * config.source_mix + hit * config.pattern_mix;
        }
    }

    let mut chain = EffectChain::new()
        .with(FilterSweepEffect::new().with_sweep(
            config.sweep_start_hz,
            config.sweep_end_hz,
            config.resonance,
        ))
        .with(FadeEffect::new(config.fade_fraction))
        .with(LimiterEffect::new(1.0));
    chain.process(&mut audio);

    log::info!(
        "render_drop: {} grains, output peak {:.3}",
        grains,
        audio.peak()
    );

    Ok(DropResult {
        audio,
        segment_index,
        segment: Segment {
            start: segment_start,
            end: segment_end,
            ..segment.clone()
        },
        style: pattern.style,
        groove: pattern.groove,
        bpm: grid.bpm(),
        grains,
        effects: chain.snapshots(),
    })
}
