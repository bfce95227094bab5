//! Rhythm patterns by style and groove
//!
//! A fixed registry of one-bar templates. Lookup is pure: the same
//! (style, groove) pair always yields the same `&'static` pattern, and an
//! unknown name is an error rather than a silent default.

mod registry;

use std::fmt;
use std::str::FromStr;

use crate::error::{DropError, Result};

/// Musical style of the generated drop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    House,
    AfroHouse,
    TechHouse,
}

impl Style {
    /// All styles in menu order
    pub const ALL: [Style; 3] = [Style::House, Style::AfroHouse, Style::TechHouse];

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            Style::House => "House",
            Style::AfroHouse => "Afro House",
            Style::TechHouse => "Tech House",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Style {
    type Err = DropError;

    /// Accepts display names as well as snake_case and kebab-case forms
    fn from_str(s: &str) -> Result<Self> {
        let key = normalize(s);
        Style::ALL
            .into_iter()
            .find(|style| normalize(style.display_name()) == key)
            .ok_or_else(|| DropError::UnknownStyle(s.to_string()))
    }
}

/// Rhythmic feel applied on top of the style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Groove {
    /// Straight sixteenths
    Standard,
    /// Off-beat sixteenths pushed late
    Shuffle,
    /// Accents moved off the beat
    Syncopated,
}

impl Groove {
    /// All grooves in menu order
    pub const ALL: [Groove; 3] = [Groove::Standard, Groove::Shuffle, Groove::Syncopated];

    pub fn display_name(&self) -> &'static str {
        match self {
            Groove::Standard => "Standard",
            Groove::Shuffle => "Shuffle",
            Groove::Syncopated => "Syncopated",
        }
    }
}

impl fmt::Display for Groove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Groove {
    type Err = DropError;

    fn from_str(s: &str) -> Result<Self> {
        let key = normalize(s);
        Groove::ALL
            .into_iter()
            .find(|groove| normalize(groove.display_name()) == key)
            .ok_or_else(|| DropError::UnknownGroove(s.to_string()))
    }
}

/// "Afro House", "afro_house" and "afro-house" all map to "afrohouse"
fn normalize(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Synthesized sound triggered by an onset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Voice {
    Kick,
    Clap,
    Hat,
    Perc,
    Bass,
}

impl Voice {
    pub fn name(&self) -> &'static str {
        match self {
            Voice::Kick => "kick",
            Voice::Clap => "clap",
            Voice::Hat => "hat",
            Voice::Perc => "perc",
            Voice::Bass => "bass",
        }
    }
}

/// One hit position within a pattern cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Onset {
    /// Beat index within the cycle
    pub beat: u8,
    /// Position within the beat as a fraction in [0, 1)
    pub offset: f32,
    /// Velocity in [0, 1]
    pub accent: f32,
    /// Sounds triggered together at this position
    pub voices: &'static [Voice],
}

impl Onset {
    /// Position within the cycle, in beats
    pub fn position(&self) -> f64 {
        self.beat as f64 + self.offset as f64
    }
}

/// Cyclic rhythmic template
#[derive(Debug, PartialEq)]
pub struct RhythmPattern {
    pub style: Style,
    pub groove: Groove,
    /// Cycle length in beats
    pub cycle_beats: u8,
    /// Hits ordered by position, unique per (beat, offset)
    pub onsets: &'static [Onset],
}

impl RhythmPattern {
    /// Hits that fall on a given beat of the cycle
    pub fn onsets_on(&self, beat: u8) -> impl Iterator<Item = &'static Onset> {
        self.onsets.iter().filter(move |o| o.beat == beat)
    }

    /// Total number of voice triggers in one cycle
    pub fn triggers_per_cycle(&self) -> usize {
        self.onsets.iter().map(|o| o.voices.len()).sum()
    }
}

/// Look up the pattern for a typed style and groove
pub fn pattern_for(style: Style, groove: Groove) -> &'static RhythmPattern {
    registry::lookup(style, groove)
}

/// Look up a pattern by style and groove names
///
/// Fails with [`DropError::UnknownStyle`] or [`DropError::UnknownGroove`];
/// the style is checked first.
pub fn select_pattern(style: &str, groove: &str) -> Result<&'static RhythmPattern> {
    let style: Style = style.parse()?;
    let groove: Groove = groove.parse()?;
    let pattern = pattern_for(style, groove);
    log::debug!(
        "select_pattern: {} / {} -> {} onsets per {} beats",
        style,
        groove,
        pattern.onsets.len(),
        pattern.cycle_beats
    );
    Ok(pattern)
}

/// Every registered pattern
pub fn all_patterns() -> &'static [RhythmPattern] {
    registry::PATTERNS
}
