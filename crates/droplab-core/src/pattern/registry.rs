//! Built-in pattern table
//!
//! Ordered style-major (House, Afro House, Tech House), groove-minor
//! (Standard, Shuffle, Syncopated) so lookup is an index computation.

use super::{Groove, Onset, RhythmPattern, Style, Voice};

const KICK: &[Voice] = &[Voice::Kick];
const KICK_CLAP: &[Voice] = &[Voice::Kick, Voice::Clap];
const KICK_PERC: &[Voice] = &[Voice::Kick, Voice::Perc];
const HAT: &[Voice] = &[Voice::Hat];
const HAT_BASS: &[Voice] = &[Voice::Hat, Voice::Bass];
const PERC: &[Voice] = &[Voice::Perc];
const PERC_BASS: &[Voice] = &[Voice::Perc, Voice::Bass];
const BASS: &[Voice] = &[Voice::Bass];
const CLAP: &[Voice] = &[Voice::Clap];

const fn hit(beat: u8, offset: f32, accent: f32, voices: &'static [Voice]) -> Onset {
    Onset {
        beat,
        offset,
        accent,
        voices,
    }
}

const fn pattern(style: Style, groove: Groove, onsets: &'static [Onset]) -> RhythmPattern {
    RhythmPattern {
        style,
        groove,
        cycle_beats: 4,
        onsets,
    }
}

const HOUSE_STANDARD: &[Onset] = &[
    hit(0, 0.0, 1.0, KICK),
    hit(0, 0.5, 0.7, HAT_BASS),
    hit(1, 0.0, 1.0, KICK_CLAP),
    hit(1, 0.5, 0.7, HAT_BASS),
    hit(2, 0.0, 1.0, KICK),
    hit(2, 0.5, 0.7, HAT_BASS),
    hit(3, 0.0, 1.0, KICK_CLAP),
    hit(3, 0.5, 0.7, HAT_BASS),
];

const HOUSE_SHUFFLE: &[Onset] = &[
    hit(0, 0.0, 1.0, KICK),
    hit(0, 0.58, 0.65, HAT_BASS),
    hit(1, 0.0, 1.0, KICK_CLAP),
    hit(1, 0.58, 0.65, HAT),
    hit(1, 0.83, 0.4, HAT),
    hit(2, 0.0, 1.0, KICK),
    hit(2, 0.58, 0.65, HAT_BASS),
    hit(3, 0.0, 1.0, KICK_CLAP),
    hit(3, 0.58, 0.65, HAT),
    hit(3, 0.83, 0.4, HAT),
];

const HOUSE_SYNCOPATED: &[Onset] = &[
    hit(0, 0.0, 1.0, KICK),
    hit(0, 0.75, 0.6, BASS),
    hit(1, 0.0, 1.0, KICK_CLAP),
    hit(1, 0.5, 0.7, HAT),
    hit(2, 0.0, 1.0, KICK),
    hit(2, 0.25, 0.55, BASS),
    hit(2, 0.75, 0.6, HAT),
    hit(3, 0.0, 1.0, KICK_CLAP),
    hit(3, 0.5, 0.7, HAT_BASS),
];

const AFRO_STANDARD: &[Onset] = &[
    hit(0, 0.0, 1.0, KICK),
    hit(0, 0.5, 0.6, PERC),
    hit(0, 0.75, 0.45, HAT),
    hit(1, 0.0, 0.9, KICK),
    hit(1, 0.5, 0.7, PERC_BASS),
    hit(2, 0.0, 1.0, KICK),
    hit(2, 0.25, 0.5, PERC),
    hit(2, 0.75, 0.45, HAT),
    hit(3, 0.0, 0.9, KICK_CLAP),
    hit(3, 0.5, 0.7, PERC_BASS),
];

const AFRO_SHUFFLE: &[Onset] = &[
    hit(0, 0.0, 1.0, KICK),
    hit(0, 0.67, 0.6, PERC),
    hit(1, 0.0, 0.9, KICK),
    hit(1, 0.33, 0.5, HAT),
    hit(1, 0.67, 0.7, PERC_BASS),
    hit(2, 0.0, 1.0, KICK),
    hit(2, 0.67, 0.6, PERC),
    hit(3, 0.0, 0.9, KICK_CLAP),
    hit(3, 0.33, 0.5, HAT),
    hit(3, 0.67, 0.7, PERC_BASS),
];

const AFRO_SYNCOPATED: &[Onset] = &[
    hit(0, 0.0, 1.0, KICK_PERC),
    hit(0, 0.75, 0.65, PERC),
    hit(1, 0.5, 0.7, PERC_BASS),
    hit(2, 0.0, 1.0, KICK),
    hit(2, 0.25, 0.55, HAT),
    hit(2, 0.75, 0.65, PERC),
    hit(3, 0.0, 0.8, CLAP),
    hit(3, 0.5, 0.7, PERC_BASS),
];

const TECH_STANDARD: &[Onset] = &[
    hit(0, 0.0, 1.0, KICK),
    hit(0, 0.5, 0.75, HAT_BASS),
    hit(1, 0.0, 1.0, KICK_CLAP),
    hit(1, 0.25, 0.35, HAT),
    hit(1, 0.5, 0.75, HAT_BASS),
    hit(2, 0.0, 1.0, KICK),
    hit(2, 0.5, 0.75, HAT_BASS),
    hit(3, 0.0, 1.0, KICK_CLAP),
    hit(3, 0.25, 0.35, HAT),
    hit(3, 0.5, 0.75, HAT_BASS),
];

const TECH_SHUFFLE: &[Onset] = &[
    hit(0, 0.0, 1.0, KICK),
    hit(0, 0.58, 0.7, HAT_BASS),
    hit(1, 0.0, 1.0, KICK_CLAP),
    hit(1, 0.58, 0.7, HAT),
    hit(2, 0.0, 1.0, KICK),
    hit(2, 0.33, 0.4, PERC),
    hit(2, 0.58, 0.7, HAT_BASS),
    hit(3, 0.0, 1.0, KICK_CLAP),
    hit(3, 0.58, 0.7, HAT),
    hit(3, 0.83, 0.45, BASS),
];

const TECH_SYNCOPATED: &[Onset] = &[
    hit(0, 0.0, 1.0, KICK),
    hit(0, 0.75, 0.7, BASS),
    hit(1, 0.0, 1.0, KICK_CLAP),
    hit(1, 0.5, 0.6, HAT),
    hit(1, 0.75, 0.5, PERC),
    hit(2, 0.0, 1.0, KICK),
    hit(2, 0.5, 0.6, HAT_BASS),
    hit(3, 0.0, 1.0, KICK_CLAP),
    hit(3, 0.25, 0.55, BASS),
    hit(3, 0.75, 0.6, HAT),
];

pub(super) static PATTERNS: &[RhythmPattern] = &[
    pattern(Style::House, Groove::Standard, HOUSE_STANDARD),
    pattern(Style::House, Groove::Shuffle, HOUSE_SHUFFLE),
    pattern(Style::House, Groove::Syncopated, HOUSE_SYNCOPATED),
    pattern(Style::AfroHouse, Groove::Standard, AFRO_STANDARD),
    pattern(Style::AfroHouse, Groove::Shuffle, AFRO_SHUFFLE),
    pattern(Style::AfroHouse, Groove::Syncopated, AFRO_SYNCOPATED),
    pattern(Style::TechHouse, Groove::Standard, TECH_STANDARD),
    pattern(Style::TechHouse, Groove::Shuffle, TECH_SHUFFLE),
    pattern(Style::TechHouse, Groove::Syncopated, TECH_SYNCOPATED),
];

pub(super) fn lookup(style: Style, groove: Groove) -> &'static RhythmPattern {
    let s = match style {
        Style::House => 0,
        Style::AfroHouse => 1,
        Style::TechHouse => 2,
    };
    let g = match groove {
        Groove::Standard => 0,
        Groove::Shuffle => 1,
        Groove::Syncopated => 2,
    };
    &PATTERNS[s * 3 + g]
}
