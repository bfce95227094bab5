//! DropLab Core - drop generation from uploaded tracks
//!
//! Decodes an upload, finds its tempo and sections, and renders a new
//! drop over one section with a style/groove pattern and a filter sweep.
//! [`pipeline::DropPipeline`] ties the stages together.

pub mod analysis;
pub mod config;
pub mod decoder;
pub mod effect;
pub mod error;
pub mod export;
pub mod info;
pub mod pattern;
pub mod pipeline;
pub mod segment;
pub mod synth;
pub mod types;

#[cfg(test)]
mod test_signals;

pub use analysis::{estimate_tempo, BeatGrid};
pub use config::DropConfig;
pub use decoder::{decode, mime_for_extension, DecodeError};
pub use error::{DropError, Result};
pub use export::{encode_wav, write_wav};
pub use info::TrackInfo;
pub use pattern::{pattern_for, select_pattern, Groove, RhythmPattern, Style};
pub use pipeline::{AudioInput, CancelToken, DropPipeline, DropReport, PipelineError, Stage};
pub use segment::{segment, Segment, SegmentLabel};
pub use synth::{generate_drop, DropRequest, DropResult, SelectionPolicy};
pub use types::{Sample, SampleBuffer};
