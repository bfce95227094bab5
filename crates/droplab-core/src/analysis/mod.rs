//! Rhythm analysis: STFT, onset envelope, tempo and beat grid

mod beatgrid;
mod onset;
mod stft;
mod tempo;

pub use beatgrid::BeatGrid;
pub use onset::{onset_strength, OnsetEnvelope};
pub use stft::Spectrogram;
pub use tempo::estimate_tempo;
