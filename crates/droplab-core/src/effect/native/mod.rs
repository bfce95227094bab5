//! Native Rust effects

mod filter;
mod gain;

pub use filter::FilterSweepEffect;
pub use gain::{FadeEffect, LimiterEffect};
