//! Common types for DropLab
//!
//! This module contains the fundamental audio buffer type shared by every
//! pipeline stage: an interleaved, multi-channel block of `f32` samples
//! tagged with its sample rate.

use std::ops::Index;

use crate::error::{DropError, Result};

/// Audio sample type (32-bit float, nominal range [-1.0, 1.0])
pub type Sample = f32;

/// Decoded audio: interleaved samples, channel count and sample rate
///
/// Buffers handed out by the decoder are never modified afterwards; the only
/// mutable access is crate-private and used while rendering a new output
/// buffer inside the synthesis engine.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    samples: Vec<Sample>,
    channels: u16,
    sample_rate: u32,
}

impl SampleBuffer {
    /// Create a buffer from interleaved samples [c0, c1, .., c0, c1, ..]
    pub fn new(samples: Vec<Sample>, channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(DropError::InvalidBuffer("channel count must be at least 1".into()));
        }
        if sample_rate == 0 {
            return Err(DropError::InvalidBuffer("sample rate must be positive".into()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(DropError::InvalidBuffer(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Create a single-channel buffer
    pub fn from_mono(samples: Vec<Sample>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, 1, sample_rate)
    }

    /// Create a buffer filled with silence
    pub(crate) fn silence(frames: usize, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; frames * channels as usize],
            channels,
            sample_rate,
        }
    }

    /// Interleaved sample data
    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Mutable interleaved sample data (rendering only)
    #[inline]
    pub(crate) fn samples_mut(&mut self) -> &mut [Sample] {
        &mut self.samples
    }

    /// Consume the buffer and return the interleaved samples
    pub fn into_samples(self) -> Vec<Sample> {
        self.samples
    }

    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of sample frames (one sample per channel)
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Frame index nearest to a time in seconds, clamped to [0, frames]
    pub fn frame_at(&self, seconds: f64) -> usize {
        let frame = (seconds.max(0.0) * self.sample_rate as f64).round() as usize;
        frame.min(self.frames())
    }

    /// Average all channels into a mono signal
    pub fn to_mono(&self) -> Vec<Sample> {
        if self.channels == 1 {
            return self.samples.clone();
        }
        let scale = 1.0 / self.channels as Sample;
        self.samples
            .chunks_exact(self.channels as usize)
            .map(|frame| frame.iter().sum::<Sample>() * scale)
            .collect()
    }

    /// Copy the frames in `[start, end)` into a new buffer
    ///
    /// Both bounds are clamped to the buffer length.
    pub fn slice_frames(&self, start: usize, end: usize) -> SampleBuffer {
        let frames = self.frames();
        let end = end.min(frames);
        let start = start.min(end);
        let ch = self.channels as usize;
        Self {
            samples: self.samples[start * ch..end * ch].to_vec(),
            channels: self.channels,
            sample_rate: self.sample_rate,
        }
    }

    /// Get the peak absolute amplitude in the buffer
    pub fn peak(&self) -> Sample {
        self.samples.iter().map(|s| s.abs()).fold(0.0, Sample::max)
    }

    /// Scale all samples by a factor
    pub(crate) fn scale(&mut self, factor: Sample) {
        for sample in &mut self.samples {
            *sample *= factor;
        }
    }
}

impl Index<usize> for SampleBuffer {
    type Output = Sample;

    #[inline]
    fn index(&self, index: usize) -> &Self::Output {
        &self.samples[index]
    }
}
