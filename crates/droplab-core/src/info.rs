//! Uploaded track metadata

use std::fmt;

use crate::types::SampleBuffer;

/// Name, type and size of an uploaded file plus its decoded format
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub name: String,
    pub mime: String,
    pub size_bytes: u64,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
}

impl TrackInfo {
    pub fn from_decoded(
        name: impl Into<String>,
        mime: impl Into<String>,
        size_bytes: u64,
        buffer: &SampleBuffer,
    ) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            size_bytes,
            duration_seconds: buffer.duration_seconds(),
            sample_rate: buffer.sample_rate(),
            channels: buffer.channels(),
            frames: buffer.frames(),
        }
    }

    /// Size in megabytes (1 MB = 1024 * 1024 bytes)
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}

impl fmt::Display for TrackInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = (self.duration_seconds / 60.0).floor() as u64;
        let seconds = self.duration_seconds - minutes as f64 * 60.0;
        writeln!(f, "Name:     {}", self.name)?;
        writeln!(f, "Type:     {}", self.mime)?;
        writeln!(f, "Size:     {:.2} MB", self.size_mb())?;
        writeln!(f, "Duration: {}:{:05.2}", minutes, seconds)?;
        write!(
            f,
            "Format:   {} Hz, {} ch, {} frames",
            self.sample_rate, self.channels, self.frames
        )
    }
}
