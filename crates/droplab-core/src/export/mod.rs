//! WAV export of rendered drops
//!
//! Output is always 32-bit float WAV at the source sample rate and channel
//! count, so no dithering or clipping decisions happen here.

use std::io::{Cursor, Seek, Write};
use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::types::SampleBuffer;

fn wav_spec(buffer: &SampleBuffer) -> WavSpec {
    WavSpec {
        channels: buffer.channels(),
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    }
}

fn write_samples<W: Write + Seek>(mut writer: WavWriter<W>, buffer: &SampleBuffer) -> Result<()> {
    for &sample in buffer.samples() {
        writer
            .write_sample(sample)
            .context("Failed to write WAV sample")?;
    }
    writer.finalize().context("Failed to finalize WAV")?;
    Ok(())
}

/// Encode a buffer as an in-memory WAV file
pub fn encode_wav(buffer: &SampleBuffer) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let writer = WavWriter::new(Cursor::new(&mut bytes), wav_spec(buffer))
        .context("Failed to create WAV writer")?;
    write_samples(writer, buffer)?;

    log::debug!(
        "encode_wav: {} frames -> {} bytes",
        buffer.frames(),
        bytes.len()
    );
    Ok(bytes)
}

/// Write a buffer to a WAV file, creating parent directories as needed
pub fn write_wav(buffer: &SampleBuffer, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
    }

    let writer = WavWriter::create(path, wav_spec(buffer))
        .with_context(|| format!("Failed to create WAV file: {:?}", path))?;
    write_samples(writer, buffer)?;

    log::info!(
        "write_wav: {:.2}s ({} ch, {} Hz) to {:?}",
        buffer.duration_seconds(),
        buffer.channels(),
        buffer.sample_rate(),
        path
    );
    Ok(())
}
