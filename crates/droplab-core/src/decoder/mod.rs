//! Decoder adapter
//!
//! Turns an in-memory WAV or MP3 upload into a [`SampleBuffer`] using
//! Symphonia. Nothing here reimplements a codec; this is the boundary where
//! container bytes become samples.

mod error;

pub use error::DecodeError;

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer as DecodedFrames;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::types::{Sample, SampleBuffer};

/// Containers accepted by the upload form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Wav,
    Mp3,
}

impl Container {
    /// Resolve a declared MIME type (case-insensitive, parameters ignored)
    pub fn from_mime(mime: &str) -> Result<Self, DecodeError> {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Ok(Container::Wav),
            "audio/mpeg" | "audio/mp3" | "audio/mpeg3" | "audio/x-mpeg-3" => Ok(Container::Mp3),
            _ => Err(DecodeError::UnsupportedMime(mime.to_string())),
        }
    }

    /// File extension used as a probe hint
    pub fn extension(&self) -> &'static str {
        match self {
            Container::Wav => "wav",
            Container::Mp3 => "mp3",
        }
    }

    /// Canonical MIME type
    pub fn mime(&self) -> &'static str {
        match self {
            Container::Wav => "audio/wav",
            Container::Mp3 => "audio/mpeg",
        }
    }
}

/// Map a file extension to the MIME type the decoder expects
pub fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "wav" | "wave" => Some(Container::Wav.mime()),
        "mp3" => Some(Container::Mp3.mime()),
        _ => None,
    }
}

/// Decode WAV or MP3 bytes to interleaved f32 samples
///
/// Corrupt packets are skipped with a warning; a stream that yields no
/// samples at all is an error.
pub fn decode(bytes: Vec<u8>, mime: &str) -> Result<SampleBuffer, DecodeError> {
    let container = Container::from_mime(mime)?;
    log::info!(
        "decode: {} bytes declared as {} ({:?})",
        bytes.len(),
        mime,
        container
    );

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    hint.mime_type(container.mime());
    hint.with_extension(container.extension());

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DecodeError::Probe(e.to_string()))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DecodeError::Codec(e.to_string()))?;

    let mut samples: Vec<Sample> = Vec::new();
    let mut frames_buf: Option<DecodedFrames<Sample>> = None;
    let mut frames_capacity = 0usize;
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                log::warn!("decode: Error reading packet: {}", e);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                skipped += 1;
                log::warn!("decode: Skipping corrupted packet: {}", msg);
                continue;
            }
            Err(e) => {
                log::warn!("decode: Error decoding packet: {}", e);
                break;
            }
        };

        let spec = *decoded.spec();
        channels = spec.channels.count() as u16;

        // Packets can grow (MP3 frame sizes vary with layer/rate)
        if frames_buf.is_none() || decoded.capacity() > frames_capacity {
            frames_capacity = decoded.capacity();
            frames_buf = Some(DecodedFrames::new(frames_capacity as u64, spec));
        }

        if let Some(ref mut buf) = frames_buf {
            buf.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buf.samples());
        }
    }

    if samples.is_empty() || channels == 0 {
        return Err(DecodeError::Empty);
    }

    let buffer = SampleBuffer::new(samples, channels, sample_rate)
        .map_err(|e| DecodeError::Probe(e.to_string()))?;

    log::info!(
        "decode: {} frames, {} ch, {} Hz ({:.2}s), {} packets skipped",
        buffer.frames(),
        buffer.channels(),
        buffer.sample_rate(),
        buffer.duration_seconds(),
        skipped
    );

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_signals::wav_bytes;

    #[test]
    fn test_container_from_mime() {
        assert_eq!(Container::from_mime("audio/wav").unwrap(), Container::Wav);
        assert_eq!(Container::from_mime("Audio/X-WAV").unwrap(), Container::Wav);
        assert_eq!(Container::from_mime("audio/mpeg; charset=binary").unwrap(), Container::Mp3);
        assert!(matches!(
            Container::from_mime("audio/flac"),
            Err(DecodeError::UnsupportedMime(_))
        ));
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for_extension("WAV"), Some("audio/wav"));
        assert_eq!(mime_for_extension("mp3"), Some("audio/mpeg"));
        assert_eq!(mime_for_extension("ogg"), None);
    }

    #[test]
    fn test_decode_wav_roundtrip() {
        let input: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin() * 0.5)
            .collect();
        let bytes = wav_bytes(&input, 44100, 1);

        let buffer = decode(bytes, "audio/wav").unwrap();
        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.channels(), 1);
        assert_eq!(buffer.frames(), 4410);
        assert!((buffer.peak() - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_decode_stereo_wav() {
        let input: Vec<f32> = (0..2000).map(|i| if i % 2 == 0 { 0.25 } else { -0.25 }).collect();
        let bytes = wav_bytes(&input, 48000, 2);

        let buffer = decode(bytes, "audio/x-wav").unwrap();
        assert_eq!(buffer.channels(), 2);
        assert_eq!(buffer.frames(), 1000);
        assert_eq!(buffer.sample_rate(), 48000);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let garbage = vec![0x13u8; 512];
        assert!(decode(garbage, "audio/wav").is_err());
    }

    #[test]
    fn test_decode_rejects_unsupported_mime() {
        let bytes = wav_bytes(&[0.0; 100], 44100, 1);
        assert!(matches!(
            decode(bytes, "video/mp4"),
            Err(DecodeError::UnsupportedMime(_))
        ));
    }

    #[test]
    fn test_decode_empty_input() {
        assert!(decode(Vec::new(), "audio/mpeg").is_err());
    }
}
