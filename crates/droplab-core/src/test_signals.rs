//! Synthetic signals shared by unit tests

use std::f32::consts::PI;
use std::io::Cursor;

/// Decaying 1 kHz clicks at a fixed tempo, starting at t = 0
pub fn click_track(bpm: f64, sample_rate: u32, seconds: f64) -> Vec<f32> {
    let mut samples = vec![0.0f32; (sample_rate as f64 * seconds) as usize];
    add_clicks(&mut samples, bpm, sample_rate, 0.8);
    samples
}

/// Mix 5ms clicks into an existing signal
pub fn add_clicks(samples: &mut [f32], bpm: f64, sample_rate: u32, amplitude: f32) {
    let samples_per_beat = 60.0 / bpm * sample_rate as f64;
    let click_len = (sample_rate as f64 * 0.005) as usize;

    let mut position = 0.0f64;
    while (position as usize) < samples.len() {
        let start = position as usize;
        for j in 0..click_len {
            if let Some(s) = samples.get_mut(start + j) {
                let t = j as f32 / sample_rate as f32;
                *s += amplitude * (2.0 * PI * 1000.0 * t).sin() * (-t * 500.0).exp();
            }
        }
        position += samples_per_beat;
    }
}

/// 30 seconds of 120 BPM clicks over a pad that jumps in level at 10s and 20s
pub fn stepped_track(sample_rate: u32) -> Vec<f32> {
    let total = sample_rate as usize * 30;
    let levels = [0.04f32, 0.16, 0.36];
    let mut samples: Vec<f32> = (0..total)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let level = levels[((t / 10.0) as usize).min(2)];
            let pad = (2.0 * PI * 220.0 * t).sin()
                + 0.5 * (2.0 * PI * 660.0 * t).sin()
                + 0.25 * (2.0 * PI * 1760.0 * t).sin();
            level * pad
        })
        .collect();
    add_clicks(&mut samples, 120.0, sample_rate, 0.35);
    samples
}

/// Constant-level sine
pub fn tone(freq: f32, sample_rate: u32, seconds: f64, amplitude: f32) -> Vec<f32> {
    (0..(sample_rate as f64 * seconds) as usize)
        .map(|i| amplitude * (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
        .collect()
}

/// Encode interleaved samples as a 16-bit WAV in memory
pub fn wav_bytes(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut bytes = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
        for &s in samples {
            writer
                .write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                .unwrap();
        }
        writer.finalize().unwrap();
    }
    bytes
}
