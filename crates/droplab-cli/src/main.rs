//! DropLab command-line front end
//!
//! Reads a WAV or MP3 file, prints its details and sections, renders a drop
//! and writes it next to the input (or to `--out`).

mod args;

use anyhow::{Context, Result};
use droplab_core::config::{default_config_path, read_config, DropConfig};
use droplab_core::export::write_wav;
use droplab_core::pipeline::{AudioInput, CancelToken, DropPipeline};
use droplab_core::{decode, estimate_tempo, segment, TrackInfo};

use args::{usage, Args};

fn main() {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    let args = match Args::parse(&raw) {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{}", usage());
            return;
        }
        Err(e) => {
            eprintln!("Error: {:#}\n\n{}", e, usage());
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<DropConfig> {
    let mut config = match &args.config {
        // An explicit file must parse; the default location may be absent
        Some(path) => read_config(path)?,
        None => DropConfig::load(&default_config_path()),
    };
    config.validate();
    Ok(config)
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let input = AudioInput::from_path(&args.input)?;
    log::info!("droplab: {} ({} bytes)", input.name, input.bytes.len());

    if args.info_only {
        return print_analysis(input, &config);
    }

    let pipeline = DropPipeline::new(config);
    let report = pipeline
        .run_with_report(input, &args.request(), &CancelToken::new())
        .context("Drop generation failed")?;

    println!("{}\n", report.info);
    println!(
        "Tempo:    {:.1} BPM ({} beats)",
        report.grid.bpm(),
        report.grid.len()
    );
    if report.whole_track_fallback {
        println!("Sections: none found, using the whole track");
    } else {
        println!("Sections:");
        for (i, seg) in report.segments.iter().enumerate() {
            println!("  [{}] {}", i, seg);
        }
    }
    println!("\nDrop:     {}", report.result);

    let output = args.output_path();
    write_wav(&report.result.audio, &output)?;
    println!(
        "Wrote {:.2}s to {}",
        report.result.duration_seconds(),
        output.display()
    );
    Ok(())
}

/// Decode and analyse without rendering
fn print_analysis(input: AudioInput, config: &DropConfig) -> Result<()> {
    let size = input.bytes.len() as u64;
    let buffer = decode(input.bytes, &input.mime)?;
    println!(
        "{}",
        TrackInfo::from_decoded(input.name, input.mime, size, &buffer)
    );

    let grid = estimate_tempo(&buffer, &config.tempo)?;
    println!("Tempo:    {:.1} BPM ({} beats)", grid.bpm(), grid.len());

    match segment(&buffer, &grid, &config.segment) {
        Ok(segments) => {
            println!("Sections:");
            for (i, seg) in segments.iter().enumerate() {
                println!("  [{}] {}", i, seg);
            }
        }
        Err(e) => println!("Sections: {}", e),
    }
    Ok(())
}
