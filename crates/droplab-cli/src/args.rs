//! Command-line argument parsing

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use droplab_core::pattern::{Groove, Style};
use droplab_core::synth::{DropRequest, SelectionPolicy};

/// Parsed command line
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub input: PathBuf,
    pub style: String,
    pub groove: String,
    pub segment: Option<usize>,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    /// Print track info and analysis without rendering
    pub info_only: bool,
}

impl Args {
    /// Parse arguments (without the program name)
    ///
    /// Returns `Ok(None)` when help was requested.
    pub fn parse(args: &[String]) -> Result<Option<Self>> {
        let mut input: Option<PathBuf> = None;
        let mut style = Style::House.display_name().to_string();
        let mut groove = Groove::Standard.display_name().to_string();
        let mut segment = None;
        let mut output = None;
        let mut config = None;
        let mut info_only = false;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--help" | "-h" => return Ok(None),
                "--style" | "-s" => {
                    i += 1;
                    style = value(args, i, "style")?.to_string();
                }
                "--groove" | "-g" => {
                    i += 1;
                    groove = value(args, i, "groove")?.to_string();
                }
                "--segment" => {
                    i += 1;
                    let raw = value(args, i, "segment")?;
                    segment = Some(
                        raw.parse::<usize>()
                            .with_context(|| format!("Invalid segment index: {}", raw))?,
                    );
                }
                "--out" | "-o" => {
                    i += 1;
                    output = Some(PathBuf::from(value(args, i, "out")?));
                }
                "--config" | "-c" => {
                    i += 1;
                    config = Some(PathBuf::from(value(args, i, "config")?));
                }
                "--info" => info_only = true,
                flag if flag.starts_with('-') => bail!("Unknown option: {}", flag),
                positional => {
                    if input.is_some() {
                        bail!("Unexpected argument: {}", positional);
                    }
                    input = Some(PathBuf::from(positional));
                }
            }
            i += 1;
        }

        let input = input.context("Missing input file")?;
        Ok(Some(Self {
            input,
            style,
            groove,
            segment,
            output,
            config,
            info_only,
        }))
    }

    pub fn request(&self) -> DropRequest {
        let selection = self
            .segment
            .map(SelectionPolicy::Index)
            .unwrap_or(SelectionPolicy::Auto);
        DropRequest::new(self.style.as_str(), self.groove.as_str()).with_selection(selection)
    }

    /// Output path, defaulting to `<input stem>_drop.wav` next to the input
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let stem = self
                .input
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "track".to_string());
            self.input.with_file_name(format!("{}_drop.wav", stem))
        })
    }
}

fn value<'a>(args: &'a [String], i: usize, name: &str) -> Result<&'a str> {
    args.get(i)
        .map(String::as_str)
        .with_context(|| format!("Missing value for --{}", name))
}

pub fn usage() -> String {
    let styles: Vec<&str> = Style::ALL.iter().map(|s| s.display_name()).collect();
    let grooves: Vec<&str> = Groove::ALL.iter().map(|g| g.display_name()).collect();
    format!(
        "Usage: droplab <input.wav|input.mp3> [options]\n\
         \n\
         Options:\n\
         \x20 -s, --style <STYLE>    {}\n\
         \x20 -g, --groove <GROOVE>  {}\n\
         \x20     --segment <N>      Render over segment N instead of picking one\n\
         \x20 -o, --out <FILE>       Output WAV (default: <input>_drop.wav)\n\
         \x20 -c, --config <FILE>    Configuration YAML\n\
         \x20     --info             Print track info and sections only\n\
         \x20 -h, --help             Show this help",
        styles.join(" | "),
        grooves.join(" | ")
    )
}
