//! Drop generation pipeline
//!
//! One request walks through a fixed sequence of stages:
//!
//! ```text
//! Idle -> Decoding -> TempoEstimation -> Segmenting -> PatternLookup
//!      -> Synthesizing -> Done
//! ```
//!
//! Any failure ends the run with a [`PipelineError`] naming the stage. A
//! [`CancelToken`] is checked before every stage; nothing partial is ever
//! returned.
//!
//! # Usage
//!
//! ```ignore
//! let pipeline = DropPipeline::new(DropConfig::default());
//! let input = AudioInput::new("track.wav", "audio/wav", bytes);
//! let request = DropRequest::new("Afro House", "Shuffle");
//! let result = pipeline.run(input, &request, &CancelToken::new())?;
//! ```

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use rayon::prelude::*;
use thiserror::Error;

use crate::analysis::{estimate_tempo, BeatGrid};
use crate::config::DropConfig;
use crate::decoder::{decode, mime_for_extension};
use crate::error::DropError;
use crate::info::TrackInfo;
use crate::segment::{segment, whole_track, Segment};
use crate::synth::{render_drop, select_segment, DropRequest, DropResult};

/// Position of a request in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Idle,
    Decoding,
    TempoEstimation,
    Segmenting,
    PatternLookup,
    Synthesizing,
    Done,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Decoding => "decoding",
            Stage::TempoEstimation => "tempo estimation",
            Stage::Segmenting => "segmenting",
            Stage::PatternLookup => "pattern lookup",
            Stage::Synthesizing => "synthesizing",
            Stage::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed request: the stage it stopped in and why
#[derive(Error, Debug)]
#[error("{stage} failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    pub source: DropError,
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.source, DropError::Cancelled)
    }
}

/// Shared cancellation flag, checked between stages
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// An uploaded file: name, declared MIME type and raw bytes
#[derive(Debug, Clone)]
pub struct AudioInput {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl AudioInput {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file, deriving the MIME type from its extension
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let mime = mime_for_extension(ext)
            .with_context(|| format!("Unsupported file extension: {:?}", path))?;
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read audio file: {:?}", path))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(name, mime, bytes))
    }
}

/// Everything the pipeline learned about a track on the way to a drop
#[derive(Debug, Clone)]
pub struct DropReport {
    pub info: TrackInfo,
    pub grid: BeatGrid,
    pub segments: Vec<Segment>,
    /// True when segmentation failed and the whole track was used
    pub whole_track_fallback: bool,
    pub result: DropResult,
}

/// Tracks the current stage of one run and logs every transition
struct Run<'a> {
    name: &'a str,
    stage: Stage,
    cancel: &'a CancelToken,
    started: Instant,
}

impl<'a> Run<'a> {
    fn new(name: &'a str, cancel: &'a CancelToken) -> Self {
        log::debug!("pipeline[{}]: {}", name, Stage::Idle);
        Self {
            name,
            stage: Stage::Idle,
            cancel,
            started: Instant::now(),
        }
    }

    /// Move to the next stage unless the request was cancelled
    fn enter(&mut self, next: Stage) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            log::info!("pipeline[{}]: cancelled before {}", self.name, next);
            return Err(PipelineError {
                stage: next,
                source: DropError::Cancelled,
            });
        }
        log::info!("pipeline[{}]: {} -> {}", self.name, self.stage, next);
        self.stage = next;
        Ok(())
    }

    /// Attach the current stage to a failure
    fn fail(&self, source: DropError) -> PipelineError {
        log::warn!("pipeline[{}]: failed in {}: {}", self.name, self.stage, source);
        PipelineError {
            stage: self.stage,
            source,
        }
    }

    fn finish(&mut self) {
        self.stage = Stage::Done;
        log::info!(
            "pipeline[{}]: done in {:.2}s",
            self.name,
            self.started.elapsed().as_secs_f64()
        );
    }
}

/// Runs drop requests against a fixed configuration
#[derive(Debug, Clone, Default)]
pub struct DropPipeline {
    config: DropConfig,
}

impl DropPipeline {
    pub fn new(mut config: DropConfig) -> Self {
        config.validate();
        Self { config }
    }

    pub fn config(&self) -> &DropConfig {
        &self.config
    }

    /// Generate a drop from an uploaded file
    pub fn run(
        &self,
        input: AudioInput,
        request: &DropRequest,
        cancel: &CancelToken,
    ) -> Result<DropResult, PipelineError> {
        self.run_with_report(input, request, cancel)
            .map(|report| report.result)
    }

    /// Generate a drop and keep the intermediate analysis
    pub fn run_with_report(
        &self,
        input: AudioInput,
        request: &DropRequest,
        cancel: &CancelToken,
    ) -> Result<DropReport, PipelineError> {
        let AudioInput { name, mime, bytes } = input;
        let mut run = Run::new(&name, cancel);

        run.enter(Stage::Decoding)?;
        let size_bytes = bytes.len() as u64;
        let buffer = decode(bytes, &mime).map_err(|e| run.fail(e.into()))?;
        let info = TrackInfo::from_decoded(name.as_str(), mime.as_str(), size_bytes, &buffer);

        run.enter(Stage::TempoEstimation)?;
        let grid = estimate_tempo(&buffer, &self.config.tempo).map_err(|e| run.fail(e))?;

        run.enter(Stage::Segmenting)?;
        let (segments, whole_track_fallback) = match segment(&buffer, &grid, &self.config.segment) {
            Ok(segments) => (segments, false),
            Err(DropError::Segmentation(reason)) if self.config.pipeline.fallback_to_whole_track => {
                log::warn!(
                    "pipeline[{}]: {}, using the whole track as one segment",
                    name,
                    reason
                );
                (vec![whole_track(&buffer)], true)
            }
            Err(e) => return Err(run.fail(e)),
        };

        run.enter(Stage::PatternLookup)?;
        let pattern = request.pattern().map_err(|e| run.fail(e))?;

        run.enter(Stage::Synthesizing)?;
        let index = select_segment(&segments, request.selection).map_err(|e| run.fail(e))?;
        let result = render_drop(
            &buffer,
            &grid,
            &segments[index],
            index,
            pattern,
            &self.config.synthesis,
        )
        .map_err(|e| run.fail(e))?;

        run.finish();
        Ok(DropReport {
            info,
            grid,
            segments,
            whole_track_fallback,
            result,
        })
    }

    /// Process independent requests in parallel
    ///
    /// Results come back in input order. One request failing does not
    /// affect the others; cancelling stops every request at its next stage
    /// boundary.
    pub fn run_batch(
        &self,
        jobs: Vec<(AudioInput, DropRequest)>,
        cancel: &CancelToken,
    ) -> Vec<Result<DropResult, PipelineError>> {
        let start_time = Instant::now();
        let total = jobs.len();
        let num_workers = self.config.pipeline.parallel_requests.clamp(1, 16) as usize;
        log::info!(
            "run_batch: {} requests on {} workers",
            total,
            num_workers
        );

        let process = |jobs: Vec<(AudioInput, DropRequest)>| -> Vec<Result<DropResult, PipelineError>> {
            jobs.into_par_iter()
                .map(|(input, request)| self.run(input, &request, cancel))
                .collect()
        };

        let results = match rayon::ThreadPoolBuilder::new()
            .num_threads(num_workers)
            .thread_name(|i| format!("droplab-{}", i))
            .build()
        {
            Ok(pool) => pool.install(|| process(jobs)),
            Err(e) => {
                log::warn!("run_batch: Failed to create thread pool ({}), using global pool", e);
                process(jobs)
            }
        };

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        log::info!(
            "run_batch: Complete in {:.1}s - {} succeeded, {} failed",
            start_time.elapsed().as_secs_f64(),
            succeeded,
            total - succeeded
        );
        results
    }
}
