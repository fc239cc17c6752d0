//! Batch orchestration over the work list.
//!
//! Each item moves through `synthesis -> normalize -> effects -> write`, unless
//! its destination already exists. A failure in any stage is captured as an
//! [`ItemFailure`] and the batch carries on with the next item.

use std::fmt;
use std::path::PathBuf;

use crate::audio::{normalize, pad_silence};
use crate::config::PipelineConfig;
use crate::corpus::SpeakableItem;
use crate::error::{AudioError, EffectError, OutputError, PipelineError};
use crate::output::{write_asset, Transcoder};
use crate::synthesis::speak;
use crate::SynthesisEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Synthesis,
    Normalize,
    Effects,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Synthesis => write!(f, "synthesis"),
            Stage::Normalize => write!(f, "normalize"),
            Stage::Effects => write!(f, "effects"),
            Stage::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    pub text: String,
    pub destination: PathBuf,
    pub stage: Stage,
    pub reason: String,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} failed during {}: {}", self.text, self.stage, self.reason)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The destination already existed; no work was done.
    Skipped,
    Done,
    Failed(ItemFailure),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub skipped: usize,
    pub done: usize,
    pub failed: Vec<ItemFailure>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.skipped + self.done + self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Skipped => self.skipped += 1,
            ItemOutcome::Done => self.done += 1,
            ItemOutcome::Failed(failure) => self.failed.push(failure),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} items: {} generated, {} skipped, {} failed",
            self.total(),
            self.done,
            self.skipped,
            self.failed.len()
        )?;
        for failure in &self.failed {
            write!(f, "\n  - {failure}")?;
        }
        Ok(())
    }
}

/// Why a single item did not make it to disk.
#[derive(thiserror::Error, Debug)]
pub enum ItemError {
    #[error("{0}")]
    Synthesis(#[source] Box<dyn std::error::Error>),
    #[error(transparent)]
    Normalize(#[from] AudioError),
    #[error(transparent)]
    Effects(#[from] EffectError),
    #[error(transparent)]
    Write(#[from] OutputError),
}

impl ItemError {
    pub fn stage(&self) -> Stage {
        match self {
            ItemError::Synthesis(_) => Stage::Synthesis,
            ItemError::Normalize(_) => Stage::Normalize,
            ItemError::Effects(_) => Stage::Effects,
            ItemError::Write(_) => Stage::Write,
        }
    }
}

/// Runs items one after another against a borrowed, already-loaded engine.
pub struct Pipeline<'a, E: ?Sized, T: ?Sized> {
    engine: &'a mut E,
    transcoder: &'a T,
    config: &'a PipelineConfig,
}

impl<'a, E, T> Pipeline<'a, E, T>
where
    E: SynthesisEngine + ?Sized,
    T: Transcoder + ?Sized,
{
    pub fn new(engine: &'a mut E, transcoder: &'a T, config: &'a PipelineConfig) -> Self {
        Self {
            engine,
            transcoder,
            config,
        }
    }

    /// Process every item in order.
    ///
    /// Only a failure to create the output directory is fatal; item failures
    /// end up in the summary. With `dry_run` set this is [`Pipeline::plan`].
    pub fn run(&mut self, items: &[SpeakableItem]) -> Result<RunSummary, PipelineError> {
        if self.config.dry_run {
            return Ok(self.plan(items));
        }

        std::fs::create_dir_all(&self.config.output_dir).map_err(|source| {
            PipelineError::OutputDir {
                path: self.config.output_dir.clone(),
                source,
            }
        })?;

        log::info!(
            "Processing {} items with voice {} and preset {} v{}",
            items.len(),
            self.config.voice.voice,
            self.config.preset.name,
            self.config.preset.version
        );

        let mut summary = RunSummary::default();
        for item in items {
            let outcome = self.process(item);
            if let ItemOutcome::Failed(failure) = &outcome {
                log::error!("Error: {failure}");
            }
            summary.record(outcome);
        }
        log::info!("Done. {summary}");
        Ok(summary)
    }

    /// Take one item through the full chain, or skip it if its file exists.
    pub fn process(&mut self, item: &SpeakableItem) -> ItemOutcome {
        if item.destination.exists() {
            log::info!("Skipping (exists): {}", item.file_name());
            return ItemOutcome::Skipped;
        }
        log::info!("Generating {}: {}", item.category, item.text);

        match self.render(item) {
            Ok(()) => ItemOutcome::Done,
            Err(e) => ItemOutcome::Failed(ItemFailure {
                text: item.text.clone(),
                destination: item.destination.clone(),
                stage: e.stage(),
                reason: e.to_string(),
            }),
        }
    }

    fn render(&mut self, item: &SpeakableItem) -> Result<(), ItemError> {
        let raw = speak(&mut *self.engine, &item.text, &self.config.voice)
            .map_err(ItemError::Synthesis)?;

        let buffer = normalize(raw.samples, raw.sample_rate)?;
        let mut buffer = pad_silence(buffer, self.config.silence_secs)?;
        self.config.preset.apply(&mut buffer)?;
        write_asset(&buffer, &item.destination, self.transcoder)?;
        Ok(())
    }

    /// Report what a run would do without touching the engine.
    pub fn plan(&self, items: &[SpeakableItem]) -> RunSummary {
        let mut summary = RunSummary::default();
        for item in items {
            let exists = item.destination.exists();
            log::info!(
                "{} {} {:?} -> {}",
                if exists { "skip" } else { "make" },
                item.category,
                item.text,
                item.destination.display()
            );
            summary.record(if exists {
                ItemOutcome::Skipped
            } else {
                ItemOutcome::Done
            });
        }
        summary
    }
}
