use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::pipeline::{PipelineContext, TargetOutcome};
use crate::collector::StatusSource;
use crate::config::Settings;
use crate::render::{render_index, OutputWriter};
use crate::report::ReportParser;
use crate::targets::{load_targets, LicenseTarget};

/// Error page text when a pipeline task dies unexpectedly
const INTERNAL_FAILURE_MESSAGE: &str = "Internal error while processing license report.";

/// Counts for one completed cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Targets loaded for the cycle
    pub targets: usize,
    /// Pages rendered from parsed data
    pub rendered: usize,
    /// Targets whose status command failed
    pub collect_failures: usize,
    /// Targets whose report could not be parsed
    pub parse_failures: usize,
    /// Targets whose page could not be written (or whose task panicked)
    pub write_failures: usize,
    /// Whether the index page was written
    pub index_written: bool,
}

impl CycleSummary {
    fn record(&mut self, outcome: &TargetOutcome) {
        match outcome {
            TargetOutcome::Rendered { .. } => self.rendered += 1,
            TargetOutcome::CollectFailed(_) => self.collect_failures += 1,
            TargetOutcome::ParseFailed(_) => self.parse_failures += 1,
        }
    }

    /// Targets that did not end with a usage table
    pub fn failed(&self) -> usize {
        self.collect_failures + self.parse_failures + self.write_failures
    }
}

/// Drives collect -> parse -> render for every target, once per cycle
pub struct Scheduler<S> {
    context: Arc<PipelineContext<S>>,
    targets_file: PathBuf,
    interval: Duration,
    max_concurrent: usize,
    cancel: CancellationToken,
}

impl<S: StatusSource + 'static> Scheduler<S> {
    /// Create a scheduler from settings
    pub fn new(source: S, settings: &Settings, cancel: CancellationToken) -> Self {
        let context = PipelineContext {
            source,
            parser: ReportParser::new(&settings.parser),
            writer: OutputWriter::new(settings.output_dir.clone(), settings.pages_dir.clone()),
            render: settings.render.clone(),
        };

        Self {
            context: Arc::new(context),
            targets_file: settings.targets_file.clone(),
            interval: Duration::from_millis(settings.cycle_interval_ms),
            max_concurrent: settings.collector.max_concurrent,
            cancel,
        }
    }

    /// Token that stops the loop between cycles
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run cycles until cancelled. A cycle in progress always completes.
    pub async fn run(&self) {
        info!(
            "Scheduler started (targets_file={:?}, interval={}ms)",
            self.targets_file,
            self.interval.as_millis()
        );

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            if let Err(e) = self.run_cycle().await {
                error!("Cycle skipped: {:#}", e);
            }

            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Scheduler stopped");
    }

    /// Run a single cycle: reload targets, rewrite the index, then process
    /// every target concurrently and wait for all of them.
    ///
    /// Fails only when the targets file can't be read.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let started = Instant::now();
        let targets = load_targets(&self.targets_file)?;
        let mut summary = CycleSummary {
            targets: targets.len(),
            ..CycleSummary::default()
        };

        debug!("Cycle started with {} targets", targets.len());
        summary.index_written = self.write_index(&targets).await;

        let limit = if self.max_concurrent == 0 {
            targets.len().max(1)
        } else {
            self.max_concurrent
        };
        let semaphore = Arc::new(Semaphore::new(limit));

        let mut tasks = JoinSet::new();
        let mut task_targets = HashMap::new();

        for target in targets {
            let context = Arc::clone(&self.context);
            let semaphore = Arc::clone(&semaphore);
            let task_target = target.clone();

            let handle = tasks.spawn(async move {
                // Semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                context.process_target(&task_target).await
            });
            task_targets.insert(handle.id(), target);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((_, Ok(outcome))) => summary.record(&outcome),
                Ok((id, Err(e))) => {
                    summary.write_failures += 1;
                    let name = task_targets.get(&id).map(|t| t.name.as_str()).unwrap_or("?");
                    error!(target = %name, "Failed to write page: {:#}", e);
                }
                Err(join_err) => {
                    summary.write_failures += 1;
                    match task_targets.get(&join_err.id()) {
                        Some(target) => {
                            error!(target = %target.name, "Pipeline task failed: {}", join_err);
                            if let Err(e) = self
                                .context
                                .write_error(target, INTERNAL_FAILURE_MESSAGE)
                                .await
                            {
                                error!(target = %target.name, "Failed to write error page: {:#}", e);
                            }
                        }
                        None => error!("Pipeline task failed: {}", join_err),
                    }
                }
            }
        }

        info!(
            targets = summary.targets,
            rendered = summary.rendered,
            failed = summary.failed(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Cycle complete"
        );

        Ok(summary)
    }

    async fn write_index(&self, targets: &[LicenseTarget]) -> bool {
        let render = &self.context.render;
        let writer = &self.context.writer;
        let html = render_index(targets, writer.pages_dir(), render, &render.timestamp_now());

        match writer.write_index(&html).await {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to write index page: {:#}", e);
                false
            }
        }
    }
}
