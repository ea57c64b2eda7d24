//! Collect -> parse -> render -> write for a single target.

use anyhow::Result;
use tracing::{debug, warn};

use crate::collector::StatusSource;
use crate::render::{render_license_page, OutputWriter, PageContent, RenderSettings};
use crate::report::ReportParser;
use crate::targets::LicenseTarget;

/// Error page text when the status command fails
pub const COLLECT_FAILURE_MESSAGE: &str = "Unable to retrieve license information.";

/// How a target's pipeline ended (its page was written in every case)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetOutcome {
    /// Usage table rendered
    Rendered { blocks: usize, checkouts: usize },
    /// Status command failed; error page rendered
    CollectFailed(String),
    /// Report header could not be parsed; error page rendered
    ParseFailed(String),
}

/// Shared, read-only context for the pipelines of one cycle
pub struct PipelineContext<S> {
    pub source: S,
    pub parser: ReportParser,
    pub writer: OutputWriter,
    pub render: RenderSettings,
}

impl<S: StatusSource> PipelineContext<S> {
    /// Run the pipeline for one target.
    ///
    /// Collection and parse failures become an error page and an `Ok`
    /// outcome. Only a failure to write the page is returned as `Err`.
    pub async fn process_target(&self, target: &LicenseTarget) -> Result<TargetOutcome> {
        let outcome = match self.source.fetch(target).await {
            Err(e) => {
                warn!(target = %target.name, server = %target.license_path(), "Collection failed: {}", e);
                self.write_error(target, COLLECT_FAILURE_MESSAGE).await?;
                TargetOutcome::CollectFailed(e.to_string())
            }
            Ok(raw) => match self.parser.parse(&raw) {
                Err(e) => {
                    warn!(target = %target.name, "Report parse failed: {}", e);
                    let message = format!("Unable to parse license report: {}", e);
                    self.write_error(target, &message).await?;
                    TargetOutcome::ParseFailed(e.to_string())
                }
                Ok(blocks) => {
                    let html = render_license_page(
                        &target.name,
                        PageContent::Report(&blocks),
                        &self.render,
                        &self.render.timestamp_now(),
                    );
                    self.writer.write_page(&target.name, &html).await?;
                    TargetOutcome::Rendered {
                        blocks: blocks.len(),
                        checkouts: blocks.iter().map(|b| b.users.len()).sum(),
                    }
                }
            },
        };

        debug!(target = %target.name, ?outcome, "Target processed");
        Ok(outcome)
    }

    /// Write an error page for a target
    pub async fn write_error(&self, target: &LicenseTarget, message: &str) -> Result<()> {
        let html = render_license_page(
            &target.name,
            PageContent::Error(message),
            &self.render,
            &self.render.timestamp_now(),
        );
        self.writer.write_page(&target.name, &html).await?;
        Ok(())
    }
}
