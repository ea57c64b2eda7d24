//! Polling loop: one collect -> parse -> render pipeline per target, run
//! concurrently each cycle.

mod pipeline;
mod scheduler;


pub use pipeline::{PipelineContext, TargetOutcome, COLLECT_FAILURE_MESSAGE};
pub use scheduler::{CycleSummary, Scheduler};
