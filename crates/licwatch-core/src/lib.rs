//! Core library for licwatch.
//!
//! Polls FlexLM license servers through `lmutil lmstat`, parses the textual
//! status report into per-feature usage blocks, and renders static,
//! auto-refreshing HTML dashboards.

pub mod collector;
pub mod config;
pub mod monitor;
pub mod render;
pub mod report;
pub mod targets;
