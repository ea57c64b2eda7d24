//! Parse `lmutil lmstat -A` output into license usage blocks.
//!
//! Expected shape (noise lines elided):
//! ```text
//! Users of FeatureA:  (Total of 10 licenses issued;  Total of 3 licenses in use)
//!
//!   "FeatureA" v1.0, vendor: MLM, expiry: 1-jan-2030
//!   floating license
//!
//!     alice ws1 ws1 (v1.0) (lic01/27000 101), start Mon 1/1 10:00
//!     bob ws2 ws2 (v1.0) (lic01/27000 202), start Mon 1/1 09:00
//! ```
//!
//! The parser is a single forward pass over two states: no block open, or a
//! block open and collecting detail lines. Only header lines can fail;
//! everything else that doesn't fit is dropped.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use super::filter::{LineFilter, DEFAULT_IGNORE_MARKERS};
use super::types::{LicenseBlock, ParsedReport, UsageRecord};

/// Literal prefix of a block header line
const HEADER_PREFIX: &str = "Users of";

/// Fewest tokens a detail line may carry: user, station, and one details field
const MIN_DETAIL_FIELDS_FLOOR: usize = 3;

/// Count following each `Total of` in a header (issued first, then in use)
static TOTAL_OF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Total of\s*(?P<count>\S+)").expect("Invalid TOTAL_OF_PATTERN regex"));

/// Error for a header line that can't anchor a block
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The header has no third token to use as the feature name
    #[error("line {line_no}: license header has no feature name: {line:?}")]
    MissingName { line_no: usize, line: String },

    /// Fewer than two `Total of` counts on the header
    #[error("line {line_no}: license header has no {field} count: {line:?}")]
    MissingCount {
        line_no: usize,
        field: &'static str,
        line: String,
    },

    /// A count token that is not a non-negative integer
    #[error("line {line_no}: {field} count {value:?} is not a non-negative integer")]
    InvalidCount {
        line_no: usize,
        field: &'static str,
        value: String,
        line: String,
    },
}

/// Parser tuning (from `[parser]` in the config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Noise markers; replaces the built-in list
    #[serde(default = "default_ignore_markers")]
    pub ignore_markers: Vec<String>,

    /// Markers added on top of `ignore_markers`
    #[serde(default)]
    pub extra_ignore_markers: Vec<String>,

    /// Detail lines with fewer whitespace-separated tokens are dropped
    #[serde(default = "default_min_detail_fields")]
    pub min_detail_fields: usize,
}

fn default_ignore_markers() -> Vec<String> {
    DEFAULT_IGNORE_MARKERS.iter().map(|m| m.to_string()).collect()
}

fn default_min_detail_fields() -> usize {
    4
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            ignore_markers: default_ignore_markers(),
            extra_ignore_markers: Vec::new(),
            min_detail_fields: default_min_detail_fields(),
        }
    }
}

/// How a single trimmed line is treated, independent of parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind {
    Blank,
    Ignored,
    Header,
    Detail,
}

/// Parser state between lines
#[derive(Debug)]
enum ParserState {
    NoOpenBlock,
    BlockOpen(LicenseBlock),
}

/// Line-oriented lmstat report parser
#[derive(Debug, Clone)]
pub struct ReportParser {
    filter: LineFilter,
    min_detail_fields: usize,
}

impl ReportParser {
    /// Create a parser from config
    pub fn new(config: &ParserConfig) -> Self {
        let mut filter = LineFilter::new(config.ignore_markers.iter().cloned());
        filter.extend(config.extra_ignore_markers.iter().cloned());

        Self {
            filter,
            min_detail_fields: config.min_detail_fields.max(MIN_DETAIL_FIELDS_FLOOR),
        }
    }

    /// Active noise filter
    pub fn filter(&self) -> &LineFilter {
        &self.filter
    }

    /// Parse a full report.
    ///
    /// Returns blocks in header order. Fails only when a header line lacks
    /// its feature name or either count.
    pub fn parse(&self, text: &str) -> Result<ParsedReport, ParseError> {
        let mut blocks = Vec::new();
        let mut state = ParserState::NoOpenBlock;

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            let kind = self.classify(line);
            state = self.step(state, kind, idx + 1, line, &mut blocks)?;
        }

        if let ParserState::BlockOpen(block) = state {
            blocks.push(block);
        }

        Ok(blocks)
    }

    /// Classify a trimmed line. The ignore check runs before the header check.
    fn classify(&self, line: &str) -> LineKind {
        if line.is_empty() {
            LineKind::Blank
        } else if self.filter.is_ignored(line) {
            LineKind::Ignored
        } else if line.starts_with(HEADER_PREFIX) {
            LineKind::Header
        } else {
            LineKind::Detail
        }
    }

    /// Apply one line to the state, closing blocks into `blocks` as headers arrive
    fn step(
        &self,
        state: ParserState,
        kind: LineKind,
        line_no: usize,
        line: &str,
        blocks: &mut ParsedReport,
    ) -> Result<ParserState, ParseError> {
        let next = match (state, kind) {
            (state, LineKind::Blank | LineKind::Ignored) => state,
            (ParserState::NoOpenBlock, LineKind::Header) => {
                ParserState::BlockOpen(parse_header(line_no, line)?)
            }
            (ParserState::BlockOpen(open), LineKind::Header) => {
                blocks.push(open);
                ParserState::BlockOpen(parse_header(line_no, line)?)
            }
            (ParserState::BlockOpen(mut open), LineKind::Detail) => {
                match self.parse_detail(line) {
                    Some(record) => open.users.push(record),
                    None => trace!(line_no, "dropping short detail line: {}", line),
                }
                ParserState::BlockOpen(open)
            }
            (ParserState::NoOpenBlock, LineKind::Detail) => {
                trace!(line_no, "dropping line outside any license block: {}", line);
                ParserState::NoOpenBlock
            }
        };
        Ok(next)
    }

    /// Build a usage record from a detail line.
    ///
    /// Token 2 (the display/host echo in lmstat output) is not kept.
    fn parse_detail(&self, line: &str) -> Option<UsageRecord> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < self.min_detail_fields {
            return None;
        }

        Some(UsageRecord {
            user: tokens[0].to_string(),
            station: tokens[1].to_string(),
            details: tokens[3..].join(" "),
        })
    }
}

impl Default for ReportParser {
    fn default() -> Self {
        Self::new(&ParserConfig::default())
    }
}

static DEFAULT_PARSER: Lazy<ReportParser> = Lazy::new(ReportParser::default);

/// Parse a report with the built-in markers and field minimum
pub fn parse_report(text: &str) -> Result<ParsedReport, ParseError> {
    DEFAULT_PARSER.parse(text)
}

/// Parse a `Users of <name>: (Total of N ...; Total of M ...)` header
fn parse_header(line_no: usize, line: &str) -> Result<LicenseBlock, ParseError> {
    let name = line
        .split_whitespace()
        .nth(2)
        .map(|token| token.trim_end_matches(':'))
        .ok_or_else(|| ParseError::MissingName {
            line_no,
            line: line.to_string(),
        })?;

    let mut counts = TOTAL_OF_PATTERN
        .captures_iter(line)
        .filter_map(|caps| caps.name("count"))
        .map(|m| m.as_str());

    let total_issued = parse_count(line_no, line, "issued", counts.next())?;
    let total_in_use = parse_count(line_no, line, "in use", counts.next())?;

    Ok(LicenseBlock::new(name, total_issued, total_in_use))
}

fn parse_count(
    line_no: usize,
    line: &str,
    field: &'static str,
    token: Option<&str>,
) -> Result<u64, ParseError> {
    let value = token.ok_or_else(|| ParseError::MissingCount {
        line_no,
        field,
        line: line.to_string(),
    })?;

    value.parse::<u64>().map_err(|_| ParseError::InvalidCount {
        line_no,
        field,
        value: value.to_string(),
        line: line.to_string(),
    })
}
