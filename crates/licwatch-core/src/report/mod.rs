//! lmstat report parsing.
//!
//! Turns the loosely structured output of `lmutil lmstat -A` into an ordered
//! list of [`LicenseBlock`]s, one per `Users of ...` header.

mod filter;
mod parser;
mod types;


pub use filter::{LineFilter, DEFAULT_IGNORE_MARKERS};
pub use parser::{parse_report, ParseError, ParserConfig, ReportParser};
pub use types::{LicenseBlock, ParsedReport, UsageRecord};
