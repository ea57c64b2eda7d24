//! Usage data types parsed from lmstat output.

use serde::Serialize;

/// A single checkout of a feature by a user on a station
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageRecord {
    /// Login name (first field of the detail line)
    pub user: String,
    /// Host the license is checked out to
    pub station: String,
    /// Remaining fields (version, server handle, start time) joined by single spaces
    pub details: String,
}

/// Usage of one feature, opened by a `Users of <feature>:` header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseBlock {
    /// Feature name as printed in the header
    pub license_name: String,
    /// Licenses issued by the server
    pub total_issued: u64,
    /// Licenses currently checked out
    pub total_in_use: u64,
    /// Checkouts in report order
    pub users: Vec<UsageRecord>,
}

impl LicenseBlock {
    /// Create a block with no checkouts yet
    pub fn new(license_name: impl Into<String>, total_issued: u64, total_in_use: u64) -> Self {
        Self {
            license_name: license_name.into(),
            total_issued,
            total_in_use,
            users: Vec::new(),
        }
    }

    /// Free seats, derived on demand.
    ///
    /// Negative when the server reports more seats in use than issued;
    /// the inconsistency is surfaced as-is. Widened so any pair of `u64`
    /// counts fits.
    pub fn total_free(&self) -> i128 {
        i128::from(self.total_issued) - i128::from(self.total_in_use)
    }
}

/// All blocks of one report, in header order
pub type ParsedReport = Vec<LicenseBlock>;
