//! Noise filter for lmstat output.
//!
//! lmstat interleaves banners, vendor daemon status, and expiry notices with
//! the usage sections. These lines are dropped by substring match before any
//! structural parsing, so a noise line that also starts with `Users of` never
//! opens a block.

/// Markers for lines that never carry usage data.
pub const DEFAULT_IGNORE_MARKERS: &[&str] = &[
    "vendor_string",
    "floating license",
    "expiry",
    "vendor:",
    "license manager:",
    "system clock",
    "File ID:",
    "Detecting lmgrd processes",
    "Feature usage info",
];

/// Substring-membership filter over a configurable marker list
#[derive(Debug, Clone)]
pub struct LineFilter {
    markers: Vec<String>,
}

impl LineFilter {
    /// Build a filter from an explicit marker list
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers
                .into_iter()
                .map(Into::into)
                .filter(|m: &String| !m.is_empty())
                .collect(),
        }
    }

    /// Add more markers to the active list
    pub fn extend<I, S>(&mut self, markers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markers.extend(
            markers
                .into_iter()
                .map(Into::into)
                .filter(|m: &String| !m.is_empty()),
        );
    }

    /// Whether the line contains any marker
    pub fn is_ignored(&self, line: &str) -> bool {
        self.markers.iter().any(|m| line.contains(m.as_str()))
    }

    /// Active markers
    pub fn markers(&self) -> &[String] {
        &self.markers
    }
}

impl Default for LineFilter {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE_MARKERS.iter().copied())
    }
}
