//! Target list loader.
//!
//! Format: one `license_name,server_name,port` triple per line. Blank lines
//! and `#` comments are skipped. Malformed lines are logged and skipped so
//! one typo doesn't take the whole dashboard down. Each kept target owns a
//! distinct page file.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

use crate::render::page_file_name;

/// One monitored license server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LicenseTarget {
    /// Display name; also names the output page
    pub name: String,
    /// License server host
    pub server: String,
    /// lmgrd port
    pub port: u16,
}

impl LicenseTarget {
    /// Create a new target
    pub fn new(name: impl Into<String>, server: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            server: server.into(),
            port,
        }
    }

    /// FlexLM license path form (`port@server`)
    pub fn license_path(&self) -> String {
        format!("{}@{}", self.port, self.server)
    }
}

/// Read and parse a target list file
pub fn load_targets(path: &Path) -> Result<Vec<LicenseTarget>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read targets file: {:?}", path))?;
    Ok(parse_targets(&content))
}

/// Parse target list content.
///
/// Targets are keyed by their page file name, so two names that sanitize to
/// the same file (`My Tool`, `My_Tool`) count as duplicates. The first wins.
pub fn parse_targets(content: &str) -> Vec<LicenseTarget> {
    let mut seen = HashSet::new();
    let mut targets = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some(target) = parse_line(line) else {
            warn!(line_no = idx + 1, "Skipping malformed target line: {}", line);
            continue;
        };

        let page = page_file_name(&target.name);
        if !seen.insert(page.clone()) {
            warn!(
                line_no = idx + 1,
                target = %target.name,
                page = %page,
                "Skipping target whose page name is already taken"
            );
            continue;
        }

        targets.push(target);
    }

    targets
}

fn parse_line(line: &str) -> Option<LicenseTarget> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [name, server, port] = fields.as_slice() else {
        return None;
    };
    if name.is_empty() || server.is_empty() {
        return None;
    }
    let port = port.parse().ok()?;
    Some(LicenseTarget::new(*name, *server, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_parse_targets() {
        let content = "\
# name,server,port
MATLAB,lic01.example.com,27000

  # indented comment
ANSYS , lic02 , 1055
";
        assert_eq!(
            parse_targets(content),
            vec![
                LicenseTarget::new("MATLAB", "lic01.example.com", 27000),
                LicenseTarget::new("ANSYS", "lic02", 1055),
            ]
        );
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let content = "\
only,two
too,many,fields,here
Bad,host,port
Big,host,70000
,host,1
Good,host,1
";
        assert_eq!(parse_targets(content), vec![LicenseTarget::new("Good", "host", 1)]);
    }

    #[test]
    fn test_duplicate_names_keep_first() {
        let content = "A,h1,1\nA,h2,2\nB,h3,3\n";
        let targets = parse_targets(content);
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].server, "h1");
        assert_eq!(targets[1].name, "B");
    }

    #[test]
    fn test_names_sharing_a_page_keep_first() {
        let content = "My Tool,lic01,1\nMy_Tool,lic02,2\nMy/Tool,lic03,3\nOther,lic04,4\n";
        assert_eq!(
            parse_targets(content),
            vec![
                LicenseTarget::new("My Tool", "lic01", 1),
                LicenseTarget::new("Other", "lic04", 4),
            ]
        );
    }

    #[test]
    fn test_license_path() {
        let target = LicenseTarget::new("MATLAB", "lic01", 27000);
        assert_eq!(target.license_path(), "27000@lic01");
    }

    #[test]
    fn test_load_targets_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "MATLAB,lic01,27000").unwrap();
        let targets = load_targets(file.path()).unwrap();
        assert_eq!(targets, vec![LicenseTarget::new("MATLAB", "lic01", 27000)]);
    }

    #[test]
    fn test_load_targets_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_targets(&dir.path().join("missing.txt")).unwrap_err();
        assert!(err.to_string().contains("Failed to read targets file"));
    }
}
