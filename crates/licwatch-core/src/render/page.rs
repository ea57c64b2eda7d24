use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::escape::{escape_html, page_file_name};
use crate::report::LicenseBlock;
use crate::targets::LicenseTarget;

const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TABLE_COLUMNS: [&str; 7] = [
    "License",
    "User",
    "Station",
    "Total Issued",
    "Total In Use",
    "Total Free",
    "Details",
];

const INDEX_COLUMNS: [&str; 4] = ["License Name", "Server Name", "Port", "Details"];

const STYLE: &str = r#"<style>
  body { font-family: Arial, sans-serif; background-color: #f4f4f4; margin: 0; padding: 20px; position: relative; }
  .timestamp { position: absolute; top: 20px; left: 20px; color: #333; font-size: 14px; }
  h2 { text-align: center; color: #4CAF50; }
  table { width: 80%; margin: 20px auto; border-collapse: collapse; box-shadow: 0 2px 3px rgba(0,0,0,0.1); }
  th, td { padding: 10px; text-align: left; border-bottom: 1px solid #ddd; white-space: nowrap; }
  th { background-color: #4CAF50; color: white; }
  tr:nth-child(even) { background-color: #f2f2f2; }
  tr:hover { background-color: #e0e0e0; }
  td.negative { color: #c62828; font-weight: bold; }
  p.error { text-align: center; color: #c62828; }
  a { color: #4CAF50; text-decoration: none; }
  a:hover { text-decoration: underline; }
</style>"#;

/// Rendering settings (`[render]` in the config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Client auto-refresh interval in seconds
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,

    /// chrono format string for the "Last updated" stamp
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

fn default_refresh_secs() -> u64 {
    5
}

fn default_timestamp_format() -> String {
    DEFAULT_TIMESTAMP_FORMAT.to_string()
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            refresh_secs: default_refresh_secs(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

impl RenderSettings {
    /// Current local time in the configured format.
    ///
    /// Falls back to the default format if the configured one is invalid.
    pub fn timestamp_now(&self) -> String {
        let now = chrono::Local::now();
        let mut out = String::new();
        if write!(out, "{}", now.format(&self.timestamp_format)).is_err() {
            out.clear();
            let _ = write!(out, "{}", now.format(DEFAULT_TIMESTAMP_FORMAT));
        }
        out
    }
}

/// Body of a license page
#[derive(Debug, Clone, Copy)]
pub enum PageContent<'a> {
    /// Parsed usage blocks
    Report(&'a [LicenseBlock]),
    /// Collection or parse failure message
    Error(&'a str),
}

/// Render the page for one license target
pub fn render_license_page(
    license_name: &str,
    content: PageContent<'_>,
    settings: &RenderSettings,
    generated_at: &str,
) -> String {
    let name = escape_html(license_name);
    let mut html = String::with_capacity(4096);

    match content {
        PageContent::Report(blocks) => {
            let title = format!("{} License Details", name);
            push_head(&mut html, &title, settings, generated_at);

            html.push_str("<table>\n<thead>\n");
            push_header_row(&mut html, &TABLE_COLUMNS);
            html.push_str("</thead>\n<tbody>\n");
            for block in blocks {
                push_block_rows(&mut html, block);
            }
            html.push_str("</tbody>\n</table>\n");
        }
        PageContent::Error(message) => {
            let title = format!("Error for {}", name);
            push_head(&mut html, &title, settings, generated_at);

            html.push_str("<p class=\"error\">");
            html.push_str(&escape_html(message));
            html.push_str("</p>\n");
        }
    }

    push_tail(&mut html);
    html
}

/// Render the index page linking every target's page under `pages_dir`
pub fn render_index(
    targets: &[LicenseTarget],
    pages_dir: &str,
    settings: &RenderSettings,
    generated_at: &str,
) -> String {
    let mut html = String::with_capacity(2048);
    push_head(&mut html, "License Index", settings, generated_at);

    html.push_str("<table>\n<thead>\n");
    push_header_row(&mut html, &INDEX_COLUMNS);
    html.push_str("</thead>\n<tbody>\n");

    for target in targets {
        let href = format!("{}/{}", pages_dir.trim_end_matches('/'), page_file_name(&target.name));
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td><a href=\"{}\">Details</a></td></tr>",
            escape_html(&target.name),
            escape_html(&target.server),
            target.port,
            escape_html(&href),
        );
    }

    html.push_str("</tbody>\n</table>\n");
    push_tail(&mut html);
    html
}

/// Document head plus the opening of the body. `title` is already escaped.
fn push_head(html: &mut String, title: &str, settings: &RenderSettings, generated_at: &str) {
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    let _ = writeln!(
        html,
        "<meta http-equiv=\"refresh\" content=\"{}\">",
        settings.refresh_secs
    );
    let _ = writeln!(html, "<title>{}</title>", title);
    html.push_str(STYLE);
    html.push_str("\n</head>\n<body>\n");
    let _ = writeln!(
        html,
        "<div class=\"timestamp\">Last updated: {}</div>",
        escape_html(generated_at)
    );
    let _ = writeln!(html, "<h2>{}</h2>", title);
}

fn push_tail(html: &mut String) {
    html.push_str("</body>\n</html>\n");
}

fn push_header_row(html: &mut String, columns: &[&str]) {
    html.push_str("<tr>");
    for column in columns {
        let _ = write!(html, "<th>{}</th>", column);
    }
    html.push_str("</tr>\n");
}

/// One row per checkout; block totals are repeated on each row
fn push_block_rows(html: &mut String, block: &LicenseBlock) {
    let license = escape_html(&block.license_name);
    let free = block.total_free();
    let free_cell = if free < 0 {
        format!("<td class=\"negative\">{}</td>", free)
    } else {
        format!("<td>{}</td>", free)
    };

    for user in &block.users {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>{}<td>{}</td></tr>",
            license,
            escape_html(&user.user),
            escape_html(&user.station),
            block.total_issued,
            block.total_in_use,
            free_cell,
            escape_html(&user.details),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{parse_report, UsageRecord};

    const STAMP: &str = "2024-01-01 10:00:00";

    #[test]
    fn test_report_page() {
        let blocks = parse_report(
            "Users of FeatureA:  (Total of 10 licenses issued;  Total of 3 licenses in use)\n\
             alice workstation1 ACTIVE 2024-01-01 10:00\n\
             bob workstation2 ACTIVE 2024-01-01 09:00\n",
        )
        .unwrap();

        let html = render_license_page(
            "FeatureA",
            PageContent::Report(&blocks),
            &RenderSettings::default(),
            STAMP,
        );

        assert!(html.contains("<meta http-equiv=\"refresh\" content=\"5\">"));
        assert!(html.contains("Last updated: 2024-01-01 10:00:00"));
        assert!(html.contains("<title>FeatureA License Details</title>"));
        assert!(html.contains("<th>Total Free</th>"));
        assert!(html.contains(
            "<tr><td>FeatureA</td><td>alice</td><td>workstation1</td><td>10</td><td>3</td><td>7</td><td>2024-01-01 10:00</td></tr>"
        ));
        assert!(html.contains("<td>bob</td>"));
        assert_eq!(html.matches("<tr><td>FeatureA</td>").count(), 2);
    }

    #[test]
    fn test_empty_block_renders_empty_body() {
        let blocks = vec![LicenseBlock::new("Idle", 4, 0)];
        let html = render_license_page(
            "Idle",
            PageContent::Report(&blocks),
            &RenderSettings::default(),
            STAMP,
        );
        assert!(html.contains("<tbody>\n</tbody>"));
    }

    #[test]
    fn test_negative_free_is_surfaced() {
        let mut block = LicenseBlock::new("Over", 1, 3);
        block.users.push(UsageRecord {
            user: "u".to_string(),
            station: "s".to_string(),
            details: "d".to_string(),
        });
        let html = render_license_page(
            "Over",
            PageContent::Report(std::slice::from_ref(&block)),
            &RenderSettings::default(),
            STAMP,
        );
        assert!(html.contains("<td class=\"negative\">-2</td>"));
    }

    #[test]
    fn test_error_page() {
        let html = render_license_page(
            "MATLAB",
            PageContent::Error("Unable to retrieve license information."),
            &RenderSettings {
                refresh_secs: 30,
                ..RenderSettings::default()
            },
            STAMP,
        );
        assert!(html.contains("<title>Error for MATLAB</title>"));
        assert!(html.contains("<p class=\"error\">Unable to retrieve license information.</p>"));
        assert!(html.contains("content=\"30\""));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn test_data_is_escaped() {
        let mut block = LicenseBlock::new("<A>", 1, 1);
        block.users.push(UsageRecord {
            user: "<script>".to_string(),
            station: "s&t".to_string(),
            details: "\"x\"".to_string(),
        });
        let html = render_license_page(
            "<A>",
            PageContent::Report(std::slice::from_ref(&block)),
            &RenderSettings::default(),
            STAMP,
        );
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("s&amp;t"));
        assert!(html.contains("<title>&lt;A&gt; License Details</title>"));
    }

    #[test]
    fn test_index_page() {
        let targets = vec![
            LicenseTarget::new("MATLAB", "lic01", 27000),
            LicenseTarget::new("My Tool", "lic02", 1055),
        ];
        let html = render_index(&targets, "pages/", &RenderSettings::default(), STAMP);

        assert!(html.contains("<title>License Index</title>"));
        assert!(html.contains("<th>License Name</th><th>Server Name</th><th>Port</th><th>Details</th>"));
        assert!(html.contains(
            "<tr><td>MATLAB</td><td>lic01</td><td>27000</td><td><a href=\"pages/MATLAB.html\">Details</a></td></tr>"
        ));
        assert!(html.contains("<a href=\"pages/My_Tool.html\">"));
        assert!(html.contains("Last updated: 2024-01-01 10:00:00"));
    }

    #[test]
    fn test_timestamp_falls_back_on_bad_format() {
        let settings = RenderSettings {
            timestamp_format: "%Q".to_string(),
            ..RenderSettings::default()
        };
        let stamp = settings.timestamp_now();
        assert_eq!(stamp.len(), "2024-01-01 10:00:00".len());
    }
}
