use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::collector::CollectorSettings;
use crate::render::RenderSettings;
use crate::report::ParserConfig;

/// Command line arguments
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "FlexLM license usage dashboards from lmstat")]
pub struct Config {
    /// Enable debug mode
    #[arg(short, long)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target list (license_name,server,port per line)
    #[arg(short, long)]
    pub targets: Option<PathBuf>,

    /// Directory for index.html and the pages directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pause between cycles in milliseconds
    #[arg(short = 'i', long)]
    pub interval: Option<u64>,

    /// Run a single cycle and exit
    #[arg(long)]
    pub once: bool,
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Application settings (from config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Target list file
    #[serde(default = "default_targets_file")]
    pub targets_file: PathBuf,

    /// Directory for index.html
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Sub-directory of `output_dir` for license pages
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,

    /// Pause between cycles in milliseconds
    #[serde(default = "default_cycle_interval")]
    pub cycle_interval_ms: u64,

    /// Status command settings
    #[serde(default)]
    pub collector: CollectorSettings,

    /// Report parser settings
    #[serde(default)]
    pub parser: ParserConfig,

    /// HTML output settings
    #[serde(default)]
    pub render: RenderSettings,
}

fn default_targets_file() -> PathBuf {
    PathBuf::from("licenses.txt")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_pages_dir() -> String {
    "pages".to_string()
}

fn default_cycle_interval() -> u64 {
    1000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            targets_file: default_targets_file(),
            output_dir: default_output_dir(),
            pages_dir: default_pages_dir(),
            cycle_interval_ms: default_cycle_interval(),
            collector: CollectorSettings::default(),
            parser: ParserConfig::default(),
            render: RenderSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from config file or use defaults
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path must exist
        if let Some(p) = path {
            return Self::from_file(p);
        }

        // Try default config locations
        let default_paths = [
            dirs::config_dir().map(|p| p.join("licwatch/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/licwatch/config.toml")),
            dirs::home_dir().map(|p| p.join(".licwatch.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        // Return defaults if no config file found
        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if let Some(targets) = &cli.targets {
            self.targets_file = targets.clone();
        }
        if let Some(output) = &cli.output {
            self.output_dir = output.clone();
        }
        if let Some(interval) = cli.interval {
            self.cycle_interval_ms = interval;
        }
    }

    /// Validate and normalize settings values
    pub fn validate(&mut self) {
        const MIN_CYCLE_INTERVAL: u64 = 1;
        const MIN_REFRESH_SECS: u64 = 1;
        const MIN_DETAIL_FIELDS: usize = 3;

        if self.cycle_interval_ms < MIN_CYCLE_INTERVAL {
            self.cycle_interval_ms = MIN_CYCLE_INTERVAL;
        }
        if self.render.refresh_secs < MIN_REFRESH_SECS {
            self.render.refresh_secs = MIN_REFRESH_SECS;
        }
        if self.parser.min_detail_fields < MIN_DETAIL_FIELDS {
            self.parser.min_detail_fields = MIN_DETAIL_FIELDS;
        }
        if self.pages_dir.trim().is_empty() {
            self.pages_dir = default_pages_dir();
        }
    }
}
