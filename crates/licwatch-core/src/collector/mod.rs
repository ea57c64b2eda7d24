//! Collect raw lmstat reports from license servers.
//!
//! The collector shells out to `lmutil lmstat` once per target and hands back
//! its stdout. Any failure (missing binary, non-zero exit, deadline, empty
//! output) comes back as a [`CollectError`]; nothing here panics or leaks
//! into the parser.

use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::targets::LicenseTarget;

/// Placeholder for the target port in argument templates
const PORT_PLACEHOLDER: &str = "{port}";
/// Placeholder for the target host in argument templates
const SERVER_PLACEHOLDER: &str = "{server}";

/// Why a report could not be collected
#[derive(Debug, Error)]
pub enum CollectError {
    /// The executable could not be started
    #[error("failed to launch {program:?}: {source}")]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The command ran but reported failure
    #[error("{program:?} exited with {status}: {stderr}")]
    ExitStatus {
        program: PathBuf,
        status: String,
        stderr: String,
    },

    /// The command did not finish before the deadline
    #[error("{program:?} timed out after {timeout:?}")]
    TimedOut { program: PathBuf, timeout: Duration },

    /// The command succeeded but printed nothing
    #[error("{program:?} produced no output")]
    EmptyOutput { program: PathBuf },
}

/// Source of raw status reports (extensible for tests and alternative tools)
pub trait StatusSource: Send + Sync {
    /// Fetch the raw report for one target
    fn fetch(
        &self,
        target: &LicenseTarget,
    ) -> impl Future<Output = Result<String, CollectError>> + Send;
}

/// Collector settings (`[collector]` in the config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorSettings {
    /// Path to the lmutil executable
    #[serde(default = "default_lmutil_path")]
    pub lmutil_path: PathBuf,

    /// Argument template; `{port}` and `{server}` are substituted per target
    #[serde(default = "default_args")]
    pub args: Vec<String>,

    /// Deadline per invocation in seconds (0 = wait indefinitely)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum concurrent invocations per cycle (0 = one per target)
    #[serde(default)]
    pub max_concurrent: usize,
}

fn default_lmutil_path() -> PathBuf {
    PathBuf::from("/var/www/html/lms_apps/lmutil")
}

fn default_args() -> Vec<String> {
    ["lmstat", "-A", "-c", "{port}@{server}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            lmutil_path: default_lmutil_path(),
            args: default_args(),
            timeout_secs: default_timeout_secs(),
            max_concurrent: 0,
        }
    }
}

/// Runs `lmutil lmstat` as a child process
#[derive(Debug, Clone)]
pub struct LmutilCollector {
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl LmutilCollector {
    /// Create a collector from explicit parts
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Create a collector from config
    pub fn from_settings(settings: &CollectorSettings) -> Self {
        let timeout = (settings.timeout_secs > 0).then(|| Duration::from_secs(settings.timeout_secs));
        Self::new(settings.lmutil_path.clone(), settings.args.clone(), timeout)
    }

    /// Executable this collector runs
    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Arguments for one target, with placeholders substituted
    pub fn args_for(&self, target: &LicenseTarget) -> Vec<String> {
        let port = target.port.to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(PORT_PLACEHOLDER, &port)
                    .replace(SERVER_PLACEHOLDER, &target.server)
            })
            .collect()
    }

    async fn run(&self, args: Vec<String>) -> Result<String, CollectError> {
        let child = tokio::process::Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CollectError::Launch {
                program: self.program.clone(),
                source,
            })?;

        // Dropping the wait future on timeout drops the child, which kills it
        let waited = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, child.wait_with_output())
                .await
                .map_err(|_| CollectError::TimedOut {
                    program: self.program.clone(),
                    timeout,
                })?,
            None => child.wait_with_output().await,
        };

        let output = waited.map_err(|source| CollectError::Launch {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(CollectError::ExitStatus {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.trim().is_empty() {
            return Err(CollectError::EmptyOutput {
                program: self.program.clone(),
            });
        }

        Ok(stdout)
    }
}

impl StatusSource for LmutilCollector {
    async fn fetch(&self, target: &LicenseTarget) -> Result<String, CollectError> {
        let args = self.args_for(target);
        debug!(target = %target.name, "Running {:?} {}", self.program, args.join(" "));
        self.run(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn target() -> LicenseTarget {
        LicenseTarget::new("MATLAB", "lic01", 27000)
    }

    #[test]
    fn test_default_args_substitution() {
        let collector = LmutilCollector::from_settings(&CollectorSettings::default());
        assert_eq!(
            collector.args_for(&target()),
            vec!["lmstat", "-A", "-c", "27000@lic01"]
        );
        assert_eq!(
            collector.program(),
            &PathBuf::from("/var/www/html/lms_apps/lmutil")
        );
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let settings = CollectorSettings {
            timeout_secs: 0,
            ..CollectorSettings::default()
        };
        assert!(LmutilCollector::from_settings(&settings).timeout.is_none());
        assert_eq!(
            LmutilCollector::from_settings(&CollectorSettings::default()).timeout,
            Some(Duration::from_secs(60))
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_returns_stdout() {
        let collector = LmutilCollector::new(
            "/bin/sh",
            vec!["-c".into(), "echo server={server} port={port}".into()],
            Some(Duration::from_secs(5)),
        );
        let out = collector.fetch(&target()).await.unwrap();
        assert_eq!(out, "server=lic01 port=27000\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_missing_executable() {
        let collector = LmutilCollector::new("/nonexistent/lmutil", default_args(), None);
        let err = collector.fetch(&target()).await.unwrap_err();
        assert!(matches!(err, CollectError::Launch { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_non_zero_exit() {
        let collector = LmutilCollector::new(
            "/bin/sh",
            vec!["-c".into(), "echo partial; echo denied >&2; exit 3".into()],
            None,
        );
        match collector.fetch(&target()).await {
            Err(CollectError::ExitStatus { stderr, .. }) => assert_eq!(stderr, "denied"),
            other => panic!("expected ExitStatus, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_empty_output() {
        let collector = LmutilCollector::new("/bin/sh", vec!["-c".into(), "true".into()], None);
        let err = collector.fetch(&target()).await.unwrap_err();
        assert!(matches!(err, CollectError::EmptyOutput { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fetch_timeout() {
        let collector = LmutilCollector::new(
            "/bin/sh",
            vec!["-c".into(), "sleep 5".into()],
            Some(Duration::from_millis(100)),
        );
        let err = collector.fetch(&target()).await.unwrap_err();
        assert!(matches!(err, CollectError::TimedOut { .. }));
    }
}
