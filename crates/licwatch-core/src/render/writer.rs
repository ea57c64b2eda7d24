//! Output file management.
//!
//! Writes `index.html` into the output directory and one page per license
//! into its pages sub-directory. Each write goes to a temp file first and is
//! renamed into place, so a browser refresh never sees a partial page.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::escape::page_file_name;

const INDEX_FILE: &str = "index.html";

/// Writes rendered pages under an output directory
#[derive(Debug, Clone)]
pub struct OutputWriter {
    output_dir: PathBuf,
    pages_dir: String,
}

impl OutputWriter {
    /// Create a writer rooted at `output_dir`, with pages under `output_dir/pages_dir`
    pub fn new(output_dir: impl Into<PathBuf>, pages_dir: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            pages_dir: pages_dir.into(),
        }
    }

    /// Pages sub-directory as used in index links
    pub fn pages_dir(&self) -> &str {
        &self.pages_dir
    }

    /// Path of the index page
    pub fn index_path(&self) -> PathBuf {
        self.output_dir.join(INDEX_FILE)
    }

    /// Path of the page for a license
    pub fn page_path(&self, license_name: &str) -> PathBuf {
        self.output_dir
            .join(&self.pages_dir)
            .join(page_file_name(license_name))
    }

    /// Write the index page
    pub async fn write_index(&self, html: &str) -> Result<PathBuf> {
        let path = self.index_path();
        write_atomic(&path, html).await?;
        Ok(path)
    }

    /// Write the page for a license
    pub async fn write_page(&self, license_name: &str, html: &str) -> Result<PathBuf> {
        let path = self.page_path(license_name);
        write_atomic(&path, html).await?;
        Ok(path)
    }
}

async fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    tokio::fs::write(&temp_path, contents)
        .await
        .with_context(|| format!("Failed to write temp page: {:?}", temp_path))?;

    tokio::fs::rename(&temp_path, path)
        .await
        .with_context(|| format!("Failed to rename page into place: {:?}", path))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_page_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path().join("site"), "pages");

        let path = writer.write_page("My Tool", "<html></html>").await.unwrap();
        assert_eq!(path, dir.path().join("site/pages/My_Tool.html"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html></html>");
        assert!(!dir.path().join("site/pages/My_Tool.html.tmp").exists());
    }

    #[tokio::test]
    async fn test_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let writer = OutputWriter::new(dir.path(), "pages");

        writer.write_index("first").await.unwrap();
        let path = writer.write_index("second").await.unwrap();
        assert_eq!(path, dir.path().join("index.html"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_write_fails_when_dir_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pages"), "not a dir").unwrap();
        let writer = OutputWriter::new(dir.path(), "pages");

        let err = writer.write_page("A", "x").await.unwrap_err();
        assert!(err.to_string().contains("Failed to create output directory"));
    }
}
