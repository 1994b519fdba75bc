use super::DataSource;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serves files from a directory on disk.
pub struct DiskSource {
    root: PathBuf,
}

impl DiskSource {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl DataSource for DiskSource {
    async fn read(&self, path: &str) -> Result<Option<String>> {
        let full_path = self.root.join(path);
        match tokio::fs::read_to_string(&full_path).await {
            Ok(content) => {
                debug!("Read {} bytes from {}", content.len(), full_path.display());
                Ok(Some(content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                Err(e).with_context(|| format!("Failed to read file: {}", full_path.display()))
            }
        }
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>> {
        let full_path = self.root.join(dir);
        let mut entries = match tokio::fs::read_dir(&full_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Directory {} does not exist", full_path.display());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to list directory: {}", full_path.display()));
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }
}
