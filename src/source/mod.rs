//! Read access to the input tree deposited by the data collectors.

pub mod disk;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

pub use disk::DiskSource;
pub use memory::MemorySource;

/// A tree of named text files addressed by `/`-separated relative paths.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Returns `None` when the file does not exist.
    async fn read(&self, path: &str) -> Result<Option<String>>;

    /// Sorted file names directly inside `dir`. A missing directory is empty.
    async fn list(&self, dir: &str) -> Result<Vec<String>>;
}
