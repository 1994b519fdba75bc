use super::DataSource;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// In-memory file tree, used to exercise loaders without touching disk.
#[derive(Clone, Default)]
pub struct MemorySource {
    files: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, path: &str, content: impl Into<String>) {
        let mut files = self.files.lock().await;
        debug!("MemorySource PUT {}", path);
        files.insert(path.trim_matches('/').to_string(), content.into());
    }
}

#[async_trait]
impl DataSource for MemorySource {
    async fn read(&self, path: &str) -> Result<Option<String>> {
        let files = self.files.lock().await;
        Ok(files.get(path.trim_matches('/')).cloned())
    }

    async fn list(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", dir.trim_matches('/'));
        let files = self.files.lock().await;
        // BTreeMap keys are already sorted.
        Ok(files
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|name| !name.contains('/'))
            .map(str::to_string)
            .collect())
    }
}
