use std::path::Path;

/// Moves files between shared storage and the worker's scratch area.
#[async_trait::async_trait]
pub trait StorageClient {
    async fn fetch(&self, source: &str, destination: &Path) -> anyhow::Result<()>;
    async fn store(&self, source: &Path, destination: &str) -> anyhow::Result<()>;
}
