use std::path::Path;

#[async_trait::async_trait]
pub trait JobScheduler {
    /// Hand a DAGMan file to the scheduler, returning the DAGMan cluster id.
    async fn submit_dag(&self, dag_path: &Path) -> anyhow::Result<String>;
    /// Submit a single descriptor, returning its cluster id.
    async fn submit_job(&self, descriptor_path: &Path) -> anyhow::Result<String>;
}
