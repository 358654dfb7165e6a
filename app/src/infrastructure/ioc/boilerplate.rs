use std::path::Path;

use domain::{
    model::vo::{SubmitReport, SubmitRequest, WorkerRequest},
    service::{JobScheduler, ProgramLauncher, StorageClient, SubmitService, WorkerService},
};
use service::prelude::*;

use super::Container;
use crate::infrastructure::service::{job_scheduler::CondorClient, worker_node::WorkerNode};

#[async_trait::async_trait]
impl JobScheduler for Container {
    async fn submit_dag(&self, dag_path: &Path) -> anyhow::Result<String> {
        CondorClient::inj_ref(self).submit_dag(dag_path).await
    }

    async fn submit_job(&self, descriptor_path: &Path) -> anyhow::Result<String> {
        CondorClient::inj_ref(self).submit_job(descriptor_path).await
    }
}

#[async_trait::async_trait]
impl StorageClient for Container {
    async fn fetch(&self, source: &str, destination: &Path) -> anyhow::Result<()> {
        WorkerNode::inj_ref(self).fetch(source, destination).await
    }

    async fn store(&self, source: &Path, destination: &str) -> anyhow::Result<()> {
        WorkerNode::inj_ref(self).store(source, destination).await
    }
}

#[async_trait::async_trait]
impl ProgramLauncher for Container {
    async fn make_executable(&self, path: &Path) -> anyhow::Result<()> {
        WorkerNode::inj_ref(self).make_executable(path).await
    }

    async fn launch(
        &self,
        program: &Path,
        args: &[String],
        work_dir: &Path,
    ) -> anyhow::Result<i32> {
        WorkerNode::inj_ref(self).launch(program, args, work_dir).await
    }
}

#[async_trait::async_trait]
impl SubmitService for Container {
    async fn submit(&self, request: SubmitRequest) -> anyhow::Result<SubmitReport> {
        SubmitServiceImpl::inj_ref(self).submit(request).await
    }
}

#[async_trait::async_trait]
impl WorkerService for Container {
    async fn run(&self, request: WorkerRequest) -> anyhow::Result<i32> {
        WorkerServiceImpl::inj_ref(self).run(request).await
    }
}
