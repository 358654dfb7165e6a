use crate::model::vo::WorkerRequest;

#[async_trait::async_trait]
pub trait WorkerService {
    /// Stage, run and collect. Returns the exit code of the program.
    async fn run(&self, request: WorkerRequest) -> anyhow::Result<i32>;
}
