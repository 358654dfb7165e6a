use crate::model::vo::{SubmitReport, SubmitRequest};

#[async_trait::async_trait]
pub trait SubmitService {
    async fn submit(&self, request: SubmitRequest) -> anyhow::Result<SubmitReport>;
}
