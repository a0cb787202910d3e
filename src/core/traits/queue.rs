use crate::core::error::Result;
use async_trait::async_trait;

/// Background-job enqueue contract composed by the host alongside the
/// gateway layer (e.g. to fan out webhook side effects)
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Add a job to the queue for background processing
    async fn add(&self, job_name: &str, data: serde_json::Value) -> Result<()>;
}
