use crate::domain::job::OutboundJob;
use crate::domain::ports::JobQueue;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// In-process FIFO job queue. Admission returns as soon as a job lands here;
/// the bank automation worker drains it at its own pace via `claim`.
#[derive(Default, Clone)]
pub struct InMemoryJobQueue {
    jobs: Arc<Mutex<VecDeque<OutboundJob>>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: OutboundJob) -> Result<()> {
        let mut jobs = self.jobs.lock().await;
        jobs.push_back(job);
        Ok(())
    }

    async fn claim(&self) -> Result<Option<OutboundJob>> {
        let mut jobs = self.jobs.lock().await;
        Ok(jobs.pop_front())
    }

    async fn depth(&self) -> Result<u64> {
        let jobs = self.jobs.lock().await;
        Ok(jobs.len() as u64)
    }
}
