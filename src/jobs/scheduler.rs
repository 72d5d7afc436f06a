//! The gap scheduler plans jobs out of coverage gaps and submits them to the
//! durable queue. Submission is one bulk operation; duplicates collapse on
//! the deterministic job key.

use sqlx::SqlitePool;
use tracing::{debug, info};

use super::{plan_jobs, queue};
use crate::error::ServiceError;
use crate::models::BlockRange;

#[derive(Clone)]
pub struct GapScheduler {
    pool: SqlitePool,
    max_blocks_per_job: u64,
}

impl GapScheduler {
    pub fn new(pool: SqlitePool, max_blocks_per_job: u64) -> Self {
        Self {
            pool,
            max_blocks_per_job,
        }
    }

    /// Plan and enqueue jobs for every gap, splitting at the configured block
    /// limit. Returns the number of jobs newly added to the queue.
    pub async fn schedule_gaps(
        &self,
        address: &str,
        gaps: &[BlockRange],
    ) -> Result<u64, ServiceError> {
        self.schedule_with_chunk(address, gaps, self.max_blocks_per_job)
            .await
    }

    /// Enqueue ranges split at an explicit chunk size. Used by the worker's
    /// query-timeout recovery, which re-submits a refused range in pieces
    /// small enough for the explorer to answer.
    pub async fn schedule_with_chunk(
        &self,
        address: &str,
        ranges: &[BlockRange],
        chunk_size: u64,
    ) -> Result<u64, ServiceError> {
        if ranges.is_empty() {
            return Ok(0);
        }

        let jobs = plan_jobs(address, ranges, chunk_size);
        debug!(address, gaps = ranges.len(), jobs = jobs.len(), "planned gap jobs");

        let inserted = queue::enqueue_all(&self.pool, &jobs).await?;
        if inserted > 0 {
            info!(address, inserted, planned = jobs.len(), "enqueued gap jobs");
        }
        Ok(inserted)
    }
}
