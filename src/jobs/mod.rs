//! Background gap-fill jobs: planning, the durable queue, and the worker
//! pool that drains it.

pub mod queue;
pub mod scheduler;
pub mod worker;

pub use scheduler::GapScheduler;
pub use worker::WorkerPool;

use std::time::Duration;

use sqlx::FromRow;

use crate::models::BlockRange;

pub mod status {
    pub const PENDING: &str = "pending";
    pub const RUNNING: &str = "running";
    pub const COMPLETED: &str = "completed";
    pub const FAILED: &str = "failed";
}

/// One row of the durable `gap_jobs` queue.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct GapJob {
    pub job_key: String,
    pub address: String,
    pub from_block: i64,
    pub to_block: i64,
    pub total_jobs: i64,
    pub current_job: i64,
    pub priority: i64,
    pub status: String,
    pub attempts: i64,
    pub run_at: i64,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl GapJob {
    pub fn range(&self) -> BlockRange {
        BlockRange::new(self.from_block as u64, self.to_block as u64)
    }
}

/// A job produced by the planner, not yet enqueued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedJob {
    pub address: String,
    pub range: BlockRange,
    pub total_jobs: u32,
    pub current_job: u32,
    pub priority: i64,
    /// Stagger offset applied to the job's earliest start time.
    pub delay: Duration,
}

impl PlannedJob {
    /// Deterministic key; duplicate submissions of the same sub-range
    /// collapse in the queue.
    pub fn job_key(&self) -> String {
        job_key(&self.address, self.range.from_block, self.range.to_block)
    }
}

pub fn job_key(address: &str, from_block: u64, to_block: u64) -> String {
    format!("{address}-{from_block}-{to_block}")
}

/// Smaller gaps run first: they are cheap and finish coverage quickly.
pub fn priority_for(gap: &BlockRange) -> i64 {
    match gap.len() {
        0..=100 => 10,
        101..=1000 => 5,
        _ => 1,
    }
}

/// Split each gap into consecutive jobs of at most `max_blocks_per_job`
/// blocks. `total_jobs` is computed across all gaps before any job is built
/// so every job knows its progress denominator, and each job gets a
/// one-second-per-position stagger to spread startup load.
pub fn plan_jobs(address: &str, gaps: &[BlockRange], max_blocks_per_job: u64) -> Vec<PlannedJob> {
    let max = max_blocks_per_job.max(1);

    let chunks: Vec<(BlockRange, i64)> = gaps
        .iter()
        .flat_map(|gap| {
            let priority = priority_for(gap);
            split_range(*gap, max)
                .into_iter()
                .map(move |chunk| (chunk, priority))
        })
        .collect();

    let total = chunks.len() as u32;
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, (range, priority))| PlannedJob {
            address: address.to_string(),
            range,
            total_jobs: total,
            current_job: i as u32,
            priority,
            delay: Duration::from_secs(i as u64),
        })
        .collect()
}

/// Consecutive sub-ranges of at most `max` blocks covering `range` exactly.
pub fn split_range(range: BlockRange, max: u64) -> Vec<BlockRange> {
    let mut out = Vec::new();
    let mut start = range.from_block;
    while start <= range.to_block {
        let end = range.to_block.min(start.saturating_add(max - 1));
        out.push(BlockRange::new(start, end));
        if end == u64::MAX {
            break;
        }
        start = end + 1;
    }
    out
}
