//! The gap worker pool: long-lived tasks that claim due jobs from the
//! durable queue, fetch the missing range from the explorer page by page,
//! and persist transactions plus coverage in one durable transaction.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::queue;
use crate::error::ServiceError;
use crate::models::{BlockRange, SortOrder, Transaction};
use crate::state::AppState;
use crate::{db, jobs::GapJob};

/// Per-job cap on explorer round-trips; a pathological range cannot wedge a
/// worker forever.
const MAX_FETCH_ITERATIONS: u32 = 100;

/// Chunk size for re-enqueueing a range the explorer refused as too large.
const TIMEOUT_RECOVERY_CHUNK: u64 = 1_000;

pub struct WorkerPool {
    workers: Vec<WorkerHandle>,
}

struct WorkerHandle {
    #[allow(dead_code)]
    id: usize,
    handle: JoinHandle<()>,
}

impl WorkerPool {
    /// Spawn `worker_concurrency` workers. Each drains its in-flight job to
    /// completion before honoring the shutdown token.
    pub fn new(state: Arc<AppState>, shutdown: CancellationToken) -> Self {
        let count = state.config.worker_concurrency.max(1);
        let mut workers = Vec::with_capacity(count);

        for id in 0..count {
            let worker = Worker {
                id,
                state: state.clone(),
                shutdown: shutdown.clone(),
            };
            let handle = tokio::spawn(async move { worker.run().await });
            workers.push(WorkerHandle { id, handle });
        }

        Self { workers }
    }

    /// Wait for every worker to finish draining.
    pub async fn join(self) {
        for worker in self.workers {
            let _ = worker.handle.await;
        }
    }
}

struct Worker {
    id: usize,
    state: Arc<AppState>,
    shutdown: CancellationToken,
}

impl Worker {
    async fn run(&self) {
        info!("Gap worker {} started", self.id);

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            match queue::claim_next(&self.state.db_pool).await {
                Ok(Some(job)) => {
                    // Jobs are not cancellable by shutdown; the current one
                    // always drains through its durable commit.
                    self.execute(job).await;
                }
                Ok(None) => {
                    tokio::select! {
                        _ = sleep(self.state.config.worker_poll_interval) => {}
                        _ = self.shutdown.cancelled() => break,
                    }
                }
                Err(e) => {
                    error!(worker = self.id, error = %e, "failed to poll job queue");
                    tokio::select! {
                        _ = sleep(self.state.config.worker_poll_interval) => {}
                        _ = self.shutdown.cancelled() => break,
                    }
                }
            }
        }

        info!("Gap worker {} shut down", self.id);
    }

    async fn execute(&self, job: GapJob) {
        let from_block = job.from_block as u64;
        let to_block = job.to_block as u64;

        info!(
            worker = self.id,
            job = %job.job_key,
            current = job.current_job + 1,
            total = job.total_jobs,
            "processing gap job"
        );

        match process_gap(&self.state, &job.address, from_block, to_block).await {
            Ok(outcome) => {
                if let Err(e) = queue::complete(&self.state.db_pool, &job.job_key).await {
                    error!(job = %job.job_key, error = %e, "failed to mark job completed");
                }
                // A partial range leaves a remainder; hand it back to the
                // scheduler as a follow-up job.
                if let Some(rest) = outcome.remainder {
                    if let Err(e) = self
                        .state
                        .scheduler
                        .schedule_gaps(&job.address, &[rest])
                        .await
                    {
                        error!(job = %job.job_key, error = %e, "failed to re-enqueue remainder");
                    }
                }
                if let Err(e) = queue::prune_finished(&self.state.db_pool).await {
                    debug!(error = %e, "queue prune failed");
                }
            }
            // The explorer refused the range: split into small chunks and
            // re-enqueue rather than retrying in place. The current job
            // completes; recovery happens through the queue.
            Err(e) if e.is_timeout() && (to_block - from_block + 1) > TIMEOUT_RECOVERY_CHUNK => {
                warn!(
                    job = %job.job_key,
                    error = %e,
                    chunk = TIMEOUT_RECOVERY_CHUNK,
                    "explorer query timeout, re-enqueueing range in chunks"
                );
                let range = BlockRange::new(from_block, to_block);
                match self
                    .state
                    .scheduler
                    .schedule_with_chunk(&job.address, &[range], TIMEOUT_RECOVERY_CHUNK)
                    .await
                {
                    Ok(_) => {
                        if let Err(e) = queue::complete(&self.state.db_pool, &job.job_key).await {
                            error!(job = %job.job_key, error = %e, "failed to mark job completed");
                        }
                    }
                    Err(requeue_err) => {
                        error!(job = %job.job_key, error = %requeue_err, "chunk re-enqueue failed");
                        self.fail(&job, &requeue_err).await;
                    }
                }
            }
            Err(e) => {
                warn!(job = %job.job_key, attempts = job.attempts + 1, error = %e, "gap job failed");
                self.fail(&job, &e).await;
            }
        }
    }

    async fn fail(&self, job: &GapJob, cause: &ServiceError) {
        if let Err(e) = queue::fail(
            &self.state.db_pool,
            job,
            &cause.to_string(),
            self.state.config.job_retry_attempts,
            self.state.config.job_retry_backoff_base_ms,
        )
        .await
        {
            error!(job = %job.job_key, error = %e, "failed to record job failure");
        }
    }
}

pub struct GapOutcome {
    /// Highest block actually materialized; coverage extends to here.
    pub actual_end: i64,
    pub transactions: usize,
    /// Unprocessed tail when the batch limit cut the range short.
    pub remainder: Option<BlockRange>,
}

/// Materialize one gap: fetch page by page from the explorer, then commit
/// all rows plus one coverage row atomically. May cover less than requested
/// (the remainder goes back to the scheduler); never covers more.
pub async fn process_gap(
    state: &AppState,
    address: &str,
    from_block: u64,
    to_block: u64,
) -> Result<GapOutcome, ServiceError> {
    let batch_limit = state.config.max_tx_per_batch;

    let mut current_start = from_block;
    let mut actual_end: i64 = from_block as i64 - 1;
    let mut iterations = 0u32;
    let mut buf: Vec<Transaction> = Vec::new();

    while current_start <= to_block && iterations <= MAX_FETCH_ITERATIONS {
        info!(
            phase = "fetching",
            page = iterations + 1,
            current_block = current_start,
            target_block = to_block,
            address,
            "gap fetch progress"
        );

        let entries = state
            .explorer
            .txlist(
                address,
                current_start,
                to_block,
                1,
                batch_limit as u32,
                SortOrder::Asc,
            )
            .await?;

        if entries.is_empty() {
            actual_end = to_block as i64;
            break;
        }

        let batch_full = entries.len() >= batch_limit;
        let rows: Vec<Transaction> = entries
            .into_iter()
            .map(|e| e.into_transaction(address))
            .collect::<Result<_, _>>()?;
        // Ascending order: the last row carries the highest block seen.
        let last_block = rows.last().map(|t| t.block_number).unwrap_or(actual_end);

        buf.extend(
            rows.into_iter()
                .filter(|t| t.block_number >= current_start as i64 && t.block_number <= to_block as i64),
        );

        if batch_full {
            // The boundary block may have been truncated by the batch limit,
            // so coverage stops just short of it and the next page re-scans
            // it; duplicates collapse on insert.
            actual_end = actual_end.max(last_block - 1);
            current_start = (last_block - 1).max(0) as u64;
            iterations += 1;
        } else {
            actual_end = to_block as i64;
            break;
        }
    }

    info!(
        phase = "saving",
        transactions = buf.len(),
        blocks_processed = (actual_end - from_block as i64 + 1).max(0),
        total_blocks = to_block - from_block + 1,
        address,
        "gap save progress"
    );

    if actual_end >= from_block as i64 {
        db::transaction::insert_with_coverage(
            &state.db_pool,
            &buf,
            address,
            from_block,
            actual_end as u64,
        )
        .await?;
    }

    let remainder = if actual_end < to_block as i64 {
        Some(BlockRange::new((actual_end + 1) as u64, to_block))
    } else {
        None
    };

    Ok(GapOutcome {
        actual_end,
        transactions: buf.len(),
        remainder,
    })
}
