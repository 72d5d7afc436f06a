//! Durable queue and scheduler tests: dedup on job keys, claim ordering,
//! retry backoff, and tail pruning.

use std::time::Duration;

use crate::db::connection;
use crate::jobs::{self, queue, status, GapScheduler, PlannedJob};
use crate::models::BlockRange;

const ADDR: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";

fn planned(from: u64, to: u64, current: u32, total: u32, priority: i64) -> PlannedJob {
    PlannedJob {
        address: ADDR.to_string(),
        range: BlockRange::new(from, to),
        total_jobs: total,
        current_job: current,
        priority,
        delay: Duration::ZERO,
    }
}

#[tokio::test]
async fn enqueue_collapses_duplicate_job_keys() {
    let pool = connection::connect_in_memory().await;

    let jobs = vec![planned(0, 100, 0, 2, 10), planned(200, 300, 1, 2, 10)];
    assert_eq!(queue::enqueue_all(&pool, &jobs).await.unwrap(), 2);

    // Submitting the same gaps again inserts nothing.
    assert_eq!(queue::enqueue_all(&pool, &jobs).await.unwrap(), 0);
    assert_eq!(
        queue::count_by_status(&pool, status::PENDING).await.unwrap(),
        2
    );
}

#[tokio::test]
async fn claim_prefers_high_priority_then_earliest() {
    let pool = connection::connect_in_memory().await;

    let jobs = vec![
        planned(0, 100_000, 0, 3, 1),
        planned(200_000, 200_050, 1, 3, 10),
        planned(300_000, 300_500, 2, 3, 5),
    ];
    queue::enqueue_all(&pool, &jobs).await.unwrap();

    let first = queue::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(first.priority, 10);
    assert_eq!(first.status, status::RUNNING);

    let second = queue::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(second.priority, 5);

    let third = queue::claim_next(&pool).await.unwrap().unwrap();
    assert_eq!(third.priority, 1);

    // Everything is claimed; the queue is dry.
    assert!(queue::claim_next(&pool).await.unwrap().is_none());
}

#[tokio::test]
async fn staggered_jobs_are_not_due_yet() {
    let pool = connection::connect_in_memory().await;

    let mut job = planned(0, 100, 0, 1, 10);
    job.delay = Duration::from_secs(3600);
    queue::enqueue_all(&pool, &[job]).await.unwrap();

    assert!(queue::claim_next(&pool).await.unwrap().is_none());
    assert_eq!(
        queue::count_by_status(&pool, status::PENDING).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn failed_jobs_back_off_then_park() {
    let pool = connection::connect_in_memory().await;

    queue::enqueue_all(&pool, &[planned(0, 100, 0, 1, 10)]).await.unwrap();
    let job = queue::claim_next(&pool).await.unwrap().unwrap();

    // First two failures send the job back to pending with growing run_at.
    queue::fail(&pool, &job, "boom", 3, 2_000).await.unwrap();
    assert_eq!(
        queue::count_by_status(&pool, status::PENDING).await.unwrap(),
        1
    );
    // Backoff pushes run_at into the future, so it is not yet claimable.
    assert!(queue::claim_next(&pool).await.unwrap().is_none());

    let mut retried = job.clone();
    retried.attempts = 1;
    queue::fail(&pool, &retried, "boom again", 3, 2_000).await.unwrap();
    assert_eq!(
        queue::count_by_status(&pool, status::PENDING).await.unwrap(),
        1
    );

    // Third failure exhausts the attempt budget and parks the job.
    retried.attempts = 2;
    queue::fail(&pool, &retried, "gave up", 3, 2_000).await.unwrap();
    assert_eq!(
        queue::count_by_status(&pool, status::FAILED).await.unwrap(),
        1
    );
    assert_eq!(
        queue::count_by_status(&pool, status::PENDING).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn completed_tail_is_pruned() {
    let pool = connection::connect_in_memory().await;

    let jobs: Vec<PlannedJob> = (0..queue::KEEP_COMPLETED as u64 + 20)
        .map(|i| planned(i * 10, i * 10 + 5, i as u32, 1, 10))
        .collect();
    queue::enqueue_all(&pool, &jobs).await.unwrap();

    for job in &jobs {
        queue::complete(&pool, &job.job_key()).await.unwrap();
    }
    queue::prune_finished(&pool).await.unwrap();

    let remaining = queue::count_by_status(&pool, status::COMPLETED).await.unwrap();
    assert_eq!(remaining, queue::KEEP_COMPLETED);
}

#[tokio::test]
async fn scheduler_splits_and_bulk_enqueues() {
    let pool = connection::connect_in_memory().await;
    let scheduler = GapScheduler::new(pool.clone(), 5_000);

    // A single small gap plus a large one that splits into three jobs.
    let inserted = scheduler
        .schedule_gaps(ADDR, &[BlockRange::new(100, 200), BlockRange::new(0, 12_000)])
        .await
        .unwrap();
    assert_eq!(inserted, 4);

    // Re-scheduling the same gaps collapses on the deterministic keys.
    let inserted = scheduler
        .schedule_gaps(ADDR, &[BlockRange::new(100, 200)])
        .await
        .unwrap();
    assert_eq!(inserted, 0);
}

#[tokio::test]
async fn timeout_recovery_chunks_enqueue_via_scheduler() {
    let pool = connection::connect_in_memory().await;
    let scheduler = GapScheduler::new(pool.clone(), 5_000);

    // The worker's recovery path re-submits the refused range in 1000-block
    // chunks through the same scheduler entry point.
    let inserted = scheduler
        .schedule_with_chunk(ADDR, &[BlockRange::new(0, 4_999)], 1_000)
        .await
        .unwrap();
    assert_eq!(inserted, 5);

    let planned = jobs::plan_jobs(ADDR, &[BlockRange::new(0, 4_999)], 1_000);
    assert!(planned.iter().all(|j| j.range.len() <= 1_000));
}
