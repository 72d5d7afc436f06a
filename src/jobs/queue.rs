//! Durable queue operations over the `gap_jobs` table. At-least-once: a job
//! is only marked completed after its durable transaction commits, and
//! idempotent writes make re-execution safe.

use sqlx::{Pool, Sqlite};

use super::{status, GapJob, PlannedJob};
use crate::db;

/// How much of the finished tail to keep around for observability.
pub const KEEP_COMPLETED: i64 = 100;
pub const KEEP_FAILED: i64 = 500;

/// Bulk-enqueue planned jobs in one transaction. Duplicate job keys are
/// dropped by the queue, so re-submitting the same gaps is harmless.
/// Returns the number of newly inserted jobs.
pub async fn enqueue_all(pool: &Pool<Sqlite>, jobs: &[PlannedJob]) -> Result<u64, sqlx::Error> {
    if jobs.is_empty() {
        return Ok(0);
    }

    let now = db::now_millis();
    let mut inserted = 0u64;
    let mut tx = pool.begin().await?;

    for job in jobs {
        let result = sqlx::query(
            r#"
            INSERT INTO gap_jobs
                (job_key, address, from_block, to_block, total_jobs, current_job,
                 priority, status, attempts, run_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', 0, ?, ?, ?)
            ON CONFLICT(job_key) DO NOTHING
            "#,
        )
        .bind(job.job_key())
        .bind(&job.address)
        .bind(job.range.from_block as i64)
        .bind(job.range.to_block as i64)
        .bind(job.total_jobs as i64)
        .bind(job.current_job as i64)
        .bind(job.priority)
        .bind(now + job.delay.as_millis() as i64)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Claim the next due pending job: highest priority first, then earliest
/// run_at. The guarded UPDATE makes the claim atomic across workers.
pub async fn claim_next(pool: &Pool<Sqlite>) -> Result<Option<GapJob>, sqlx::Error> {
    sqlx::query_as::<_, GapJob>(
        r#"
        UPDATE gap_jobs
        SET status = 'running', updated_at = ?
        WHERE job_key = (
            SELECT job_key FROM gap_jobs
            WHERE status = 'pending' AND run_at <= ?
            ORDER BY priority DESC, run_at ASC
            LIMIT 1
        ) AND status = 'pending'
        RETURNING *
        "#,
    )
    .bind(db::now_millis())
    .bind(db::now_millis())
    .fetch_optional(pool)
    .await
}

pub async fn complete(pool: &Pool<Sqlite>, job_key: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE gap_jobs SET status = 'completed', updated_at = ? WHERE job_key = ?")
        .bind(db::now_millis())
        .bind(job_key)
        .execute(pool)
        .await?;
    Ok(())
}

/// Record a failed attempt. The job goes back to pending with exponential
/// backoff until the attempt budget runs out, then parks in the failed tail.
pub async fn fail(
    pool: &Pool<Sqlite>,
    job: &GapJob,
    error: &str,
    max_attempts: u32,
    backoff_base_ms: u64,
) -> Result<(), sqlx::Error> {
    let attempts = job.attempts + 1;
    let now = db::now_millis();

    if attempts >= max_attempts as i64 {
        sqlx::query(
            "UPDATE gap_jobs SET status = 'failed', attempts = ?, last_error = ?, updated_at = ? \
             WHERE job_key = ?",
        )
        .bind(attempts)
        .bind(error)
        .bind(now)
        .bind(&job.job_key)
        .execute(pool)
        .await?;
    } else {
        let backoff = backoff_base_ms.saturating_mul(1u64 << (attempts - 1).min(16) as u32);
        sqlx::query(
            "UPDATE gap_jobs SET status = 'pending', attempts = ?, last_error = ?, \
             run_at = ?, updated_at = ? WHERE job_key = ?",
        )
        .bind(attempts)
        .bind(error)
        .bind(now + backoff as i64)
        .bind(now)
        .bind(&job.job_key)
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// Trim the completed and failed tails so the queue table stays bounded.
pub async fn prune_finished(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    for (state, keep) in [(status::COMPLETED, KEEP_COMPLETED), (status::FAILED, KEEP_FAILED)] {
        sqlx::query(
            r#"
            DELETE FROM gap_jobs
            WHERE status = ? AND job_key NOT IN (
                SELECT job_key FROM gap_jobs
                WHERE status = ?
                ORDER BY updated_at DESC
                LIMIT ?
            )
            "#,
        )
        .bind(state)
        .bind(state)
        .bind(keep)
        .execute(pool)
        .await?;
    }
    Ok(())
}

pub async fn count_by_status(
    pool: &Pool<Sqlite>,
    state: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM gap_jobs WHERE status = ?")
        .bind(state)
        .fetch_one(pool)
        .await
}
