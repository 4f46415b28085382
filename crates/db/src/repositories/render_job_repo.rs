//! Repository for the `render_jobs` table.
//!
//! Reconciliation writes are guarded on the row still being in a
//! non-terminal state, so a concurrent soft-delete or restart is never
//! overwritten. Administrative writes go through [`RenderJobRepo::soft_delete`]
//! and [`RenderJobRepo::restart`].

use rendertrack_core::job_state::JobState;
use sqlx::PgPool;

use crate::models::render_job::{CreateRenderJob, RenderJob, RenderJobListQuery, StateCount};

/// Column list for `render_jobs` queries.
const COLUMNS: &str = "\
    id, uid, state, progress, job_type, submitted_by, job_spec, \
    output_path, extra_params, restart_of_uid, \
    submitted_at, created_at, updated_at";

/// Maximum page size for job listing.
const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
const DEFAULT_LIMIT: i64 = 50;

/// States an administrative transition may start from. Rows already
/// soft-deleted or replaced by a restart are left alone.
const ADMIN_MUTABLE_STATES: [JobState; 5] = [
    JobState::Queued,
    JobState::Rendering,
    JobState::Unknown,
    JobState::Done,
    JobState::Error,
];

fn state_strs(states: &[JobState]) -> Vec<&'static str> {
    states.iter().map(|s| s.as_str()).collect()
}

/// Provides persistence operations for render jobs.
pub struct RenderJobRepo;

impl RenderJobRepo {
    /// Record a job the render service has accepted under `uid`.
    ///
    /// The job starts `queued` with zero progress. When an output path is
    /// given it is mirrored into `extra_params.output_path`.
    pub async fn create(
        pool: &PgPool,
        uid: &str,
        input: &CreateRenderJob,
    ) -> Result<RenderJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO render_jobs \
                 (uid, state, progress, job_type, submitted_by, job_spec, \
                  output_path, extra_params) \
             VALUES ($1, $2, 0, $3, $4, $5, $6, \
                 COALESCE($7, '{{}}'::jsonb) \
                 || jsonb_build_object('progress', 0) \
                 || CASE WHEN $6::text IS NULL THEN '{{}}'::jsonb \
                         ELSE jsonb_build_object('output_path', $6::text) END) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RenderJob>(&query)
            .bind(uid)
            .bind(JobState::Queued.as_str())
            .bind(&input.job_type)
            .bind(&input.submitted_by)
            .bind(&input.job_spec)
            .bind(&input.output_path)
            .bind(&input.extra_params)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its render-service uid.
    pub async fn find_by_uid(pool: &PgPool, uid: &str) -> Result<Option<RenderJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM render_jobs WHERE uid = $1");
        sqlx::query_as::<_, RenderJob>(&query)
            .bind(uid)
            .fetch_optional(pool)
            .await
    }

    /// Uids of every job the reconciler should still poll.
    pub async fn list_non_terminal_uids(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT uid FROM render_jobs WHERE state = ANY($1) ORDER BY submitted_at ASC, id ASC",
        )
        .bind(JobState::non_terminal_strs())
        .fetch_all(pool)
        .await
    }

    /// Write a reconciliation result for one job.
    ///
    /// Sets `state` and `progress`, replaces `output_path` only when one is
    /// given, and merges both into `extra_params` leaving other keys intact.
    /// Returns `false` when the job is missing or already terminal.
    pub async fn apply_reconciliation(
        pool: &PgPool,
        uid: &str,
        state: JobState,
        progress: f64,
        output_path: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE render_jobs \
             SET state = $2, \
                 progress = $3, \
                 output_path = COALESCE($4, output_path), \
                 extra_params = extra_params \
                     || jsonb_build_object('progress', $3::float8) \
                     || CASE WHEN $4::text IS NULL THEN '{}'::jsonb \
                             ELSE jsonb_build_object('output_path', $4::text) END \
             WHERE uid = $1 AND state = ANY($5)",
        )
        .bind(uid)
        .bind(state.as_str())
        .bind(progress)
        .bind(output_path)
        .bind(JobState::non_terminal_strs())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete a job. The row is kept for history.
    ///
    /// Returns `false` if the job is missing, already deleted, or restarted.
    pub async fn soft_delete(pool: &PgPool, uid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE render_jobs SET state = $2 WHERE uid = $1 AND state = ANY($3)",
        )
        .bind(uid)
        .bind(JobState::Deleted.as_str())
        .bind(state_strs(&ADMIN_MUTABLE_STATES))
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace `old_uid` with a freshly submitted job `new_uid`.
    ///
    /// In one transaction: marks the old row `restarted`, then inserts a
    /// new `queued` row copying its type, submitter, spec, output path and
    /// extra params (with progress reset to zero) and pointing back via
    /// `restart_of_uid`. Returns `None` if the old row is missing, deleted
    /// or already restarted.
    pub async fn restart(
        pool: &PgPool,
        old_uid: &str,
        new_uid: &str,
    ) -> Result<Option<RenderJob>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let marked = sqlx::query(
            "UPDATE render_jobs SET state = $2 WHERE uid = $1 AND state = ANY($3)",
        )
        .bind(old_uid)
        .bind(JobState::Restarted.as_str())
        .bind(state_strs(&ADMIN_MUTABLE_STATES))
        .execute(&mut *tx)
        .await?;

        if marked.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let query = format!(
            "INSERT INTO render_jobs \
                 (uid, state, progress, job_type, submitted_by, job_spec, \
                  output_path, extra_params, restart_of_uid) \
             SELECT $1, $2, 0, job_type, submitted_by, job_spec, output_path, \
                    extra_params || jsonb_build_object('progress', 0), uid \
             FROM render_jobs WHERE uid = $3 \
             RETURNING {COLUMNS}"
        );
        let created = sqlx::query_as::<_, RenderJob>(&query)
            .bind(new_uid)
            .bind(JobState::Queued.as_str())
            .bind(old_uid)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(created))
    }

    /// List jobs, newest first, with optional submitter/state filters and
    /// pagination.
    pub async fn list(
        pool: &PgPool,
        params: &RenderJobListQuery,
    ) -> Result<Vec<RenderJob>, sqlx::Error> {
        let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = params.offset.unwrap_or(0).max(0);

        // Build the WHERE clause and track the next bind parameter index.
        let mut conditions: Vec<String> = Vec::new();
        let mut bind_idx: u32 = 1;

        if params.submitted_by.is_some() {
            conditions.push(format!("submitted_by = ${bind_idx}"));
            bind_idx += 1;
        }

        if params.state.is_some() {
            conditions.push(format!("state = ${bind_idx}"));
            bind_idx += 1;
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let query = format!(
            "SELECT {COLUMNS} FROM render_jobs \
             {where_clause} \
             ORDER BY id DESC \
             LIMIT ${bind_idx} OFFSET ${}",
            bind_idx + 1,
        );

        let mut q = sqlx::query_as::<_, RenderJob>(&query);

        if let Some(submitter) = &params.submitted_by {
            q = q.bind(submitter);
        }
        if let Some(state) = params.state {
            q = q.bind(state.as_str());
        }

        q = q.bind(limit).bind(offset);

        q.fetch_all(pool).await
    }

    /// Number of jobs in each state (states with no jobs are omitted).
    pub async fn count_by_state(pool: &PgPool) -> Result<Vec<StateCount>, sqlx::Error> {
        sqlx::query_as::<_, StateCount>(
            "SELECT state, COUNT(*) AS count FROM render_jobs GROUP BY state ORDER BY state",
        )
        .fetch_all(pool)
        .await
    }
}
