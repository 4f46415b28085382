//! Job record store seam.
//!
//! The reconciler only needs to list in-flight uids, read one record and
//! write one result back. Locking and atomicity are the store's concern:
//! every write is a single statement keyed by `uid`.

use async_trait::async_trait;
use rendertrack_core::job_state::JobState;
use rendertrack_core::types::Timestamp;
use rendertrack_db::models::render_job::RenderJob;
use rendertrack_db::repositories::RenderJobRepo;
use rendertrack_db::DbPool;

/// Errors surfaced by a [`JobStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A database query failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The slice of a job record the reconciler reads.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub uid: String,
    pub state: JobState,
    pub progress: f64,
    pub submitted_at: Timestamp,
    /// Where the rendered artifact is expected.
    pub output_path: Option<String>,
}

impl From<RenderJob> for JobRecord {
    fn from(job: RenderJob) -> Self {
        let output_path = job.output_path.or_else(|| {
            job.extra_params
                .get("output_path")
                .and_then(serde_json::Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        });
        Self {
            uid: job.uid,
            state: job.state,
            progress: job.progress,
            submitted_at: job.submitted_at,
            output_path,
        }
    }
}

/// Fields written back after one reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub state: JobState,
    pub progress: f64,
    /// Replaces the stored output path when `Some`.
    pub output_path: Option<String>,
}

/// Durable store of job records.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Uids of every job in a non-terminal state.
    async fn list_non_terminal_uids(&self) -> Result<Vec<String>, StoreError>;

    /// Load one record, `None` if no such uid exists.
    async fn get_record(&self, uid: &str) -> Result<Option<JobRecord>, StoreError>;

    /// Atomically write `update` for `uid`, leaving unrelated fields alone.
    ///
    /// Returns `false` when the record no longer exists or has meanwhile
    /// reached a terminal state; nothing is written in that case.
    async fn update_record(&self, uid: &str, update: &RecordUpdate) -> Result<bool, StoreError>;
}

/// [`JobStore`] backed by the `render_jobs` table.
#[derive(Clone)]
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn list_non_terminal_uids(&self) -> Result<Vec<String>, StoreError> {
        Ok(RenderJobRepo::list_non_terminal_uids(&self.pool).await?)
    }

    async fn get_record(&self, uid: &str) -> Result<Option<JobRecord>, StoreError> {
        let job = RenderJobRepo::find_by_uid(&self.pool, uid).await?;
        Ok(job.map(JobRecord::from))
    }

    async fn update_record(&self, uid: &str, update: &RecordUpdate) -> Result<bool, StoreError> {
        let written = RenderJobRepo::apply_reconciliation(
            &self.pool,
            uid,
            update.state,
            update.progress,
            update.output_path.as_deref(),
        )
        .await?;
        Ok(written)
    }
}
