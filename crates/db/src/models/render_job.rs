//! Render job entity and DTOs.

use rendertrack_core::job_state::JobState;
use rendertrack_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `render_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RenderJob {
    pub id: DbId,
    /// Identifier assigned by the render service.
    pub uid: String,
    #[sqlx(try_from = "String")]
    pub state: JobState,
    pub progress: f64,
    pub job_type: String,
    pub submitted_by: Option<String>,
    /// Job description as forwarded to the render service.
    pub job_spec: serde_json::Value,
    pub output_path: Option<String>,
    pub extra_params: serde_json::Value,
    pub restart_of_uid: Option<String>,
    pub submitted_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a job that the render service has accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRenderJob {
    pub job_type: String,
    pub job_spec: serde_json::Value,
    pub output_path: Option<String>,
    pub submitted_by: Option<String>,
    pub extra_params: Option<serde_json::Value>,
}

/// Query parameters for `GET /api/v1/renders`.
#[derive(Debug, Default, Deserialize)]
pub struct RenderJobListQuery {
    pub submitted_by: Option<String>,
    pub state: Option<JobState>,
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Row count per state, for the admin summary.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StateCount {
    pub state: String,
    pub count: i64,
}
