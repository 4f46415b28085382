//! Handlers for the `/renders` resource.
//!
//! Submission and restart talk to the render service first and only record
//! a job once it has been accepted upstream. State after that point is
//! owned by the reconciler, except for the administrative delete and
//! restart transitions below.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use rendertrack_core::error::CoreError;
use rendertrack_core::job_state::JobState;
use rendertrack_db::models::render_job::{CreateRenderJob, RenderJob, RenderJobListQuery};
use rendertrack_db::repositories::RenderJobRepo;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_render(pool: &sqlx::PgPool, uid: &str) -> AppResult<RenderJob> {
    RenderJobRepo::find_by_uid(pool, uid)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::NotFound {
                entity: "Render job",
                key: uid.to_string(),
            })
        })
}

fn ensure_admin_mutable(job: &RenderJob, action: &str) -> AppResult<()> {
    match job.state {
        JobState::Deleted | JobState::Restarted => Err(AppError::Core(CoreError::Conflict(
            format!("Cannot {action} a render job that is already {}", job.state),
        ))),
        _ => Ok(()),
    }
}

fn validate_submission(input: &CreateRenderJob) -> AppResult<()> {
    if input.job_type.trim().is_empty() {
        return Err(CoreError::Validation("job_type must not be empty".into()).into());
    }
    if !input.job_spec.is_object() {
        return Err(CoreError::Validation("job_spec must be a JSON object".into()).into());
    }
    if let Some(extra) = &input.extra_params {
        if !extra.is_object() {
            return Err(CoreError::Validation("extra_params must be a JSON object".into()).into());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/renders
///
/// Forward `job_spec` to the render service and record the accepted job
/// as `queued`. Returns 201 with the record, 502 if the render service
/// rejects or cannot be reached.
pub async fn submit_render(
    State(state): State<AppState>,
    Json(input): Json<CreateRenderJob>,
) -> AppResult<impl IntoResponse> {
    validate_submission(&input)?;

    let uid = state.render_api.submit_job(&input.job_spec).await?;
    let job = RenderJobRepo::create(&state.pool, &uid, &input).await?;

    tracing::info!(
        uid = %job.uid,
        job_type = %job.job_type,
        submitted_by = ?job.submitted_by,
        "Render job submitted",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// GET /api/v1/renders
///
/// Job history, newest first. Supports optional `submitted_by`, `state`,
/// `limit` and `offset` query parameters.
pub async fn list_renders(
    State(state): State<AppState>,
    Query(params): Query<RenderJobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = RenderJobRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/renders/{uid}
pub async fn get_render(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = find_render(&state.pool, &uid).await?;
    Ok(Json(DataResponse { data: job }))
}

/// GET /api/v1/renders/{uid}/upstream
///
/// Raw status body from the render service, unnormalized.
pub async fn get_upstream_status(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<impl IntoResponse> {
    let body = state.render_api.get_job(&uid).await?;
    Ok(Json(DataResponse { data: body }))
}

// ---------------------------------------------------------------------------
// Administrative transitions
// ---------------------------------------------------------------------------

/// POST /api/v1/renders/{uid}/delete
///
/// Soft-delete a job. Returns 204, or 409 if it is already deleted or
/// restarted.
pub async fn delete_render(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = find_render(&state.pool, &uid).await?;
    ensure_admin_mutable(&job, "delete")?;

    if !RenderJobRepo::soft_delete(&state.pool, &uid).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "Render job changed state before it could be deleted".into(),
        )));
    }

    tracing::info!(uid = %uid, from = %job.state, "Render job deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/renders/{uid}/restart
///
/// Resubmit the stored job description. The old record becomes
/// `restarted` and a new `queued` record points back to it. Returns 201
/// with the new record, 409 if the old one is already deleted or
/// restarted, 502 if the render service refuses the resubmission.
pub async fn restart_render(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job = find_render(&state.pool, &uid).await?;
    ensure_admin_mutable(&job, "restart")?;

    let new_uid = state.render_api.submit_job(&job.job_spec).await?;

    let Some(restarted) = RenderJobRepo::restart(&state.pool, &uid, &new_uid).await? else {
        tracing::warn!(
            uid = %uid,
            new_uid = %new_uid,
            "Render job changed state during restart, resubmitted job left untracked",
        );
        return Err(AppError::Core(CoreError::Conflict(
            "Render job changed state before it could be restarted".into(),
        )));
    };

    tracing::info!(uid = %uid, new_uid = %restarted.uid, "Render job restarted");
    Ok((StatusCode::CREATED, Json(DataResponse { data: restarted })))
}
