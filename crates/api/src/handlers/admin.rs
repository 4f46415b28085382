//! Handlers for administrative summaries.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use rendertrack_db::repositories::RenderJobRepo;
use serde::Serialize;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// Payload of `GET /api/v1/admin/stats`.
#[derive(Debug, Serialize)]
pub struct RenderStats {
    pub total_renders: i64,
    /// Count per state; states with no rows are omitted.
    pub by_state: BTreeMap<String, i64>,
}

/// GET /api/v1/admin/stats
pub async fn render_stats(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let counts = RenderJobRepo::count_by_state(&state.pool).await?;

    let total_renders = counts.iter().map(|c| c.count).sum();
    let by_state = counts.into_iter().map(|c| (c.state, c.count)).collect();

    Ok(Json(DataResponse {
        data: RenderStats {
            total_renders,
            by_state,
        },
    }))
}
