//! Route definitions for the `/renders` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::renders;
use crate::state::AppState;

/// Routes mounted at `/renders`.
///
/// ```text
/// GET    /                   -> list_renders
/// POST   /                   -> submit_render
/// GET    /{uid}              -> get_render
/// GET    /{uid}/upstream     -> get_upstream_status
/// POST   /{uid}/delete       -> delete_render
/// POST   /{uid}/restart      -> restart_render
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(renders::list_renders).post(renders::submit_render))
        .route("/{uid}", get(renders::get_render))
        .route("/{uid}/upstream", get(renders::get_upstream_status))
        .route("/{uid}/delete", post(renders::delete_render))
        .route("/{uid}/restart", post(renders::restart_render))
}
