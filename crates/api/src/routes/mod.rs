pub mod admin;
pub mod health;
pub mod renders;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /renders                         list, submit
/// /renders/{uid}                   get
/// /renders/{uid}/upstream          raw render service status
/// /renders/{uid}/delete            soft delete (POST)
/// /renders/{uid}/restart           resubmit (POST)
///
/// /admin/stats                     counts by state
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/renders", renders::router())
        .nest("/admin", admin::router())
}
