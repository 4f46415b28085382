use axum::routing::get;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(admin::render_stats))
}
