use std::sync::Arc;

use rendertrack_render::RenderServiceApi;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: rendertrack_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Client for the render service (submission, restart, status pass-through).
    pub render_api: Arc<RenderServiceApi>,
}
