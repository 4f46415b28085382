#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use http_body_util::BodyExt;
use rendertrack_api::config::ServerConfig;
use rendertrack_api::router::build_app_router;
use rendertrack_api::state::AppState;
use rendertrack_reconciler::ReconcilerConfig;
use rendertrack_render::{RenderServiceApi, RenderServiceConfig};
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

/// Address nothing listens on, for tests that must not reach a render service.
pub const UNREACHABLE_RENDER_SERVICE: &str = "http://127.0.0.1:1";

/// Build a test `ServerConfig` pointing at `render_base_url`.
pub fn test_config(render_base_url: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        render_service: RenderServiceConfig {
            base_url: render_base_url.to_string(),
            secret: None,
            timeout: Duration::from_secs(2),
        },
        reconciler: ReconcilerConfig::default(),
    }
}

/// Build the full application router against an unreachable render service.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_render(pool, UNREACHABLE_RENDER_SERVICE)
}

/// Build the full application router against the render service at
/// `render_base_url`, with the production middleware stack.
pub fn build_test_app_with_render(pool: PgPool, render_base_url: &str) -> Router {
    let config = test_config(render_base_url);
    let render_api = RenderServiceApi::new(config.render_service.clone()).unwrap();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        render_api: Arc::new(render_api),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post(app: Router, uri: &str) -> Response {
    app.oneshot(Request::post(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response {
    app.oneshot(
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fake render service
// ---------------------------------------------------------------------------

/// Handle to a throwaway render service on a random local port.
///
/// Accepted jobs get uids `job-1`, `job-2`, ... A job spec whose
/// `template.composition` is `"REJECT"` is answered with 500. Status of
/// any `job-*` uid is reported as rendering at 50%.
#[derive(Clone)]
pub struct FakeRenderService {
    pub addr: SocketAddr,
    submissions: Arc<AtomicUsize>,
}

impl FakeRenderService {
    pub async fn spawn() -> Self {
        let submissions = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/api/v1/jobs", axum::routing::post(create_job))
            .route("/api/v1/jobs/{uid}", axum::routing::get(get_job))
            .with_state(Arc::clone(&submissions));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, submissions }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of jobs accepted so far.
    pub fn submissions(&self) -> usize {
        self.submissions.load(Ordering::SeqCst)
    }
}

async fn create_job(
    State(submissions): State<Arc<AtomicUsize>>,
    Json(spec): Json<Value>,
) -> Response {
    if spec["template"]["composition"] == "REJECT" {
        return (StatusCode::INTERNAL_SERVER_ERROR, "composition not found").into_response();
    }
    let n = submissions.fetch_add(1, Ordering::SeqCst) + 1;
    (
        StatusCode::CREATED,
        Json(json!({"uid": format!("job-{n}"), "state": "queued"})),
    )
        .into_response()
}

async fn get_job(Path(uid): Path<String>) -> Response {
    if uid.starts_with("job-") {
        Json(json!({"uid": uid, "state": "render:dorender", "renderProgress": 50})).into_response()
    } else {
        (StatusCode::NOT_FOUND, "job not found").into_response()
    }
}
