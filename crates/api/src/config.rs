use std::str::FromStr;
use std::time::Duration;

use rendertrack_core::normalizer::NormalizerPolicy;
use rendertrack_reconciler::ReconcilerConfig;
use rendertrack_render::RenderServiceConfig;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8080`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Render service location, shared secret and per-request timeout.
    pub render_service: RenderServiceConfig,
    /// Reconciliation loop tunables.
    pub reconciler: ReconcilerConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                    |
    /// |--------------------------------|----------------------------|
    /// | `HOST`                         | `0.0.0.0`                  |
    /// | `PORT`                         | `8080`                     |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                       |
    /// | `RENDER_SERVICE_URL`           | `http://localhost:3000`    |
    /// | `RENDER_SERVICE_SECRET`        | unset                      |
    /// | `RENDER_SERVICE_TIMEOUT_SECS`  | `5`                        |
    /// | `RECONCILE_INTERVAL_SECS`      | `2`                        |
    /// | `RECONCILE_GRACE_SECS`         | `90`                       |
    /// | `RECONCILE_MIN_ARTIFACT_BYTES` | `1048576`                  |
    /// | `RECONCILE_MAX_CONCURRENCY`    | `16`                       |
    ///
    /// Panics on unparseable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = env_parse("PORT", "8080");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = env_parse("REQUEST_TIMEOUT_SECS", "30");

        let render_service = RenderServiceConfig {
            base_url: std::env::var("RENDER_SERVICE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            secret: std::env::var("RENDER_SERVICE_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
            timeout: Duration::from_secs(env_parse("RENDER_SERVICE_TIMEOUT_SECS", "5")),
        };

        let reconciler = ReconcilerConfig {
            interval: Duration::from_secs(env_parse("RECONCILE_INTERVAL_SECS", "2")),
            upstream_timeout: render_service.timeout,
            max_concurrency: env_parse("RECONCILE_MAX_CONCURRENCY", "16"),
            policy: NormalizerPolicy {
                grace_period: Duration::from_secs(env_parse("RECONCILE_GRACE_SECS", "90")),
                min_artifact_bytes: env_parse("RECONCILE_MIN_ARTIFACT_BYTES", "1048576"),
            },
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            render_service,
            reconciler,
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: &str) -> T {
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.trim().parse().unwrap_or_else(|_| {
        panic!(
            "{key} must be a valid {}, got '{raw}'",
            std::any::type_name::<T>()
        )
    })
}
