//! Evidence sources consulted by the reconciler besides the job store.
//!
//! Both sources swallow their own failures: an unreachable render service
//! or an unreadable file is simply absent evidence for this tick.

use std::io::ErrorKind;

use async_trait::async_trait;
use rendertrack_core::normalizer::StatusPayload;
use rendertrack_render::RenderServiceApi;

/// Status-by-uid query against the render service.
#[async_trait]
pub trait RenderStatusSource: Send + Sync {
    /// Current status of `uid`, or `None` if the service failed, answered
    /// non-2xx, or returned an empty or malformed body.
    async fn fetch_status(&self, uid: &str) -> Option<StatusPayload>;
}

#[async_trait]
impl RenderStatusSource for RenderServiceApi {
    async fn fetch_status(&self, uid: &str) -> Option<StatusPayload> {
        let body = match self.get_job(uid).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(uid, error = %e, "Render status unavailable");
                return None;
            }
        };
        tracing::trace!(uid, body = %body, "Render status received");

        let payload = StatusPayload::from_json(&body);
        if payload.is_none() {
            tracing::warn!(uid, body = %body, "Render status body is not an object");
        }
        payload
    }
}

/// Size lookup for rendered artifacts.
#[async_trait]
pub trait ArtifactProbe: Send + Sync {
    /// Size in bytes of the regular file at `path`, `None` if absent.
    async fn stat_size(&self, path: &str) -> Option<u64>;
}

/// [`ArtifactProbe`] over the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactProbe;

#[async_trait]
impl ArtifactProbe for FsArtifactProbe {
    async fn stat_size(&self, path: &str) -> Option<u64> {
        if path.is_empty() {
            return None;
        }
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => Some(meta.len()),
            Ok(_) => None,
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path, error = %e, "Failed to stat render artifact");
                None
            }
        }
    }
}
