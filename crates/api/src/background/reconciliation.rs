//! Render job reconciliation against the live render service.
//!
//! Wires the Postgres job store, the render service client and the local
//! filesystem into a [`Reconciler`] and runs it until cancelled.

use std::sync::Arc;

use rendertrack_db::DbPool;
use rendertrack_reconciler::{FsArtifactProbe, PgJobStore, Reconciler, ReconcilerConfig};
use rendertrack_render::RenderServiceApi;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Build the production reconciler.
pub fn build(
    pool: DbPool,
    render_api: Arc<RenderServiceApi>,
    config: ReconcilerConfig,
) -> Reconciler {
    Reconciler::new(
        Arc::new(PgJobStore::new(pool)),
        render_api,
        Arc::new(FsArtifactProbe),
        config,
    )
}

/// Spawn the reconciliation loop. It stops when `cancel` is triggered.
pub fn spawn(
    pool: DbPool,
    render_api: Arc<RenderServiceApi>,
    config: ReconcilerConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let reconciler = build(pool, render_api, config);
    tokio::spawn(async move {
        reconciler.run(cancel).await;
    })
}
