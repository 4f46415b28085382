//! Render job status reconciler.
//!
//! A single background loop polls the render service for every in-flight
//! job, normalizes whatever evidence is available (upstream status,
//! elapsed time, artifact on disk) and writes the canonical state back to
//! the job store. The three evidence sources are traits so the loop can be
//! driven without a database or a live render service.

pub mod evidence;
pub mod reconciler;
pub mod store;

pub use evidence::{ArtifactProbe, FsArtifactProbe, RenderStatusSource};
pub use reconciler::{Reconciler, ReconcilerConfig, TickSummary};
pub use store::{JobRecord, JobStore, PgJobStore, RecordUpdate, StoreError};
