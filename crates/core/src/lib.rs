//! Domain types and pure logic for render-job tracking.
//!
//! Nothing in this crate performs I/O. The job-state model, the typed
//! progress value and the status normalizer live here so that both the
//! database layer and the reconciler can share them.

pub mod error;
pub mod job_state;
pub mod normalizer;
pub mod progress;
pub mod types;
