//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod render_job_repo;

pub use render_job_repo::RenderJobRepo;
