//! HTTP client for the external render service.
//!
//! The render service is a nexrender-style job server: jobs are submitted
//! as JSON descriptions and polled by the uid it assigns.

pub mod api;

pub use api::{RenderApiError, RenderServiceApi, RenderServiceConfig};
