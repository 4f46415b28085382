//! REST client for the render service's job endpoints.
//!
//! Wraps job submission and status retrieval using [`reqwest`]. Status
//! bodies are returned as raw JSON because their shape varies between
//! deployments; typing happens in `rendertrack_core::normalizer`.

use std::time::Duration;

use serde_json::Value;

/// Header carrying the shared secret, when the server requires one.
pub const SECRET_HEADER: &str = "nexrender-secret";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for one render service.
#[derive(Debug, Clone)]
pub struct RenderServiceConfig {
    /// Base HTTP URL, e.g. `http://localhost:3000`.
    pub base_url: String,
    /// Optional shared secret sent as [`SECRET_HEADER`].
    pub secret: Option<String>,
    /// Upper bound on each request, connect included.
    pub timeout: Duration,
}

impl RenderServiceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            secret: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Errors from the render service REST layer.
#[derive(Debug, thiserror::Error)]
pub enum RenderApiError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The render service returned a non-2xx status code.
    #[error("Render service error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The render service answered 2xx with an empty body.
    #[error("Empty response from render service")]
    EmptyBody,

    /// The body was not valid JSON.
    #[error("Malformed response from render service: {0}")]
    Decode(#[from] serde_json::Error),

    /// A submission response carried no usable `uid`.
    #[error("No uid in submission response: {body}")]
    MissingUid { body: String },
}

/// HTTP client for a single render service.
#[derive(Debug, Clone)]
pub struct RenderServiceApi {
    client: reqwest::Client,
    base_url: String,
    secret: Option<String>,
}

impl RenderServiceApi {
    /// Build a client whose requests are bounded by `config.timeout`.
    pub fn new(config: RenderServiceConfig) -> Result<Self, RenderApiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(client, config))
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: RenderServiceConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret: config.secret,
        }
    }

    /// Submit a job description.
    ///
    /// Sends `POST /api/v1/jobs` and returns the uid the service assigned.
    pub async fn submit_job(&self, job_spec: &Value) -> Result<String, RenderApiError> {
        let response = self
            .authorize(self.client.post(self.jobs_url()))
            .json(job_spec)
            .send()
            .await?;

        let body = Self::read_json(response).await?;
        tracing::debug!(response = %body, "Render service accepted job");

        extract_uid(&body).ok_or_else(|| RenderApiError::MissingUid {
            body: body.to_string(),
        })
    }

    /// Fetch the raw status body of one job.
    ///
    /// Sends `GET /api/v1/jobs/{uid}`.
    pub async fn get_job(&self, uid: &str) -> Result<Value, RenderApiError> {
        let response = self
            .authorize(self.client.get(format!("{}/{uid}", self.jobs_url())))
            .send()
            .await?;

        Self::read_json(response).await
    }

    // ---- private helpers ----

    fn jobs_url(&self) -> String {
        format!("{}/api/v1/jobs", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.secret {
            Some(secret) => request.header(SECRET_HEADER, secret),
            None => request,
        }
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`RenderApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RenderApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RenderApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Read a successful response body as JSON, rejecting empty bodies.
    async fn read_json(response: reqwest::Response) -> Result<Value, RenderApiError> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(RenderApiError::EmptyBody);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Pull the job uid out of a submission response.
///
/// Accepts a non-empty string or a number (rendered as its decimal form).
pub fn extract_uid(body: &Value) -> Option<String> {
    match body.get("uid")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
