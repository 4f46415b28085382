//! Status normalizer: maps one evidence snapshot for a render job to a
//! canonical `(JobState, progress, output path)` triple.
//!
//! Evidence is considered in priority order:
//!
//! 1. The upstream status payload, when the render service answered.
//! 2. Elapsed time since submission, when it did not. Fresh jobs may not
//!    be registered upstream yet, so nothing is decided during the grace
//!    period.
//! 3. The artifact on disk, once the grace period has passed. A file larger
//!    than the plausibility threshold means the render finished; anything
//!    else is treated as failure.
//!
//! Everything here is pure and deterministic.

use std::time::Duration;

use serde_json::Value;

use crate::job_state::JobState;
use crate::progress::ProgressValue;

/// Default grace period before missing upstream data counts against a job.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(90);

/// Default minimum artifact size (1 MiB) accepted as a finished render.
pub const DEFAULT_MIN_ARTIFACT_BYTES: u64 = 1024 * 1024;

/// Upstream label prefix used for in-progress render stages (e.g. `render:dorender`).
pub const RENDER_STAGE_PREFIX: &str = "render:";

// ---------------------------------------------------------------------------
// Evidence
// ---------------------------------------------------------------------------

/// Typed view of one upstream status body.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusPayload {
    /// Free-form state label, e.g. `queued`, `render:dorender`, `finished`.
    pub state: Option<String>,
    /// Render progress with its unit resolved.
    pub progress: ProgressValue,
    /// Output location reported by the render service.
    pub output: Option<String>,
}

impl StatusPayload {
    /// Decode a status body, tolerating missing or mistyped fields.
    ///
    /// Returns `None` when the body is not a JSON object, which callers
    /// treat as absent evidence. Progress is read from `renderProgress`,
    /// falling back to `progress`.
    pub fn from_json(body: &Value) -> Option<Self> {
        let obj = body.as_object()?;

        let state = obj.get("state").and_then(Value::as_str).map(str::to_owned);

        let progress = ["renderProgress", "progress"]
            .iter()
            .filter_map(|key| obj.get(*key))
            .find(|v| !v.is_null())
            .map_or(ProgressValue::Missing, ProgressValue::from_json);

        let output = obj
            .get("output")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        Some(Self {
            state,
            progress,
            output,
        })
    }
}

/// Everything known about a job at one reconciliation tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Evidence {
    /// The render service answered with a usable body.
    Upstream(StatusPayload),
    /// The render service was unreachable, failed, or answered with an
    /// empty/malformed body.
    Absent {
        /// Time since the job was submitted.
        elapsed: Duration,
        /// Size of the file at the job's output path, if it exists.
        artifact_size: Option<u64>,
    },
}

// ---------------------------------------------------------------------------
// Policy and result
// ---------------------------------------------------------------------------

/// Tunable thresholds for the absent-upstream fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizerPolicy {
    pub grace_period: Duration,
    /// Artifacts must be strictly larger than this to count as finished.
    pub min_artifact_bytes: u64,
}

impl Default for NormalizerPolicy {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            min_artifact_bytes: DEFAULT_MIN_ARTIFACT_BYTES,
        }
    }
}

impl NormalizerPolicy {
    /// Whether a job submitted `elapsed` ago is still too fresh to judge.
    pub fn within_grace(&self, elapsed: Duration) -> bool {
        elapsed < self.grace_period
    }
}

/// Canonical outcome for one job.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub state: JobState,
    /// Fraction in `[0, 1]`; exactly `1.0` when `state` is `Done`.
    pub progress: f64,
    /// Output location confirmed by the evidence, if any.
    pub output_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize one evidence snapshot.
///
/// Returns `None` when no state change should be emitted this tick.
pub fn normalize(evidence: &Evidence, policy: &NormalizerPolicy) -> Option<Normalized> {
    match evidence {
        Evidence::Upstream(payload) => Some(normalize_upstream(payload)),
        Evidence::Absent {
            elapsed,
            artifact_size,
        } => normalize_absent(*elapsed, *artifact_size, policy),
    }
}

/// Derive state and progress from an upstream payload.
///
/// Numeric progress wins over the label: complete progress means `done`
/// and any positive progress means `rendering`. The label is consulted
/// only when progress is zero or missing.
pub fn normalize_upstream(payload: &StatusPayload) -> Normalized {
    let progress = payload.progress.as_fraction();

    let (state, progress) = if progress >= 1.0 {
        (JobState::Done, 1.0)
    } else if progress > 0.0 {
        (JobState::Rendering, progress)
    } else {
        match map_label(payload.state.as_deref().unwrap_or_default()) {
            JobState::Done => (JobState::Done, 1.0),
            other => (other, 0.0),
        }
    };

    Normalized {
        state,
        progress,
        output_path: payload.output.clone(),
    }
}

/// Map an upstream state label to a canonical state.
pub fn map_label(label: &str) -> JobState {
    match label {
        "queued" | "created" => JobState::Queued,
        "finished" => JobState::Done,
        "errored" | "failed" | "canceled" => JobState::Error,
        "picked" | "started" => JobState::Rendering,
        l if l.len() > RENDER_STAGE_PREFIX.len() && l.starts_with(RENDER_STAGE_PREFIX) => {
            JobState::Rendering
        }
        _ => JobState::Unknown,
    }
}

fn normalize_absent(
    elapsed: Duration,
    artifact_size: Option<u64>,
    policy: &NormalizerPolicy,
) -> Option<Normalized> {
    if policy.within_grace(elapsed) {
        return None;
    }

    let finished = artifact_size.is_some_and(|size| size > policy.min_artifact_bytes);
    let (state, progress) = if finished {
        (JobState::Done, 1.0)
    } else {
        (JobState::Error, 0.0)
    };

    Some(Normalized {
        state,
        progress,
        output_path: None,
    })
}
