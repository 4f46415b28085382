//! Canonical render-job lifecycle states.
//!
//! Stored as lowercase TEXT in `render_jobs.state`; the string forms must
//! match the `ck_render_jobs_state` check constraint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle state of a render job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Rendering,
    Done,
    Error,
    Unknown,
    Restarted,
    Deleted,
}

impl JobState {
    /// States the reconciler keeps polling.
    pub const NON_TERMINAL: [JobState; 3] =
        [JobState::Queued, JobState::Rendering, JobState::Unknown];

    /// States the reconciler never reads or writes again.
    pub const TERMINAL: [JobState; 4] = [
        JobState::Done,
        JobState::Error,
        JobState::Deleted,
        JobState::Restarted,
    ];

    /// Database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Rendering => "rendering",
            Self::Done => "done",
            Self::Error => "error",
            Self::Unknown => "unknown",
            Self::Restarted => "restarted",
            Self::Deleted => "deleted",
        }
    }

    pub fn is_terminal(self) -> bool {
        Self::TERMINAL.contains(&self)
    }

    /// String forms of [`JobState::NON_TERMINAL`], for SQL `= ANY($n)` binds.
    pub fn non_terminal_strs() -> Vec<&'static str> {
        Self::NON_TERMINAL.iter().map(|s| s.as_str()).collect()
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobState {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "rendering" => Ok(Self::Rendering),
            "done" => Ok(Self::Done),
            "error" => Ok(Self::Error),
            "unknown" => Ok(Self::Unknown),
            "restarted" => Ok(Self::Restarted),
            "deleted" => Ok(Self::Deleted),
            other => Err(CoreError::Validation(format!(
                "Unknown job state '{other}'"
            ))),
        }
    }
}

impl TryFrom<String> for JobState {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, CoreError> {
        value.parse()
    }
}
