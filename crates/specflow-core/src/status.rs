//! Work status for coordinated units of work.

use serde::{Deserialize, Serialize};

/// Status of one named unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    /// Announced but not started.
    Pending,
    /// Owning worker is running.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished with errors.
    Failed,
}

impl WorkStatus {
    /// Is this a terminal state?
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether a transition to `next` preserves monotonicity.
    ///
    /// pending -> in_progress -> {completed | failed}. Re-asserting the
    /// current status is allowed (idempotent updates); leaving a terminal
    /// state requires an explicit reset, not a transition.
    pub fn can_transition_to(&self, next: WorkStatus) -> bool {
        if *self == next {
            return true;
        }
        match self {
            Self::Pending => matches!(
                next,
                Self::InProgress | Self::Completed | Self::Failed
            ),
            Self::InProgress => matches!(next, Self::Completed | Self::Failed),
            Self::Completed | Self::Failed => false,
        }
    }

    /// Wire name, matching the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for WorkStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(crate::Error::validation(format!(
                "unknown status '{other}' (expected pending, in_progress, completed, or failed)"
            ))),
        }
    }
}
