//! Per-tile outcomes.

use std::fmt;

use super::retry::AttemptFailure;

/// Reason attached to tiles abandoned because the job was cancelled.
pub const CANCELLED: &str = "cancelled";

/// Classification of a failed tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The last attempt of an exhausted budget was a 404
    NotFound,
    /// Every attempt failed, the last one not with a 404
    Exhausted,
    /// 2x output: none of the four children could be fetched or decoded
    AllChildrenMissing,
    /// 2x output: present children have different dimensions
    ChildSizeMismatch,
    /// The output backend rejected the tile
    Storage,
    /// Temp file handling, image encoding or a panicked worker
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotFound => "not found",
            Self::Exhausted => "retries exhausted",
            Self::AllChildrenMissing => "all children missing",
            Self::ChildSizeMismatch => "child size mismatch",
            Self::Storage => "storage error",
            Self::Internal => "internal error",
        };
        f.write_str(name)
    }
}

/// Result of processing one tile.
#[derive(Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Image bytes (PNG for 2x composites, whatever the server sent for 1x)
    Success { bytes: Vec<u8> },
    /// The backend already holds the tile; nothing was fetched
    AlreadyExists,
    /// Not attempted, e.g. because the job was cancelled
    Skipped(String),
    Failed { kind: FailureKind, message: String },
}

impl FetchOutcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    /// Terminal outcome after the retry budget is spent.
    pub fn exhausted(attempts: u32, last: &AttemptFailure) -> Self {
        let kind = if last.is_not_found() {
            FailureKind::NotFound
        } else {
            FailureKind::Exhausted
        };
        Self::failed(kind, format!("{} after {} attempts", last, attempts))
    }

    pub fn cancelled() -> Self {
        Self::Skipped(CANCELLED.to_string())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Skipped(reason) if reason == CANCELLED)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

// Bytes are summarised; tiles are tens of kilobytes.
impl fmt::Debug for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { bytes } => write!(f, "Success({} bytes)", bytes.len()),
            Self::AlreadyExists => write!(f, "AlreadyExists"),
            Self::Skipped(reason) => write!(f, "Skipped({:?})", reason),
            Self::Failed { kind, message } => write!(f, "Failed({:?}: {})", kind, message),
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { bytes } => write!(f, "ok ({} bytes)", bytes.len()),
            Self::AlreadyExists => write!(f, "already exists"),
            Self::Skipped(reason) => write!(f, "skipped: {}", reason),
            Self::Failed { kind, message } => write!(f, "{}: {}", kind, message),
        }
    }
}
