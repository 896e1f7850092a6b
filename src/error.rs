//! Error taxonomy and the run log.
//!
//! Two classes of failure exist:
//!
//! - [`AnalysisError`]: fatal. The run never produces a result.
//! - [`FileError`]: scoped to one file. Captured by the analyzer, turned into
//!   a [`RunEvent`] and a marker on the file's slot, never propagated.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Fatal errors: invalid input path, invalid configuration, or failure to set
/// up the run.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid path {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn invalid_path(path: &Path, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidPath {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Errors confined to a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileError {
    #[error("parse error in {}: {reason}", .file.display())]
    Parse { file: PathBuf, reason: String },

    #[error("timed out after {limit_ms}ms parsing {}", .file.display())]
    Timeout { file: PathBuf, limit_ms: u64 },

    #[error("cannot read {}: {reason}", .file.display())]
    Unreadable { file: PathBuf, reason: String },

    #[error("{} is {size} bytes, above the {limit} byte limit", .file.display())]
    TooLarge { file: PathBuf, size: u64, limit: u64 },
}

impl FileError {
    /// The run-log kind this error is reported under.
    pub fn event_kind(&self) -> EventKind {
        match self {
            FileError::Parse { .. } | FileError::Unreadable { .. } => EventKind::ParseError,
            FileError::Timeout { .. } => EventKind::TimeoutError,
            FileError::TooLarge { .. } => EventKind::FileSkipped,
        }
    }

    pub fn file(&self) -> &Path {
        match self {
            FileError::Parse { file, .. }
            | FileError::Timeout { file, .. }
            | FileError::Unreadable { file, .. }
            | FileError::TooLarge { file, .. } => file,
        }
    }

    /// Convert into a run-log entry.
    pub fn to_event(&self) -> RunEvent {
        RunEvent::new(self.event_kind(), Some(self.file()), self.to_string())
    }
}

/// Kind of a recoverable event recorded during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A subtree could not be read; it was skipped.
    PermissionError,
    /// Some other directory walk failure.
    ScanError,
    /// A plugin failed on a file.
    ParseError,
    /// The generic plugin was used instead of a language plugin.
    PluginFallback,
    /// A plugin exceeded the per-file timeout.
    TimeoutError,
    /// A file was left out before parsing (size limit).
    FileSkipped,
    /// The run was cancelled; the result is incomplete.
    CancellationRequested,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::PermissionError => "permission_error",
            EventKind::ScanError => "scan_error",
            EventKind::ParseError => "parse_error",
            EventKind::PluginFallback => "plugin_fallback",
            EventKind::TimeoutError => "timeout_error",
            EventKind::FileSkipped => "file_skipped",
            EventKind::CancellationRequested => "cancellation_requested",
        }
    }

    /// Informational events are not warnings.
    pub fn is_informational(&self) -> bool {
        matches!(self, EventKind::PluginFallback | EventKind::CancellationRequested)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the structured run log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEvent {
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    pub message: String,
}

impl RunEvent {
    pub fn new(kind: EventKind, file: Option<&Path>, message: impl Into<String>) -> Self {
        Self {
            kind,
            file: file.map(Path::to_path_buf),
            message: message.into(),
        }
    }
}

/// Ordered, append-only log of recoverable events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunLog {
    entries: Vec<RunEvent>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: RunEvent) {
        self.entries.push(event);
    }

    pub fn extend<I: IntoIterator<Item = RunEvent>>(&mut self, events: I) {
        self.entries.extend(events);
    }

    pub fn entries(&self) -> &[RunEvent] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Events of the given kind, in log order.
    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &RunEvent> {
        self.entries.iter().filter(move |e| e.kind == kind)
    }

    /// Number of entries that should be surfaced as warnings.
    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| !e.kind.is_informational())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_error_event_kind() {
        let err = FileError::Timeout {
            file: PathBuf::from("slow.py"),
            limit_ms: 5,
        };
        let event = err.to_event();
        assert_eq!(event.kind, EventKind::TimeoutError);
        assert_eq!(event.file.as_deref(), Some(Path::new("slow.py")));
        assert!(event.message.contains("5ms"));
    }

    #[test]
    fn test_run_log_warning_count() {
        let mut log = RunLog::new();
        log.push(RunEvent::new(EventKind::PluginFallback, None, "fallback"));
        log.push(RunEvent::new(EventKind::ParseError, Some(Path::new("a.rs")), "bad"));
        assert_eq!(log.len(), 2);
        assert_eq!(log.warning_count(), 1);
        assert_eq!(log.of_kind(EventKind::ParseError).count(), 1);
    }
}
