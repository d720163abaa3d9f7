//! Error types shared by the transport and the engines.

use std::path::PathBuf;

/// Failure of a single transport invocation.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport binary could not be started at all.
    #[error("cannot run {program}: {source}")]
    Unavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited unsuccessfully.
    #[error("command exited with {}: {}", status.map_or_else(|| "signal".to_string(), |c| c.to_string()), stderr.trim())]
    Failed { status: Option<i32>, stderr: String },

    /// The command succeeded but its output made no sense.
    #[error("unexpected output: {0}")]
    Parse(String),
}

impl TransportError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, TransportError::Unavailable { .. })
    }
}

/// Job-level errors. Each of these aborts the job; per-file problems are
/// reported through [`crate::report::TransferOutcome`] instead.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("adb is not available: {0}")]
    TransportUnavailable(#[source] TransportError),

    #[error("no authorized device connected{}", serial.as_deref().map(|s| format!(" (wanted {s})")).unwrap_or_default())]
    DeviceNotConnected { serial: Option<String> },

    #[error("{count} devices connected; pick one with --serial")]
    AmbiguousDevice { count: usize },

    #[error("invalid job: {0}")]
    InvalidJob(String),

    #[error("cannot read {}: {source}", path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot prepare {}: {source}", path.display())]
    DestinationUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot list device directory {dir}: {source}")]
    RemoteUnreadable {
        dir: String,
        #[source]
        source: TransportError,
    },
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
