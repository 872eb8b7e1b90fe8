// Error taxonomy for sampling, snapshots and remediation

use crate::models::SessionKey;

/// The OS query behind a sample could not be performed at all.
/// Per-process read failures never surface here; those processes are just omitted.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SamplingError {
    #[error("host metrics unavailable: {0}")]
    Unavailable(String),
    #[error("sampling task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("no recent process list for session {session} (missing or expired)")]
    Stale { session: SessionKey },
    #[error("index {index} out of range for session {session}: list has {len} entries")]
    IndexOutOfRange {
        session: SessionKey,
        index: usize,
        len: usize,
    },
}

/// Failures of the host termination primitive.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("process {pid} no longer exists")]
    NotFound { pid: u32 },
    #[error("permission denied signaling process {pid}")]
    PermissionDenied { pid: u32 },
    #[error("polite termination is not supported on this platform")]
    Unsupported,
    #[error("signaling process {pid} failed: {source}")]
    Io {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum TerminateError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("refusing to terminate protected process {name} (pid {pid})")]
    Protected { pid: u32, name: String },
    #[error("pid {pid} now belongs to {found}, not {expected}")]
    PidReused {
        pid: u32,
        expected: String,
        found: String,
    },
    #[error(transparent)]
    Host(#[from] HostError),
}

impl TerminateError {
    /// Stable machine-readable kind, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TerminateError::Snapshot(SnapshotError::Stale { .. }) => "stale_snapshot",
            TerminateError::Snapshot(SnapshotError::IndexOutOfRange { .. }) => "index_out_of_range",
            TerminateError::Protected { .. } => "protected_entity",
            TerminateError::PidReused { .. } => "pid_reused",
            TerminateError::Host(HostError::NotFound { .. }) => "process_not_found",
            TerminateError::Host(HostError::PermissionDenied { .. }) => "permission_denied",
            TerminateError::Host(HostError::Unsupported) => "unsupported",
            TerminateError::Host(HostError::Io { .. }) => "host_error",
        }
    }
}

/// Errors returned by the command surface.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Sampling(#[from] SamplingError),
    #[error(transparent)]
    Terminate(#[from] TerminateError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl CommandError {
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::Sampling(_) => "sampling_failed",
            CommandError::Terminate(e) => e.kind(),
            CommandError::InvalidArgument(_) => "invalid_argument",
        }
    }
}

impl From<SnapshotError> for CommandError {
    fn from(e: SnapshotError) -> Self {
        CommandError::Terminate(TerminateError::Snapshot(e))
    }
}
