use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AflockError {
    #[error("Failed to acquire lock on {path}: timeout after {duration:?}")]
    LockTimeout { path: PathBuf, duration: Duration },

    #[error("Failed to acquire lock on {0}: file is locked by another process")]
    LockWouldBlock(PathBuf),

    #[error("Failed to create lock file {path}: {source}")]
    LockCreationFailed { path: PathBuf, source: io::Error },

    #[error("Failed to acquire lock on {path}: {source}")]
    LockAcquisitionFailed { path: PathBuf, source: io::Error },

    #[error("Failed to release lock on {path}: {source}")]
    LockReleaseFailed { path: PathBuf, source: io::Error },

    #[error("Lock worker for {0} exited without reporting a result")]
    WorkerLost(PathBuf),

    #[error("Invalid duration format '{input}': {message}")]
    InvalidDuration { input: String, message: String },

    #[error("Failed to run command '{program}': {source}")]
    CommandFailed { program: String, source: io::Error },

    #[error("Interrupted while waiting for lock on {0}")]
    Interrupted(PathBuf),

    #[error("{0}")]
    Other(String),
}

impl AflockError {
    pub fn exit_code(&self) -> i32 {
        match self {
            AflockError::LockTimeout { .. } | AflockError::LockWouldBlock(_) => 2,
            AflockError::Interrupted(_) => 3,
            _ => 1,
        }
    }

    /// True when the failure means another owner holds the lock.
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            AflockError::LockTimeout { .. } | AflockError::LockWouldBlock(_)
        )
    }

    pub fn lock_timeout(path: impl Into<PathBuf>, duration: Duration) -> Self {
        AflockError::LockTimeout {
            path: path.into(),
            duration,
        }
    }

    pub fn lock_would_block(path: impl Into<PathBuf>) -> Self {
        AflockError::LockWouldBlock(path.into())
    }
}

pub type Result<T> = std::result::Result<T, AflockError>;
