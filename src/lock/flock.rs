use crate::error::{AflockError, Result};
use fs2::FileExt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Check if an I/O error indicates lock contention (file locked by another process)
pub(crate) fn is_lock_contention(e: &io::Error) -> bool {
    // Check for WouldBlock (Unix)
    if e.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    // Check for Windows-specific lock errors
    // ERROR_LOCK_VIOLATION (33) - file region is locked
    // ERROR_SHARING_VIOLATION (32) - file in use by another process
    #[cfg(windows)]
    if let Some(code) = e.raw_os_error() {
        if code == 33 || code == 32 {
            return true;
        }
    }
    false
}

/// One non-blocking exclusive attempt. `Ok(false)` means someone else holds it.
pub(crate) fn try_lock(file: &File, path: &Path) -> Result<bool> {
    match file.try_lock_exclusive() {
        Ok(()) => Ok(true),
        Err(e) if is_lock_contention(&e) => Ok(false),
        Err(e) => Err(AflockError::LockAcquisitionFailed {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

pub(crate) fn unlock(file: &File, path: &Path) -> Result<()> {
    FileExt::unlock(file).map_err(|e| AflockError::LockReleaseFailed {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Where a contended wait stands. Shared by the handle, its poll worker
/// and the token the worker hands back; every transition happens under the
/// mutex, and the worker only calls `try_lock` while holding it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Claim {
    Waiting,
    /// The worker holds the OS lock and nobody has taken it yet.
    Won,
    /// The handle owns the OS lock the worker took.
    Taken,
    Abandoned,
}

pub(crate) type ClaimCell = Arc<Mutex<Claim>>;

pub(crate) fn new_claim() -> ClaimCell {
    Arc::new(Mutex::new(Claim::Waiting))
}

pub(crate) fn lock_claim(claim: &Mutex<Claim>) -> MutexGuard<'_, Claim> {
    // Nothing panics while holding it, but a poisoned state is still valid
    claim.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Close out a wait the caller walked away from. Returns true when the
/// worker had already won, in which case the OS lock now belongs to the
/// handle and the worker's token will leave it alone.
pub(crate) fn settle(claim: &Mutex<Claim>) -> bool {
    let mut state = lock_claim(claim);
    match *state {
        Claim::Won => {
            *state = Claim::Taken;
            true
        }
        Claim::Taken => false,
        Claim::Waiting | Claim::Abandoned => {
            *state = Claim::Abandoned;
            false
        }
    }
}

/// A lock taken by the poll worker that nobody has claimed yet.
///
/// If the waiting caller went away and its handle has not settled the wait,
/// dropping the token releases the lock.
#[derive(Debug)]
pub(crate) struct HeldLock {
    file: Arc<File>,
    path: PathBuf,
    claim: ClaimCell,
}

impl HeldLock {
    pub(crate) fn new(file: Arc<File>, path: PathBuf, claim: ClaimCell) -> Self {
        Self { file, path, claim }
    }

    /// Hand ownership of the OS lock to the caller's handle.
    pub(crate) fn adopt(self) {
        *lock_claim(&self.claim) = Claim::Taken;
    }
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        let mut state = lock_claim(&self.claim);
        if *state != Claim::Won {
            return;
        }
        *state = Claim::Abandoned;
        debug!("Unclaimed lock released: {}", self.path.display());
        if let Err(e) = unlock(&self.file, &self.path) {
            warn!("{}", e);
        }
    }
}
