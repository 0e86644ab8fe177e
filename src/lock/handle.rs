use super::flock::{self, new_claim, try_lock, ClaimCell};
use super::guard::LockGuard;
use super::options::{LockOptions, LockStrategy};
use super::worker::{spawn_poll, PollRequest};
use crate::error::{AflockError, Result};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// An open lock file and the exclusive lock that can be taken on it.
///
/// Each handle is an independent participant: two handles on the same path,
/// even inside one process, contend with each other.
#[derive(Debug)]
pub struct LockHandle {
    file: Arc<File>,
    path: PathBuf,
    options: LockOptions,
    held: bool,
    /// Wait whose `acquire` future was dropped before the worker reported.
    pending: Option<ClaimCell>,
}

impl LockHandle {
    /// Open (creating if needed) the lock file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(path, LockOptions::default())
    }

    /// Open the lock file with a default wait budget for `acquire`.
    pub fn with_timeout(path: impl AsRef<Path>, timeout: Duration) -> Result<Self> {
        Self::with_options(path, LockOptions::default().with_timeout(timeout))
    }

    pub fn with_options(path: impl AsRef<Path>, options: LockOptions) -> Result<Self> {
        let path = path.as_ref();

        let mut opts = OpenOptions::new();
        opts.create(true).write(true).truncate(true);

        // On Unix, use O_NOFOLLOW to reject symlinks at OS level
        #[cfg(unix)]
        if !options.follow_symlinks {
            use std::os::unix::fs::OpenOptionsExt;
            opts.custom_flags(libc::O_NOFOLLOW);
        }

        let file = opts
            .open(path)
            .map_err(|e| AflockError::LockCreationFailed {
                path: path.to_path_buf(),
                source: e,
            })?;

        debug!("Opened lock file: {}", path.display());

        Ok(LockHandle {
            file: Arc::new(file),
            path: path.to_path_buf(),
            options,
            held: false,
            pending: None,
        })
    }

    /// Acquire the exclusive lock.
    ///
    /// Tries once without waiting. On contention the wait budget is `timeout`,
    /// else the handle's default, else unbounded. A zero budget means the
    /// first attempt is the only one. Otherwise retries run on the blocking
    /// pool every poll interval, so the calling task only suspends.
    ///
    /// Dropping the returned future abandons the wait without leaving the
    /// file locked.
    pub async fn acquire(&mut self, timeout: Option<Duration>) -> Result<LockGuard<'_>> {
        let start = Instant::now();
        let strategy = self.options.strategy(timeout);
        self.settle_pending();

        debug!(
            "Acquiring lock: {} (strategy: {:?})",
            self.path.display(),
            strategy
        );

        if try_lock(&self.file, &self.path)? {
            debug!("Lock acquired: {}", self.path.display());
            return Ok(self.mark_held());
        }

        if strategy == LockStrategy::NoWait {
            return Err(AflockError::LockTimeout {
                path: self.path.clone(),
                duration: Duration::ZERO,
            });
        }

        debug!("Lock busy, polling: {}", self.path.display());

        let claim = new_claim();
        self.pending = Some(claim.clone());

        let rx = spawn_poll(
            PollRequest {
                file: self.file.clone(),
                path: self.path.clone(),
                claim,
                deadline: strategy.deadline(),
                interval: self.options.effective_poll_interval(),
                start,
            },
            self.options.executor.as_ref(),
        );

        // If this future is dropped here, `pending` stays set and the next
        // operation on the handle settles the wait.
        let outcome = rx.await;
        self.pending = None;

        let held = outcome.map_err(|_| AflockError::WorkerLost(self.path.clone()))??;
        held.adopt();

        debug!(
            "Lock acquired after {:?}: {}",
            start.elapsed(),
            self.path.display()
        );
        Ok(self.mark_held())
    }

    /// Take the lock only if nobody holds it right now.
    pub fn try_acquire(&mut self) -> Result<Option<LockGuard<'_>>> {
        self.settle_pending();
        if try_lock(&self.file, &self.path)? {
            debug!("Lock acquired: {}", self.path.display());
            Ok(Some(self.mark_held()))
        } else {
            Ok(None)
        }
    }

    /// Drop the OS lock. Harmless when not held.
    pub fn release(&mut self) -> Result<()> {
        self.settle_pending();
        flock::unlock(&self.file, &self.path)?;
        self.held = false;
        debug!("Lock released: {}", self.path.display());
        Ok(())
    }

    /// Get the lock file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &LockOptions {
        &self.options
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Take over from a wait that was abandoned mid-flight. A lock the worker
    /// already won is on this descriptor and is ours from now on; otherwise
    /// the worker is told to stop before its next attempt.
    fn settle_pending(&mut self) {
        if let Some(claim) = self.pending.take() {
            if flock::settle(&claim) {
                debug!("Lock won by abandoned wait kept: {}", self.path.display());
                self.held = true;
            }
        }
    }

    fn mark_held(&mut self) -> LockGuard<'_> {
        self.held = true;
        LockGuard::new(self)
    }
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        self.settle_pending();
        // Closing the descriptor drops any lock still on it. Only reachable
        // with the lock held if a guard was leaked or an abandoned wait won.
        if self.held {
            debug!("Lock closed while held: {}", self.path.display());
        }
    }
}
