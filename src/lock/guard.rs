use super::handle::LockHandle;
use crate::error::AflockError;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Proof of exclusive ownership, returned by [`LockHandle::acquire`].
///
/// The lock is released exactly once: by [`LockGuard::release`], or when the
/// guard is dropped on any other exit (early return, `?`, panic, or the
/// enclosing future being cancelled).
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LockGuard<'a> {
    handle: &'a mut LockHandle,
    released: bool,
}

impl<'a> LockGuard<'a> {
    pub(crate) fn new(handle: &'a mut LockHandle) -> Self {
        Self {
            handle,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        self.handle.path()
    }

    /// Release now and report failure, which `Drop` can only log.
    pub fn release(mut self) -> crate::Result<()> {
        self.released = true;
        self.handle.release()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.handle.release() {
            warn!("{}", e);
        }
    }
}

impl LockHandle {
    /// Run `f` while holding the lock.
    ///
    /// Acquisition failures return before `f` runs. Once `f` finishes the lock
    /// is released; an error from `f` is returned as-is even if the release
    /// also failed, in which case the release error is only logged.
    pub async fn scoped<F, Fut, T, E>(
        &mut self,
        timeout: Option<Duration>,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: From<AflockError>,
    {
        let guard = self.acquire(timeout).await?;
        let outcome = f().await;

        match (outcome, guard.release()) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(release_err)) => Err(release_err.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_err)) => {
                warn!("{} (masked by error in locked section)", release_err);
                Err(e)
            }
        }
    }
}
