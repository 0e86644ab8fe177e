use super::flock::{lock_claim, try_lock, Claim, ClaimCell, HeldLock};
use crate::error::{AflockError, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::debug;

pub(crate) struct PollRequest {
    pub file: Arc<File>,
    pub path: PathBuf,
    pub claim: ClaimCell,
    pub deadline: Option<Duration>,
    pub interval: Duration,
    pub start: Instant,
}

enum Attempt {
    Won(HeldLock),
    Busy,
    Abandoned,
}

/// Run the contended retry loop on the blocking pool of `executor`, or of the
/// current runtime when none is given.
///
/// The receiver resolves with the lock token, a timeout, or a fatal error.
/// Dropping the receiver abandons the wait.
pub(crate) fn spawn_poll(
    req: PollRequest,
    executor: Option<&Handle>,
) -> oneshot::Receiver<Result<HeldLock>> {
    let (tx, rx) = oneshot::channel();

    let work = move || {
        let outcome = poll_until_locked(&req, || tx.is_closed());
        match outcome {
            Ok(None) => debug!("Lock wait abandoned: {}", req.path.display()),
            // A failed send hands the token back and drops it, unlocking
            // unless the handle already took the lock over.
            Ok(Some(held)) => {
                let _ = tx.send(Ok(held));
            }
            Err(e) => {
                let _ = tx.send(Err(e));
            }
        }
    };

    match executor {
        Some(handle) => drop(handle.spawn_blocking(work)),
        None => drop(tokio::task::spawn_blocking(work)),
    }

    rx
}

fn poll_until_locked(
    req: &PollRequest,
    abandoned: impl Fn() -> bool,
) -> Result<Option<HeldLock>> {
    loop {
        if abandoned() {
            *lock_claim(&req.claim) = Claim::Abandoned;
            return Ok(None);
        }

        match attempt(req)? {
            Attempt::Won(held) => return Ok(Some(held)),
            Attempt::Abandoned => return Ok(None),
            Attempt::Busy => {}
        }

        let sleep_time = match req.deadline {
            Some(limit) => {
                let elapsed = req.start.elapsed();
                if elapsed >= limit {
                    return Err(timeout(&req.path, limit));
                }
                req.interval.min(limit - elapsed)
            }
            None => req.interval,
        };

        std::thread::sleep(sleep_time);
    }
}

/// One try, made while holding the claim so the handle can't settle the
/// wait between the check and the lock call.
fn attempt(req: &PollRequest) -> Result<Attempt> {
    let mut state = lock_claim(&req.claim);
    if *state != Claim::Waiting {
        return Ok(Attempt::Abandoned);
    }
    if !try_lock(&req.file, &req.path)? {
        return Ok(Attempt::Busy);
    }
    *state = Claim::Won;
    drop(state);

    Ok(Attempt::Won(HeldLock::new(
        req.file.clone(),
        req.path.clone(),
        req.claim.clone(),
    )))
}

fn timeout(path: &Path, duration: Duration) -> AflockError {
    AflockError::LockTimeout {
        path: path.to_path_buf(),
        duration,
    }
}
