use std::time::Duration;
use tokio::runtime::Handle;

/// Delay between retries while another owner holds the lock.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shorter intervals are raised to this so a waiter never spins.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Per-handle configuration.
#[derive(Debug, Clone)]
pub struct LockOptions {
    pub timeout: Option<Duration>,
    pub poll_interval: Duration,
    pub follow_symlinks: bool,
    /// Runtime whose blocking pool runs contended waits. `None` uses the
    /// runtime `acquire` is called from.
    pub executor: Option<Handle>,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            follow_symlinks: true,
            executor: None,
        }
    }
}

impl LockOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default wait budget for `acquire` calls that don't pass their own.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(MIN_POLL_INTERVAL);
        self
    }

    pub fn with_executor(mut self, executor: Handle) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Poll interval as the worker uses it, never below [`MIN_POLL_INTERVAL`].
    pub fn effective_poll_interval(&self) -> Duration {
        self.poll_interval.max(MIN_POLL_INTERVAL)
    }

    /// Refuse to open the lock path through a symlink (Unix only).
    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Pick the strategy for one acquire call. The per-call timeout wins over
    /// the handle default; neither means wait forever.
    pub fn strategy(&self, timeout: Option<Duration>) -> LockStrategy {
        match timeout.or(self.timeout) {
            None => LockStrategy::Wait,
            Some(d) if d.is_zero() => LockStrategy::NoWait,
            Some(d) => LockStrategy::Timeout(d),
        }
    }
}

/// How the contended path behaves after the fast attempt fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStrategy {
    /// Poll until the lock is ours.
    Wait,
    /// The fast attempt was the only attempt.
    NoWait,
    /// Poll until the budget runs out.
    Timeout(Duration),
}

impl LockStrategy {
    pub fn deadline(&self) -> Option<Duration> {
        match self {
            LockStrategy::Wait => None,
            LockStrategy::NoWait => Some(Duration::ZERO),
            LockStrategy::Timeout(d) => Some(*d),
        }
    }
}
