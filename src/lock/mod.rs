mod flock;
mod guard;
mod handle;
mod options;
mod worker;

pub use guard::LockGuard;
pub use handle::LockHandle;
pub use options::{LockOptions, LockStrategy, DEFAULT_POLL_INTERVAL, MIN_POLL_INTERVAL};
