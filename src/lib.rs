//! Async advisory file locking with timeouts and scoped release

pub mod error;
pub mod lock;
pub mod utils;

pub use error::{AflockError, Result};
pub use lock::{LockGuard, LockHandle, LockOptions, LockStrategy};
