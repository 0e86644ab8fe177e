mod types;

pub use types::{AflockError, Result};
