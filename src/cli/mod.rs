mod args;
mod run_command;

use aflock::Result;
pub use args::Args;

/// Returns the exit code to terminate with.
pub async fn run(args: Args) -> Result<i32> {
    run_command::execute_locked(args).await
}
