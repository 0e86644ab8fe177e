use crate::cli::Args;
use aflock::{AflockError, LockHandle, LockOptions, Result};
use std::process::ExitStatus;
use tokio::process::Command;
use tracing::info;

pub async fn execute_locked(args: Args) -> Result<i32> {
    let (program, program_args) = args
        .command
        .split_first()
        .ok_or_else(|| AflockError::Other("No command given".to_string()))?;

    let options = LockOptions::new()
        .with_poll_interval(args.poll_interval)
        .follow_symlinks(!args.no_follow_symlinks);

    let mut handle = LockHandle::with_options(&args.lock_file, options)?;

    let acquired = tokio::select! {
        result = handle.acquire(args.wait_budget()) => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            Err(AflockError::Interrupted(args.lock_file.clone()))
        }
    };

    let guard = match acquired {
        Err(AflockError::LockTimeout { path, .. }) if args.no_wait => {
            return Err(AflockError::LockWouldBlock(path));
        }
        other => other?,
    };

    info!("Lock acquired: {}", args.lock_file.display());

    let status = Command::new(program)
        .args(program_args)
        .status()
        .await
        .map_err(|e| AflockError::CommandFailed {
            program: program.clone(),
            source: e,
        })?;

    guard.release()?;
    info!("Lock released: {}", args.lock_file.display());

    Ok(exit_code(status))
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    // Killed by a signal: report 128 + signal like a shell does
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
