use aflock::utils::parse_duration;
use aflock::AflockError;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(
    name = "aflock",
    version,
    about = "Run a command while holding an exclusive advisory file lock",
    long_about = None
)]
pub struct Args {
    /// Lock file path (created if missing)
    #[arg(value_name = "LOCK_FILE")]
    pub lock_file: PathBuf,

    /// Command to run while the lock is held
    #[arg(
        value_name = "COMMAND",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,

    /// Give up after waiting this long (e.g., 500ms, 30s, 5m)
    #[arg(short = 't', long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Fail immediately if locked
    #[arg(short = 'n', long, conflicts_with = "timeout")]
    pub no_wait: bool,

    /// Delay between attempts while waiting
    #[arg(long, value_name = "DURATION", value_parser = parse_poll_interval, default_value = "1s")]
    pub poll_interval: Duration,

    /// Refuse to open the lock file through a symlink
    #[arg(long)]
    pub no_follow_symlinks: bool,

    /// Verbose output
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    pub fn log_level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Wait budget for the acquire call; `--no-wait` is a zero budget.
    pub fn wait_budget(&self) -> Option<Duration> {
        if self.no_wait {
            Some(Duration::ZERO)
        } else {
            self.timeout
        }
    }
}

fn parse_poll_interval(s: &str) -> Result<Duration, AflockError> {
    let interval = parse_duration(s)?;
    if interval.is_zero() {
        return Err(AflockError::InvalidDuration {
            input: s.to_string(),
            message: "poll interval must be greater than zero".to_string(),
        });
    }
    Ok(interval)
}
