use clap::Parser;
use std::process;

mod cli;

#[tokio::main]
async fn main() {
    let args = cli::Args::parse();

    // Initialize tracing (-v for debug output, -q for errors only)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(args.log_level())
        .init();

    match cli::run(args).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}
