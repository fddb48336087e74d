//! # Vitrine Entry Point
//!
//! The actual setup is in lib.rs for better testability.

use clap::Parser;
use std::process::ExitCode;

use vitrine_cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    vitrine_cli::init_tracing();

    match vitrine_cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("vitrine: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
