//! # Vitrine CLI
//!
//! Terminal front-end for the Vitrine product catalog.
//!
//! ## Module Organization
//! ```text
//! vitrine_cli/
//! ├── lib.rs           ◄─── You are here (args, logging, REPL loop)
//! ├── command.rs       ◄─── Line parsing into Command
//! ├── orchestrator.rs  ◄─── Commands → gateway / controller calls
//! ├── render.rs        ◄─── CatalogEventEmitter writing to stdout
//! └── error.rs         ◄─── Fatal errors and exit codes
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Application Startup                               │
//! │                                                                         │
//! │  1. Initialize Logging ───────────────────────────────────────────────► │
//! │     • tracing-subscriber with env filter, written to stderr            │
//! │     • Default: info,vitrine=debug, overridable with RUST_LOG           │
//! │                                                                         │
//! │  2. Load Configuration ───────────────────────────────────────────────► │
//! │     • defaults → config.toml → FIREBASE_* / VITRINE_* env → CLI flags  │
//! │                                                                         │
//! │  3. Resolve Credentials ──────────────────────────────────────────────► │
//! │     • placeholders substituted, status logged once                     │
//! │                                                                         │
//! │  4. Build Backend ────────────────────────────────────────────────────► │
//! │     • memory: in-process providers                                      │
//! │     • rest: identity + document REST endpoints (shared token)          │
//! │                                                                         │
//! │  5. Boot Orchestrator, then read commands until quit / EOF             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod command;
pub mod error;
pub mod orchestrator;
pub mod render;

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vitrine_core::Credentials;
use vitrine_sync::memory::{MemoryIdentity, MemoryStore};
use vitrine_sync::{rest, AppConfig, BackendKind, DocumentStore, IdentityProvider};

pub use error::CliError;
use orchestrator::{Flow, Orchestrator};
use render::TerminalRenderer;

#[derive(Parser, Debug)]
#[command(name = "vitrine", author, version, about = "Terminal front-end for the Vitrine product catalog")]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "VITRINE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend to use (memory | rest); overrides the config file
    #[arg(short, long)]
    pub backend: Option<BackendKind>,

    /// Print creation times with every product
    #[arg(long)]
    pub debug: bool,
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=vitrine=trace` - Show trace for vitrine crates only
/// - Default: `info,vitrine=debug`
///
/// Logs go to stderr; stdout is the rendering surface.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,vitrine=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the identity provider and document store for the configured backend.
pub fn build_backend(
    config: &AppConfig,
    credentials: &Credentials,
) -> (Arc<dyn IdentityProvider>, Arc<dyn DocumentStore>) {
    let identity: Arc<dyn IdentityProvider>;
    let store: Arc<dyn DocumentStore>;
    match config.backend.kind {
        BackendKind::Memory => {
            info!("Using in-memory backend");
            identity = Arc::new(MemoryIdentity::new());
            store = Arc::new(MemoryStore::new());
        }
        BackendKind::Rest => {
            info!(
                poll_interval_secs = config.backend.poll_interval_secs,
                "Using REST backend"
            );
            let (rest_identity, rest_store) = rest::backend(credentials, &config.backend);
            identity = rest_identity;
            store = rest_store;
        }
    }
    (identity, store)
}

/// Runs the REPL until `quit` or end of input.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = AppConfig::load(cli.config)?;
    if let Some(kind) = cli.backend {
        config.backend.kind = kind;
    }
    if cli.debug {
        config.ui.debug_mode = true;
    }

    info!(backend = %config.backend.kind, "Starting Vitrine");

    let credentials = config.resolve_credentials();
    let (identity, store) = build_backend(&config, &credentials);
    let renderer = Arc::new(TerminalRenderer::stdout(config.ui.debug_mode));

    let orchestrator =
        Orchestrator::boot(&config, credentials, identity, store, renderer.clone()).await;
    renderer.print("Type 'help' for the list of commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match command::parse(&line) {
            Ok(Some(command)) => {
                if orchestrator.handle(command).await == Flow::Quit {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Unrecognized input");
                renderer.print(&e.to_string());
            }
        }
    }

    if orchestrator.controller().unsubscribe() {
        info!("Released live subscription");
    }
    info!("Bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_args() {
        let cli = Cli::parse_from(["vitrine", "--backend", "rest", "--debug"]);
        assert_eq!(cli.backend, Some(BackendKind::Rest));
        assert!(cli.debug);

        assert!(Cli::try_parse_from(["vitrine", "--backend", "carrier-pigeon"]).is_err());
    }

    #[tokio::test]
    async fn test_build_backend_variants() {
        let mut config = AppConfig::default();
        let credentials = config.resolve_credentials();
        let _ = build_backend(&config, &credentials);

        config.backend.kind = BackendKind::Rest;
        let _ = build_backend(&config, &credentials);
    }
}
