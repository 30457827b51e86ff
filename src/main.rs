//! Braid CLI entry point.

use std::process::ExitCode;

use braid::cli::{Cli, CommandDispatcher};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
///
/// Logs go to stderr: stdout belongs to the wrapped commands (pipeline
/// output, captured join blocks).
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("braid=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("braid=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("Braid starting with args: {:?}", cli);

    let project_root = std::env::current_dir().unwrap_or_default();
    let dispatcher = CommandDispatcher::new(project_root);

    match dispatcher.dispatch(&cli) {
        Ok(result) => ExitCode::from(result.exit_code.clamp(0, 255) as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}
