//! Command dispatching.
//!
//! This module provides the core command infrastructure:
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::path::{Path, PathBuf};

use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::status::Status;

/// Trait for command implementations.
pub trait Command {
    /// Execute the command and report its exit code.
    fn execute(&self) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use. Statuses from wrapped commands pass through
    /// unmodified.
    pub exit_code: i32,
}

impl CommandResult {
    /// Create a successful result.
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }

    /// Carry an evaluation status out as the process exit code.
    pub fn from_status(status: Status) -> Self {
        Self {
            success: status.success(),
            exit_code: status.code(),
        }
    }
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    project_root: PathBuf,
}

impl CommandDispatcher {
    /// Create a new dispatcher for the given project root.
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    /// Get the project root path.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli) -> Result<CommandResult> {
        match &cli.command {
            Commands::Run(args) => {
                let runtime = super::build_runtime(&self.project_root, cli)?;
                super::run::RunCommand::new(runtime, args.clone()).execute()
            }
            Commands::Eval(args) => {
                let runtime = super::build_runtime(&self.project_root, cli)?;
                super::eval::EvalCommand::new(runtime, args.clone()).execute()
            }
            Commands::List(args) => {
                let runtime = super::build_runtime(&self.project_root, cli)?;
                super::list::ListCommand::new(runtime, args.clone()).execute()
            }
            Commands::Stage(args) => {
                let store = super::stage_store(&self.project_root, cli);
                super::stage::StageCommand::new(store, args.clone()).execute()
            }
            Commands::Completions(args) => {
                super::completions::CompletionsCommand::new(args.clone()).execute()
            }
        }
    }
}
