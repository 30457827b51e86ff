//! Run command implementation.
//!
//! The `braid run` command evaluates an expression under supervision: the
//! SIGINT trap is installed, and the configured interrupt/exit hook actions
//! run around the evaluation.

use crate::cli::args::RunArgs;
use crate::combinator::Expr;
use crate::error::Result;
use crate::supervisor::Supervisor;

use super::dispatcher::{Command, CommandResult};
use super::Runtime;

/// The run command implementation.
pub struct RunCommand {
    runtime: Runtime,
    args: RunArgs,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(runtime: Runtime, args: RunArgs) -> Self {
        Self { runtime, args }
    }
}

impl Command for RunCommand {
    fn execute(&self) -> Result<CommandResult> {
        let expr = Expr::parse(&self.args.expr)?;
        let supervisor = Supervisor::new(self.runtime.hooks.clone());
        let status = supervisor.run(&expr, &self.runtime.ctx)?;
        Ok(CommandResult::from_status(status))
    }
}
