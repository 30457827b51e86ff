//! Eval command implementation.
//!
//! The `braid eval` command evaluates an expression without supervision:
//! no signal trap, no hook actions. It doubles as the re-entry point for
//! nested invocations (composite `timeout`/`join` targets and detached
//! `delay` runs, which pass the hidden `--after` flag).

use std::thread;
use std::time::Duration;

use crate::cli::args::EvalArgs;
use crate::combinator::{eval, Expr};
use crate::error::Result;

use super::dispatcher::{Command, CommandResult};
use super::Runtime;

/// The eval command implementation.
pub struct EvalCommand {
    runtime: Runtime,
    args: EvalArgs,
}

impl EvalCommand {
    /// Create a new eval command.
    pub fn new(runtime: Runtime, args: EvalArgs) -> Self {
        Self { runtime, args }
    }
}

impl Command for EvalCommand {
    fn execute(&self) -> Result<CommandResult> {
        let expr = Expr::parse(&self.args.expr)?;

        if let Some(secs) = self.args.after {
            tracing::debug!(secs, expr = %expr, "sleeping before delayed evaluation");
            thread::sleep(Duration::from_secs(secs));
        }

        let status = eval(&expr, &self.runtime.ctx)?;
        Ok(CommandResult::from_status(status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::Cli;
    use clap::Parser;
    use tempfile::TempDir;

    fn command(temp: &TempDir, expr: &str, after: Option<u64>) -> EvalCommand {
        let cli = Cli::try_parse_from(["braid", "--quiet", "eval", expr]).unwrap();
        let runtime = super::super::build_runtime(temp.path(), &cli).unwrap();
        EvalCommand::new(
            runtime,
            EvalArgs {
                expr: expr.to_string(),
                after,
            },
        )
    }

    #[test]
    fn status_passes_through() {
        let temp = TempDir::new().unwrap();
        assert!(command(&temp, "or(fail,pass)", None).execute().unwrap().success);
        assert_eq!(
            command(&temp, "not(pass)", None).execute().unwrap().exit_code,
            1
        );
    }

    #[test]
    fn after_delays_evaluation() {
        let temp = TempDir::new().unwrap();
        let start = std::time::Instant::now();
        command(&temp, "pass", Some(1)).execute().unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
    }
}
