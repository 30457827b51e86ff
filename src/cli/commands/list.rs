//! List command implementation.
//!
//! The `braid list` command prints the registered actions, built-ins
//! included.

use crate::cli::args::ListArgs;
use crate::error::Result;

use super::dispatcher::{Command, CommandResult};
use super::Runtime;

/// The list command implementation.
pub struct ListCommand {
    runtime: Runtime,
    args: ListArgs,
}

impl ListCommand {
    /// Create a new list command.
    pub fn new(runtime: Runtime, args: ListArgs) -> Self {
        Self { runtime, args }
    }

    fn render(&self) -> Result<String> {
        let names = self.runtime.ctx.registry.names();
        if self.args.json {
            Ok(serde_json::to_string_pretty(&names)?)
        } else {
            let mut out = String::from("Actions:\n");
            for name in names {
                out.push_str("  ");
                out.push_str(name);
                out.push('\n');
            }
            Ok(out)
        }
    }
}

impl Command for ListCommand {
    fn execute(&self) -> Result<CommandResult> {
        print!("{}", self.render()?);
        Ok(CommandResult::success())
    }
}
