//! Stage command implementation.
//!
//! The `braid stage` subcommands manipulate stage stacks directly. Shell
//! actions call back into these to pass checkpoint data between otherwise
//! stateless invocations:
//!
//! ```yaml
//! actions:
//!   record:
//!     command: braid stage push deploy "{\"host\": \"web-1\"}"
//! ```

use serde_json::Value;

use crate::cli::args::{StageArgs, StageOp};
use crate::error::Result;
use crate::stage::{FileStageStore, StageStore};

use super::dispatcher::{Command, CommandResult};

/// The stage command implementation.
pub struct StageCommand {
    store: FileStageStore,
    args: StageArgs,
}

impl StageCommand {
    /// Create a new stage command.
    pub fn new(store: FileStageStore, args: StageArgs) -> Self {
        Self { store, args }
    }
}

/// Values are JSON when they parse as JSON; anything else is stored as a
/// plain string so `braid stage push X hello` does what it looks like.
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

impl Command for StageCommand {
    fn execute(&self) -> Result<CommandResult> {
        match &self.args.op {
            StageOp::Enter { name, force } => {
                self.store.enter(name, *force)?;
            }
            StageOp::Exit { name } => {
                self.store.exit(name)?;
            }
            StageOp::Push { name, value } => {
                self.store.push(name, parse_value(value))?;
            }
            StageOp::Pop { name } => {
                let value = self.store.pop(name)?;
                println!("{}", serde_json::to_string(&value)?);
            }
            StageOp::Peek { name } => {
                let value = self.store.peek(name)?;
                println!("{}", serde_json::to_string(&value)?);
            }
            StageOp::Show { name } => {
                let entries = self.store.entries(name)?;
                println!("{}", serde_json::to_string(&entries)?);
            }
        }
        Ok(CommandResult::success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn command(temp: &TempDir, op: StageOp) -> StageCommand {
        StageCommand::new(FileStageStore::new(temp.path()), StageArgs { op })
    }

    #[test]
    fn enter_push_pop_exit_round_trip() {
        let temp = TempDir::new().unwrap();

        command(
            &temp,
            StageOp::Enter {
                name: "X".to_string(),
                force: false,
            },
        )
        .execute()
        .unwrap();
        command(
            &temp,
            StageOp::Push {
                name: "X".to_string(),
                value: r#"{"k":1}"#.to_string(),
            },
        )
        .execute()
        .unwrap();

        let store = FileStageStore::new(temp.path());
        assert_eq!(store.peek("X").unwrap(), json!({"k": 1}));

        command(
            &temp,
            StageOp::Exit {
                name: "X".to_string(),
            },
        )
        .execute()
        .unwrap();
        assert!(!store.exists("X"));
    }

    #[test]
    fn pop_on_missing_stage_is_an_error() {
        let temp = TempDir::new().unwrap();
        let result = command(
            &temp,
            StageOp::Pop {
                name: "ghost".to_string(),
            },
        )
        .execute();
        assert!(result.is_err());
    }

    #[test]
    fn non_json_values_are_stored_as_strings() {
        assert_eq!(parse_value("hello"), json!("hello"));
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value(r#"{"k":1}"#), json!({"k": 1}));
    }
}
