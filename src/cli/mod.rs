//! Command-line interface for Braid.
//!
//! This module provides the CLI argument parsing using clap's derive macros
//! and command implementations.
//!
//! # Architecture
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations and the dispatcher

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, CompletionsArgs, EvalArgs, ListArgs, RunArgs, StageArgs, StageOp};
pub use commands::{Command, CommandDispatcher, CommandResult};
