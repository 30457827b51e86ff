//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct. Evaluation settings carry
//! `BRAID_*` environment fallbacks so shell actions can configure nested
//! invocations without threading flags through.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Braid - combinator-based workflow runner.
#[derive(Debug, Parser)]
#[command(name = "braid")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the actions file (overrides default braid.yml)
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// Directory holding stage stacks (overrides default .braid/stages)
    #[arg(long, global = true, env = "BRAID_STAGE_DIR")]
    pub stage_dir: Option<PathBuf>,

    /// Discard child process output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log per-child detail and intermediate pipeline buffers
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Seconds between retry attempts and until iterations
    #[arg(long, global = true, env = "BRAID_INTERVAL")]
    pub interval: Option<f64>,

    /// Maximum concurrent children under par/join (0 = unbounded)
    #[arg(short, long, global = true, env = "BRAID_JOBS")]
    pub jobs: Option<usize>,

    /// Terminate running siblings when a par/join child fails
    #[arg(long, global = true, env = "BRAID_CANCEL_ON_FAILURE")]
    pub cancel_on_failure: bool,

    /// This invocation was spawned by another braid process
    #[arg(long, global = true, hide = true)]
    pub nested: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Evaluate an expression under supervision (signal trap and hooks)
    Run(RunArgs),

    /// Evaluate an expression without supervision or hooks
    Eval(EvalArgs),

    /// List registered actions
    List(ListArgs),

    /// Manipulate stage stacks
    Stage(StageArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `run` command.
#[derive(Debug, Clone, clap::Args)]
pub struct RunArgs {
    /// Combinator expression to evaluate
    pub expr: String,
}

/// Arguments for the `eval` command.
#[derive(Debug, Clone, clap::Args)]
pub struct EvalArgs {
    /// Combinator expression to evaluate
    pub expr: String,

    /// Sleep this many seconds before evaluating (delay re-invocation)
    #[arg(long, hide = true)]
    pub after: Option<u64>,
}

/// Arguments for the `list` command.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `stage` command.
#[derive(Debug, Clone, clap::Args)]
pub struct StageArgs {
    #[command(subcommand)]
    pub op: StageOp,
}

/// Stage stack operations, meant for use from inside shell actions.
#[derive(Debug, Clone, Subcommand)]
pub enum StageOp {
    /// Open a stage with an empty stack
    Enter {
        /// Stage name
        name: String,

        /// Reset the stage if it is already open
        #[arg(long)]
        force: bool,
    },

    /// Close a stage and discard its stack
    Exit {
        /// Stage name
        name: String,
    },

    /// Append a record to a stage's stack
    Push {
        /// Stage name
        name: String,

        /// Record to push; parsed as JSON, stored as a plain string if it
        /// does not parse
        value: String,
    },

    /// Remove and print the last-in record
    Pop {
        /// Stage name
        name: String,
    },

    /// Print the last-in record without removing it
    Peek {
        /// Stage name
        name: String,
    },

    /// Print the whole stack, oldest first
    Show {
        /// Stage name
        name: String,
    },
}

/// Arguments for the `completions` command.
#[derive(Debug, Clone, clap::Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
