//! Command implementations.
//!
//! Each CLI subcommand has its own module. [`build_runtime`] performs the
//! shared setup: load and validate the actions file, assemble the typed
//! evaluation configuration from global flags, and wire up the evaluation
//! context (registry, stage store, cancellation token, self-invocation).

pub mod completions;
pub mod dispatcher;
pub mod eval;
pub mod list;
pub mod run;
pub mod stage;

pub use dispatcher::{Command, CommandDispatcher, CommandResult};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::cli::args::Cli;
use crate::combinator::{EvalConfig, EvalContext};
use crate::error::{BraidError, Result};
use crate::exec::SelfExec;
use crate::registry::{ActionsFile, Hooks};
use crate::stage::FileStageStore;
use crate::supervisor::CancelToken;

/// Everything the evaluating commands share.
#[derive(Debug)]
pub struct Runtime {
    pub ctx: EvalContext,
    pub hooks: Hooks,
}

/// The stage directory for this invocation.
fn stage_dir(project_root: &Path, cli: &Cli) -> PathBuf {
    cli.stage_dir
        .clone()
        .unwrap_or_else(|| FileStageStore::default_dir(project_root))
}

/// The stage store used by both evaluation and the `stage` subcommand.
pub(crate) fn stage_store(project_root: &Path, cli: &Cli) -> FileStageStore {
    FileStageStore::new(stage_dir(project_root, cli))
}

/// Load the actions file and assemble the evaluation context.
pub(crate) fn build_runtime(project_root: &Path, cli: &Cli) -> Result<Runtime> {
    // An explicit --file must exist; the default location is optional and
    // its absence means built-ins only.
    let (actions_path, file) = match &cli.file {
        Some(path) => {
            let path = absolute(project_root, path);
            let file = ActionsFile::load(&path)?;
            (path, file)
        }
        None => {
            let path = project_root.join("braid.yml");
            let file = ActionsFile::load_or_default(&path)?;
            (path, file)
        }
    };
    let base_dir = actions_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| project_root.to_path_buf());
    let (registry, hooks) = file.into_registry(&base_dir)?;

    // Range-check before Duration::from_secs_f64, which panics on values it
    // cannot represent. The upper bound matches EvalConfig::validate's cap.
    let interval = cli.interval.unwrap_or(1.0);
    if !interval.is_finite() || interval < 0.0 || interval > 3600.0 {
        return Err(BraidError::ConfigValidation {
            message: format!(
                "interval must be between 0 and 3600 seconds, got {interval}"
            ),
        });
    }
    let config = EvalConfig {
        retry_interval: Duration::from_secs_f64(interval),
        jobs: cli.jobs.unwrap_or(0),
        cancel_on_failure: cli.cancel_on_failure,
        quiet: cli.quiet,
        verbose: cli.verbose,
        nested: cli.nested,
    };
    config.validate()?;

    let stages = stage_dir(project_root, cli);
    let mut ctx = EvalContext::new(
        Arc::new(registry),
        Arc::new(FileStageStore::new(&stages)),
    );
    ctx.cancel = CancelToken::watching_signals();
    ctx.self_exec = Some(SelfExec::from_current_exe(nested_args(
        &actions_path,
        &stages,
        &config,
        interval,
    ))?);
    ctx.config = config;

    Ok(Runtime { ctx, hooks })
}

/// Global flags a nested invocation needs to see the same world.
fn nested_args(
    actions_path: &Path,
    stage_dir: &Path,
    config: &EvalConfig,
    interval: f64,
) -> Vec<String> {
    let mut args = vec!["--nested".to_string()];
    if actions_path.exists() {
        args.push("--file".to_string());
        args.push(actions_path.display().to_string());
    }
    args.push("--stage-dir".to_string());
    args.push(stage_dir.display().to_string());
    args.push("--interval".to_string());
    args.push(interval.to_string());
    args.push("--jobs".to_string());
    args.push(config.jobs.to_string());
    if config.cancel_on_failure {
        args.push("--cancel-on-failure".to_string());
    }
    if config.quiet {
        args.push("--quiet".to_string());
    }
    if config.verbose {
        args.push("--verbose".to_string());
    }
    args
}

/// Resolve a user-supplied path against the project root.
fn absolute(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}
