//! Buffered pipeline engine.
//!
//! Runs stages strictly in order, capturing each stage's entire stdout into
//! a buffer and feeding it to the next stage's stdin. Buffering instead of
//! a real OS pipe keeps stderr and stdout from interleaving across stage
//! boundaries, and guarantees stage K+1 never starts before stage K's
//! process has fully exited.

use crate::error::Result;
use crate::exec::command::{run_invocation, ExecOptions};
use crate::exec::ProcessTable;
use crate::registry::Invocation;
use crate::status::Status;
use crate::supervisor::CancelToken;

/// Options for a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    /// Discard stderr of the stages.
    pub quiet: bool,

    /// Log a preview of each intermediate buffer.
    pub verbose: bool,

    /// Cancellation token checked while each stage runs.
    pub cancel: Option<CancelToken>,

    /// Keep stage processes in this process's group (nested invocations).
    pub inherit_group: bool,
}

/// Result of a pipeline run.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub status: Status,

    /// The final stage's captured stdout; empty when a stage failed.
    pub output: Vec<u8>,
}

/// Run the stages of a pipeline. Failure of stage K aborts the remaining
/// stages and propagates K's status.
pub fn run_pipeline(
    stages: &[Invocation],
    options: &PipelineOptions,
    table: &ProcessTable,
) -> Result<PipelineOutcome> {
    let mut buffer: Option<Vec<u8>> = None;

    for (index, stage) in stages.iter().enumerate() {
        let exec_options = ExecOptions {
            stdin: buffer.take(),
            capture_stdout: true,
            quiet: options.quiet,
            cancel: options.cancel.clone(),
            inherit_group: options.inherit_group,
            ..Default::default()
        };

        let outcome = run_invocation(stage, &exec_options, table)?;

        if outcome.interrupted {
            return Ok(PipelineOutcome {
                status: Status::interrupted(),
                output: Vec::new(),
            });
        }
        if !outcome.status.success() {
            tracing::debug!(
                stage = %stage.label,
                status = %outcome.status,
                "pipeline stage failed, aborting"
            );
            return Ok(PipelineOutcome {
                status: outcome.status,
                output: Vec::new(),
            });
        }

        let bytes = outcome.stdout.unwrap_or_default();
        if options.verbose && index + 1 < stages.len() {
            tracing::info!(
                stage = %stage.label,
                bytes = bytes.len(),
                preview = %preview(&bytes),
                "pipeline stage output"
            );
        }
        buffer = Some(bytes);
    }

    Ok(PipelineOutcome {
        status: Status::OK,
        output: buffer.unwrap_or_default(),
    })
}

fn preview(bytes: &[u8]) -> String {
    const LIMIT: usize = 120;
    let text = String::from_utf8_lossy(&bytes[..bytes.len().min(LIMIT)]);
    let mut line = text.replace('\n', "\\n");
    if bytes.len() > LIMIT {
        line.push('…');
    }
    line
}
