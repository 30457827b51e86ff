//! Process execution substrate.
//!
//! Everything that touches child processes lives here: spawning an
//! [`crate::registry::Invocation`] with deadline and cancellation handling
//! ([`command`]), the buffered stdout-to-stdin pipeline engine
//! ([`pipeline`]) and the concurrent fan-out/fan-in engine ([`join`]).

pub mod command;
pub mod join;
pub mod pipeline;

pub use command::{run_invocation, spawn_detached, ExecOptions, ExecOutcome};
pub use join::{combine_statuses, run_join, JoinJob, JoinOptions, JoinOutput};
pub use pipeline::{run_pipeline, PipelineOptions, PipelineOutcome};

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::registry::{CommandSpec, Invocation};

/// Process ids of currently running children, shared with the supervisor so
/// cancellation can sweep whole process groups. Each child runs in its own
/// group with pgid equal to its pid.
#[derive(Debug, Clone, Default)]
pub struct ProcessTable {
    pids: Arc<Mutex<HashSet<u32>>>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, pid: u32) {
        self.pids.lock().unwrap().insert(pid);
    }

    pub fn unregister(&self, pid: u32) {
        self.pids.lock().unwrap().remove(&pid);
    }

    pub fn len(&self) -> usize {
        self.pids.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.lock().unwrap().is_empty()
    }

    /// Send SIGTERM to every registered process group. Best-effort: dead
    /// processes are ignored.
    pub fn terminate_all(&self) {
        let pids: Vec<u32> = self.pids.lock().unwrap().iter().copied().collect();
        for pid in pids {
            tracing::debug!(pid, "terminating process group");
            command::terminate_group(pid);
        }
    }
}

/// Builds recursive runner invocations: a composite expression handed to
/// `timeout`, `delay` or a captured `join` child re-enters the runtime as
/// `braid --nested ... eval <expr>` so it forms one killable process group.
#[derive(Debug, Clone)]
pub struct SelfExec {
    program: PathBuf,
    base_args: Vec<String>,
}

impl SelfExec {
    pub fn new(program: PathBuf, base_args: Vec<String>) -> Self {
        Self { program, base_args }
    }

    /// Locate the running binary.
    pub fn from_current_exe(base_args: Vec<String>) -> Result<Self> {
        Ok(Self::new(std::env::current_exe()?, base_args))
    }

    /// Invocation evaluating `expr` in a nested runtime, optionally sleeping
    /// `after` seconds first (the delay combinator's detached form).
    pub fn invocation(&self, expr: &str, after: Option<u64>) -> Invocation {
        let mut args = self.base_args.clone();
        args.push("eval".to_string());
        if let Some(secs) = after {
            args.push("--after".to_string());
            args.push(secs.to_string());
        }
        args.push(expr.to_string());

        Invocation {
            label: expr.to_string(),
            command: CommandSpec::Program {
                program: self.program.clone(),
                args,
            },
            env: Default::default(),
            cwd: None,
        }
    }
}
