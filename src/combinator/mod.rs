//! Combinator expressions and their evaluation.
//!
//! [`expr`] defines the expression tree and parser, [`config`] the typed
//! per-run configuration, and [`eval`] the evaluator. Evaluation is driven
//! by an explicit [`EvalContext`]: registry, stage store, cancellation
//! token, process table and configuration travel together instead of living
//! in globals.

pub mod config;
pub mod eval;
pub mod expr;

pub use config::EvalConfig;
pub use eval::eval;
pub use expr::{ActionRef, Expr};

use std::fmt;
use std::sync::Arc;

use crate::exec::{ProcessTable, SelfExec};
use crate::registry::ActionRegistry;
use crate::stage::StageStore;
use crate::supervisor::CancelToken;

/// Everything an evaluation needs, passed explicitly to every combinator.
#[derive(Clone)]
pub struct EvalContext {
    pub registry: Arc<ActionRegistry>,
    pub stages: Arc<dyn StageStore>,
    pub cancel: CancelToken,
    pub processes: ProcessTable,
    pub config: EvalConfig,

    /// How to re-enter the runtime for composite targets of `timeout`,
    /// `delay` and captured `join` children. Absent in embedded/test use,
    /// where those forms fail with a configuration error.
    pub self_exec: Option<SelfExec>,
}

// The stage store is a trait object; skip it.
impl fmt::Debug for EvalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalContext")
            .field("registry", &self.registry)
            .field("cancel", &self.cancel)
            .field("config", &self.config)
            .field("self_exec", &self.self_exec)
            .finish_non_exhaustive()
    }
}

impl EvalContext {
    pub fn new(registry: Arc<ActionRegistry>, stages: Arc<dyn StageStore>) -> Self {
        Self {
            registry,
            stages,
            cancel: CancelToken::new(),
            processes: ProcessTable::new(),
            config: EvalConfig::default(),
            self_exec: None,
        }
    }

    /// A context for supervisor hooks: same world, fresh cancellation
    /// token, so hooks run even after the run itself was cancelled.
    pub fn detached(&self) -> Self {
        let mut ctx = self.clone();
        ctx.cancel = CancelToken::new();
        ctx
    }
}
