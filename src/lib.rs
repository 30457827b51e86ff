//! Braid - combinator-based workflow runner.
//!
//! Braid composes named shell-backed actions with control-flow combinators
//! (sequence, choice, negation, conditionals, try/except/finally, retry,
//! timeout, delay, parallel fan-out, join, pipelines, loops and staged
//! checkpoints) and evaluates the resulting expression tree as a
//! coordinated set of child processes.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`combinator`] - Expression trees, parsing, and evaluation
//! - [`error`] - Error types and result aliases
//! - [`exec`] - Process execution substrate (spawning, pipelines, fan-out)
//! - [`registry`] - Action registry and actions file loading
//! - [`stage`] - Persisted stage checkpoint stacks
//! - [`status`] - The exit-status value the algebra computes with
//! - [`supervisor`] - Top-level run supervision, cancellation, and hooks
//!
//! # Example
//!
//! ```
//! use braid::combinator::{eval, EvalContext, Expr};
//! use braid::registry::ActionRegistry;
//! use braid::stage::MemoryStageStore;
//! use std::sync::Arc;
//!
//! let registry = ActionRegistry::with_builtins();
//! let ctx = EvalContext::new(Arc::new(registry), Arc::new(MemoryStageStore::new()));
//!
//! let expr = Expr::parse("or(fail, pass)").unwrap();
//! let status = eval(&expr, &ctx).unwrap();
//! assert!(status.success());
//! ```

pub mod cli;
pub mod combinator;
pub mod error;
pub mod exec;
pub mod registry;
pub mod stage;
pub mod status;
pub mod supervisor;

pub use error::{BraidError, Result};
