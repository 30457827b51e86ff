//! Per-run evaluation configuration.
//!
//! The original surface supplied these as implicit environment keywords;
//! here they are one typed struct with documented defaults, filled from CLI
//! flags (which themselves fall back to `BRAID_*` environment variables)
//! and validated before evaluation begins.

use std::time::Duration;

use crate::error::{BraidError, Result};

/// Typed configuration for one evaluation.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    /// Pause between retry attempts and `until` iterations. Default 1s.
    pub retry_interval: Duration,

    /// Maximum concurrent children under `par`/`join`. 0 means unbounded.
    /// Default 0.
    pub jobs: usize,

    /// Terminate running siblings and skip unstarted ones when a `par`/
    /// `join` child fails. Default false: all children run to the barrier.
    pub cancel_on_failure: bool,

    /// Discard child output.
    pub quiet: bool,

    /// Log intermediate pipeline buffers and per-child detail.
    pub verbose: bool,

    /// This runtime was spawned by another braid process. Children stay in
    /// the inherited process group so the outermost runtime's signals reach
    /// the whole tree.
    pub nested: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_secs(1),
            jobs: 0,
            cancel_on_failure: false,
            quiet: false,
            verbose: false,
            nested: false,
        }
    }
}

impl EvalConfig {
    /// Reject contradictory or unusable settings before anything runs.
    pub fn validate(&self) -> Result<()> {
        if self.quiet && self.verbose {
            return Err(BraidError::ConfigValidation {
                message: "quiet and verbose are mutually exclusive".to_string(),
            });
        }
        if self.retry_interval > Duration::from_secs(3600) {
            return Err(BraidError::ConfigValidation {
                message: "retry interval above one hour is almost certainly a typo".to_string(),
            });
        }
        Ok(())
    }
}
