//! Top-level run supervision.
//!
//! One supervisor exists per `braid run`. It installs the cancellation
//! trap (SIGINT on unix), hands the evaluator an explicit [`CancelToken`],
//! and owns the end-of-run protocol: on cancellation run the configured
//! interrupt action with hooks disabled, sweep any still-running process
//! groups, then always run the exit hooks before the final status reaches
//! the caller. Children are owned directly, so exit statuses come straight
//! from `wait()`; there is no cross-process side channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::combinator::{eval, EvalContext};
use crate::error::Result;
use crate::registry::Hooks;
use crate::status::Status;

/// Set by the signal handler; the only state a handler can safely touch.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Explicit cancellation token carried in the evaluation context.
///
/// Tests and embedders cancel via [`CancelToken::cancel`]; a token created
/// with [`CancelToken::watching_signals`] additionally observes the
/// process-wide interrupt trap installed by the supervisor.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    watch_signals: bool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that also fires when the interrupt trap fires.
    pub fn watching_signals() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            watch_signals: true,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || (self.watch_signals && INTERRUPTED.load(Ordering::SeqCst))
    }
}

/// Install the SIGINT trap. Safe to call more than once.
#[cfg(unix)]
fn install_interrupt_trap() {
    extern "C" fn on_sigint(_sig: libc::c_int) {
        INTERRUPTED.store(true, Ordering::SeqCst);
    }

    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = on_sigint as usize;
        libc::sigemptyset(&mut action.sa_mask);
        libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut());
    }
}

#[cfg(not(unix))]
fn install_interrupt_trap() {}

/// Supervises one top-level invocation.
pub struct Supervisor {
    hooks: Hooks,
}

impl Supervisor {
    pub fn new(hooks: Hooks) -> Self {
        Self { hooks }
    }

    /// Run `expr` under supervision and return its final status.
    ///
    /// Exit hooks always run, whatever the evaluation did; a hook's own
    /// failure is logged and does not override the run's status.
    pub fn run(&self, expr: &crate::combinator::Expr, ctx: &EvalContext) -> Result<Status> {
        install_interrupt_trap();
        tracing::debug!(pid = std::process::id(), expr = %expr, "supervisor start");

        let result = eval(expr, ctx);

        if ctx.cancel.is_cancelled() {
            tracing::info!("run cancelled");
            self.run_interrupt_hook(ctx);
            ctx.processes.terminate_all();
        }

        self.run_exit_hooks(ctx);

        match &result {
            Ok(status) => tracing::debug!(status = %status, "supervisor exit"),
            Err(e) => tracing::debug!(error = %e, "supervisor exit"),
        }
        result
    }

    fn run_interrupt_hook(&self, ctx: &EvalContext) {
        let Some(name) = &self.hooks.on_interrupt else {
            return;
        };
        tracing::info!(action = %name, "running interrupt action");
        // Hooks run with a fresh token: the cancelled one would stop them
        // before they start.
        let hook_ctx = ctx.detached();
        if let Err(e) = run_hook_action(name, &hook_ctx) {
            tracing::warn!(action = %name, error = %e, "interrupt action failed");
        }
    }

    fn run_exit_hooks(&self, ctx: &EvalContext) {
        if self.hooks.on_exit.is_empty() {
            return;
        }
        let hook_ctx = ctx.detached();
        for name in &self.hooks.on_exit {
            tracing::debug!(action = %name, "running exit hook");
            match run_hook_action(name, &hook_ctx) {
                Ok(status) if !status.success() => {
                    tracing::warn!(action = %name, status = %status, "exit hook failed");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(action = %name, error = %e, "exit hook failed");
                }
            }
        }
    }
}

fn run_hook_action(name: &str, ctx: &EvalContext) -> Result<Status> {
    let expr = crate::combinator::Expr::Action(crate::combinator::ActionRef {
        name: name.to_string(),
        args: Vec::new(),
    });
    eval(&expr, ctx)
}
