//! Combinator evaluation.
//!
//! One rule per combinator, applied recursively. Sequential combinators are
//! strictly left-to-right; `par`/`join` order children only at the barrier.
//! The evaluator computes with [`Status`] values (a nonzero child status is
//! data, not an error) and checks the context's cancellation token before
//! every step.

use std::io::Write;
use std::thread;

use crate::combinator::{ActionRef, EvalContext, Expr};
use crate::error::{BraidError, Result};
use crate::exec::{
    combine_statuses, run_invocation, run_join, run_pipeline, spawn_detached, ExecOptions,
    JoinJob, JoinOptions, JoinOutput, PipelineOptions,
};
use crate::registry::Invocation;
use crate::status::Status;

/// Evaluate an expression against a context.
pub fn eval(expr: &Expr, ctx: &EvalContext) -> Result<Status> {
    if ctx.cancel.is_cancelled() {
        return Ok(Status::interrupted());
    }

    match expr {
        Expr::Action(action) => run_action(action, ctx),

        Expr::And(children) => {
            for child in children {
                let status = eval(child, ctx)?;
                if !status.success() {
                    tracing::debug!(child = %child, status = %status, "and: short-circuit");
                    return Ok(status);
                }
            }
            Ok(Status::OK)
        }

        Expr::Or(children) => {
            let mut last = Status::FAIL;
            for child in children {
                last = eval(child, ctx)?;
                if last.success() {
                    return Ok(Status::OK);
                }
            }
            Ok(last)
        }

        Expr::Not(target) => Ok(eval(target, ctx)?.invert()),

        Expr::If { cond, then } => {
            if eval(cond, ctx)?.success() {
                eval(then, ctx)
            } else {
                // A failing condition is swallowed.
                Ok(Status::OK)
            }
        }

        Expr::IfElse {
            cond,
            then,
            otherwise,
        } => {
            if eval(cond, ctx)?.success() {
                eval(then, ctx)
            } else {
                eval(otherwise, ctx)
            }
        }

        Expr::Try {
            body,
            handler,
            finally,
        } => {
            let primary = match eval(body, ctx) {
                Ok(status) if status.success() => Ok(status),
                Ok(status) => {
                    tracing::debug!(status = %status, "try: body failed, running handler");
                    eval(handler, ctx)
                }
                Err(e) => Err(e),
            };

            // Finally always runs and never masks the primary status.
            if let Some(fin) = finally {
                match eval(fin, ctx) {
                    Ok(status) if !status.success() => {
                        tracing::warn!(status = %status, "finally branch failed");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(error = %e, "finally branch failed"),
                }
            }

            primary
        }

        Expr::Retry { attempts, target } => {
            let mut last = Status::FAIL;
            for attempt in 1..=*attempts {
                if ctx.cancel.is_cancelled() {
                    return Ok(Status::interrupted());
                }
                last = eval(target, ctx)?;
                if last.success() {
                    break;
                }
                if attempt < *attempts {
                    tracing::debug!(attempt, status = %last, "retrying");
                    thread::sleep(ctx.config.retry_interval);
                }
            }
            Ok(last)
        }

        Expr::Loop { times, target } => {
            let mut last = Status::OK;
            for _ in 0..*times {
                if ctx.cancel.is_cancelled() {
                    return Ok(Status::interrupted());
                }
                last = eval(target, ctx)?;
            }
            Ok(last)
        }

        Expr::Until(target) => loop {
            if ctx.cancel.is_cancelled() {
                return Ok(Status::interrupted());
            }
            if eval(target, ctx)?.success() {
                return Ok(Status::OK);
            }
            thread::sleep(ctx.config.retry_interval);
        },

        Expr::Timeout { seconds, target } => {
            let invocation = expr_invocation(target, ctx)?;
            // The target always leads its own group: deadline enforcement
            // signals the group as a whole.
            let options = ExecOptions {
                deadline: Some(std::time::Duration::from_secs(*seconds)),
                quiet: ctx.config.quiet,
                cancel: Some(ctx.cancel.clone()),
                ..Default::default()
            };
            let outcome = run_invocation(&invocation, &options, &ctx.processes)?;
            if outcome.interrupted {
                Ok(Status::interrupted())
            } else if outcome.timed_out {
                // Timeout wins silently: the killed run's status is not
                // propagated as failure.
                tracing::info!(target = %target, seconds, "timed out, process group terminated");
                Ok(Status::OK)
            } else {
                Ok(outcome.status)
            }
        }

        Expr::Delay { seconds, target } => {
            let self_exec = ctx.self_exec.as_ref().ok_or_else(|| {
                BraidError::ConfigValidation {
                    message: "delay requires the braid binary for detached invocation".to_string(),
                }
            })?;
            let invocation = self_exec.invocation(&target.to_string(), Some(*seconds));
            spawn_detached(&invocation)?;
            tracing::debug!(target = %target, seconds, "scheduled");
            Ok(Status::OK)
        }

        Expr::Par(children) => {
            let jobs = children
                .iter()
                .map(|child| JoinJob {
                    label: child.to_string(),
                    run: Box::new(move || {
                        eval(child, ctx).map(|status| JoinOutput {
                            status,
                            stdout: None,
                        })
                    }),
                })
                .collect();
            let results = run_join(jobs, &join_options(ctx), &ctx.processes);
            let (status, _) = combine_statuses(results)?;
            Ok(status)
        }

        Expr::Join(children) => {
            let jobs = children
                .iter()
                .map(|child| JoinJob {
                    label: child.to_string(),
                    run: Box::new(move || {
                        let invocation = expr_invocation(child, ctx)?;
                        let options = ExecOptions {
                            capture_stdout: true,
                            quiet: ctx.config.quiet,
                            cancel: Some(ctx.cancel.clone()),
                            inherit_group: ctx.config.nested,
                            ..Default::default()
                        };
                        let outcome = run_invocation(&invocation, &options, &ctx.processes)?;
                        Ok(JoinOutput {
                            status: if outcome.interrupted {
                                Status::interrupted()
                            } else {
                                outcome.status
                            },
                            stdout: outcome.stdout,
                        })
                    }),
                })
                .collect();
            let results = run_join(jobs, &join_options(ctx), &ctx.processes);
            let (status, outputs) = combine_statuses(results)?;

            // Children finished in arbitrary order; their captured output is
            // reassembled in child order after the barrier.
            if !ctx.config.quiet {
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                for output in outputs.iter().flatten() {
                    if let Some(bytes) = &output.stdout {
                        out.write_all(bytes)?;
                    }
                }
                out.flush()?;
            }
            Ok(status)
        }

        Expr::Pipe(stages) => {
            let invocations = stages
                .iter()
                .map(|stage| expr_invocation(stage, ctx))
                .collect::<Result<Vec<_>>>()?;
            let options = PipelineOptions {
                quiet: ctx.config.quiet,
                verbose: ctx.config.verbose,
                cancel: Some(ctx.cancel.clone()),
                inherit_group: ctx.config.nested,
            };
            let outcome = run_pipeline(&invocations, &options, &ctx.processes)?;
            if outcome.status.success() && !ctx.config.quiet {
                let stdout = std::io::stdout();
                let mut out = stdout.lock();
                out.write_all(&outcome.output)?;
                out.flush()?;
            }
            Ok(outcome.status)
        }

        Expr::StageEnter(name) => {
            ctx.stages.enter(name, false)?;
            tracing::debug!(stage = %name, "stage opened");
            Ok(Status::OK)
        }

        Expr::StageExit(name) => {
            ctx.stages.exit(name)?;
            tracing::debug!(stage = %name, "stage closed");
            Ok(Status::OK)
        }
    }
}

fn run_action(action: &ActionRef, ctx: &EvalContext) -> Result<Status> {
    let invocation = ctx.registry.resolve(&action.name, &action.args)?;
    let options = ExecOptions {
        quiet: ctx.config.quiet,
        cancel: Some(ctx.cancel.clone()),
        inherit_group: ctx.config.nested,
        ..Default::default()
    };
    let outcome = run_invocation(&invocation, &options, &ctx.processes)?;
    if outcome.interrupted {
        Ok(Status::interrupted())
    } else {
        Ok(outcome.status)
    }
}

/// The invocation a combinator hands to the process substrate: leaf actions
/// resolve through the registry; composite expressions re-enter the runtime
/// so they form a single killable process group.
fn expr_invocation(expr: &Expr, ctx: &EvalContext) -> Result<Invocation> {
    match expr {
        Expr::Action(action) => ctx.registry.resolve(&action.name, &action.args),
        _ => {
            let self_exec =
                ctx.self_exec
                    .as_ref()
                    .ok_or_else(|| BraidError::ConfigValidation {
                        message: format!(
                            "composite target '{}' requires the braid binary for recursive invocation",
                            expr
                        ),
                    })?;
            Ok(self_exec.invocation(&expr.to_string(), None))
        }
    }
}

fn join_options(ctx: &EvalContext) -> JoinOptions {
    JoinOptions {
        jobs: ctx.config.jobs,
        cancel_on_failure: ctx.config.cancel_on_failure,
    }
}
