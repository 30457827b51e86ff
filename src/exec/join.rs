//! Concurrent fan-out/fan-in engine.
//!
//! Launches every child, then blocks at a barrier until all of them have
//! finished. There is no ordering guarantee among children before the
//! barrier, and by default a failing child does not cancel its siblings;
//! `cancel_on_failure` opts in to stopping unstarted children and
//! terminating running ones when a sibling fails.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use crate::error::Result;
use crate::exec::ProcessTable;
use crate::status::Status;

/// One concurrent child: a label for logs plus the work itself.
pub struct JoinJob<'a> {
    pub label: String,
    pub run: Box<dyn FnOnce() -> Result<JoinOutput> + Send + 'a>,
}

/// What a child produced.
#[derive(Debug)]
pub struct JoinOutput {
    pub status: Status,

    /// Captured stdout, when the caller asked for capture.
    pub stdout: Option<Vec<u8>>,
}

/// Options for a fan-out run.
#[derive(Debug, Clone, Default)]
pub struct JoinOptions {
    /// Maximum concurrent children; 0 means unbounded.
    pub jobs: usize,

    /// Terminate running siblings and skip unstarted ones when a child
    /// fails. Off by default: all children run to the barrier.
    pub cancel_on_failure: bool,
}

/// Run all jobs and wait at the barrier.
///
/// The result vector is in child order. `None` marks a child skipped by
/// sibling cancellation; otherwise the slot holds the child's outcome or
/// the infrastructure error it hit.
pub fn run_join<'a>(
    jobs: Vec<JoinJob<'a>>,
    options: &JoinOptions,
    table: &ProcessTable,
) -> Vec<Option<Result<JoinOutput>>> {
    let count = jobs.len();
    if count == 0 {
        return Vec::new();
    }

    let slots: Vec<Mutex<Option<JoinJob<'a>>>> =
        jobs.into_iter().map(|j| Mutex::new(Some(j))).collect();
    let results: Vec<Mutex<Option<Result<JoinOutput>>>> =
        (0..count).map(|_| Mutex::new(None)).collect();
    let next = AtomicUsize::new(0);
    let failed = AtomicBool::new(false);

    let workers = if options.jobs == 0 {
        count
    } else {
        options.jobs.min(count)
    };

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::SeqCst);
                if index >= count {
                    break;
                }
                if options.cancel_on_failure && failed.load(Ordering::SeqCst) {
                    continue;
                }

                let job = slots[index]
                    .lock()
                    .unwrap()
                    .take()
                    .expect("each job is taken once");
                tracing::debug!(child = %job.label, "launching");
                let outcome = (job.run)();

                let child_failed = match &outcome {
                    Ok(output) => !output.status.success(),
                    Err(_) => true,
                };
                if child_failed && options.cancel_on_failure && !failed.swap(true, Ordering::SeqCst)
                {
                    tracing::debug!("sibling failed, cancelling remaining children");
                    table.terminate_all();
                }

                *results[index].lock().unwrap() = Some(outcome);
            });
        }
    });

    results
        .into_iter()
        .map(|slot| slot.into_inner().unwrap())
        .collect()
}

/// Fold per-child results into the combinator's status: 0 only when every
/// child that ran returned 0, otherwise the first nonzero in child order.
/// The first infrastructure error any child hit is propagated. Skipped
/// children (sibling cancellation) count as failures.
pub fn combine_statuses(
    results: Vec<Option<Result<JoinOutput>>>,
) -> Result<(Status, Vec<Option<JoinOutput>>)> {
    let mut outputs = Vec::with_capacity(results.len());
    let mut status = Status::OK;
    let mut skipped = false;

    for slot in results {
        match slot {
            Some(Ok(output)) => {
                if status.success() && !output.status.success() {
                    status = output.status;
                }
                outputs.push(Some(output));
            }
            Some(Err(e)) => return Err(e),
            None => {
                skipped = true;
                outputs.push(None);
            }
        }
    }

    if skipped && status.success() {
        // Skipping only happens after a failure was observed.
        status = Status::FAIL;
    }
    Ok((status, outputs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn job<'a>(label: &str, f: impl FnOnce() -> Result<JoinOutput> + Send + 'a) -> JoinJob<'a> {
        JoinJob {
            label: label.to_string(),
            run: Box::new(f),
        }
    }

    fn ok_after(delay: Duration) -> Result<JoinOutput> {
        thread::sleep(delay);
        Ok(JoinOutput {
            status: Status::OK,
            stdout: None,
        })
    }

    #[test]
    fn barrier_waits_for_all_children() {
        let table = ProcessTable::new();
        let start = Instant::now();

        let results = run_join(
            vec![
                job("fast", || ok_after(Duration::from_millis(50))),
                job("slow", || ok_after(Duration::from_millis(300))),
            ],
            &JoinOptions::default(),
            &table,
        );

        assert!(start.elapsed() >= Duration::from_millis(300));
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.is_some()));
    }

    #[test]
    fn children_run_concurrently() {
        let table = ProcessTable::new();
        let start = Instant::now();

        run_join(
            vec![
                job("a", || ok_after(Duration::from_millis(200))),
                job("b", || ok_after(Duration::from_millis(200))),
                job("c", || ok_after(Duration::from_millis(200))),
            ],
            &JoinOptions::default(),
            &table,
        );

        // Bounded by the longest child, not the sum.
        assert!(start.elapsed() < Duration::from_millis(550));
    }

    #[test]
    fn jobs_cap_limits_concurrency() {
        let table = ProcessTable::new();
        let start = Instant::now();

        run_join(
            vec![
                job("a", || ok_after(Duration::from_millis(150))),
                job("b", || ok_after(Duration::from_millis(150))),
            ],
            &JoinOptions {
                jobs: 1,
                ..Default::default()
            },
            &table,
        );

        // Serialized by the cap.
        assert!(start.elapsed() >= Duration::from_millis(300));
    }

    #[test]
    fn failing_child_does_not_cancel_siblings_by_default() {
        let table = ProcessTable::new();

        let results = run_join(
            vec![
                job("boom", || {
                    Ok(JoinOutput {
                        status: Status::from_code(7),
                        stdout: None,
                    })
                }),
                job("late", || ok_after(Duration::from_millis(100))),
            ],
            &JoinOptions::default(),
            &table,
        );

        // Both ran; overall status is the first nonzero.
        assert!(results.iter().all(|r| r.is_some()));
        let (status, _) = combine_statuses(results).unwrap();
        assert_eq!(status.code(), 7);
    }

    #[test]
    fn cancel_on_failure_skips_unstarted_children() {
        let table = ProcessTable::new();

        let results = run_join(
            vec![
                job("boom", || {
                    Ok(JoinOutput {
                        status: Status::FAIL,
                        stdout: None,
                    })
                }),
                job("skipped", || ok_after(Duration::from_millis(50))),
            ],
            &JoinOptions {
                jobs: 1,
                cancel_on_failure: true,
            },
            &table,
        );

        assert!(results[0].is_some());
        assert!(results[1].is_none());
        let (status, outputs) = combine_statuses(results).unwrap();
        assert!(!status.success());
        assert!(outputs[1].is_none());
    }

    #[test]
    fn combine_statuses_all_ok() {
        let results = vec![Some(Ok(JoinOutput {
            status: Status::OK,
            stdout: None,
        }))];
        let (status, _) = combine_statuses(results).unwrap();
        assert!(status.success());
    }
}
