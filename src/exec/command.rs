//! Invocation spawning and supervision-aware waiting.
//!
//! Every child runs in its own process group (unix), so a timeout or a
//! cancellation can signal the whole descendant tree at once. Waiting is a
//! short poll loop rather than a blocking `wait()`: between polls we check
//! the deadline and the cancellation token, which is what makes `timeout`
//! and Ctrl-C responsive while a child is still running.

use std::io::{Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{BraidError, Result};
use crate::exec::ProcessTable;
use crate::registry::{CommandSpec, Invocation};
use crate::status::Status;
use crate::supervisor::CancelToken;

/// Poll interval for the wait loop.
const POLL: Duration = Duration::from_millis(25);

/// Options for running a single invocation.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Bytes fed to the child's stdin (pipeline staging). `None` inherits.
    pub stdin: Option<Vec<u8>>,

    /// Capture stdout instead of writing through.
    pub capture_stdout: bool,

    /// Discard child output entirely.
    pub quiet: bool,

    /// Terminate the child's process group after this long.
    pub deadline: Option<Duration>,

    /// Cancellation token checked while waiting.
    pub cancel: Option<CancelToken>,

    /// Pause between SIGTERM and SIGKILL when terminating.
    pub grace: Option<Duration>,

    /// Leave the child in this process's group instead of making it a
    /// group leader. Set for nested invocations, so the outermost runtime
    /// can signal the whole descendant tree with one killpg.
    pub inherit_group: bool,
}

/// Default SIGTERM-to-SIGKILL grace.
const DEFAULT_GRACE: Duration = Duration::from_millis(500);

/// Result of running an invocation.
#[derive(Debug)]
pub struct ExecOutcome {
    pub status: Status,
    pub stdout: Option<Vec<u8>>,
    pub duration: Duration,

    /// The deadline expired and the process group was terminated.
    pub timed_out: bool,

    /// The cancellation token fired and the process group was terminated.
    pub interrupted: bool,
}

fn build_command(invocation: &Invocation, inherit_group: bool) -> Command {
    let mut cmd = match &invocation.command {
        CommandSpec::Shell(line) => {
            let shell = detect_shell();
            let mut cmd = Command::new(shell);
            cmd.arg("-c").arg(line);
            cmd
        }
        CommandSpec::Program { program, args } => {
            let mut cmd = Command::new(program);
            cmd.args(args);
            cmd
        }
    };

    for (key, value) in &invocation.env {
        cmd.env(key, value);
    }
    if let Some(cwd) = &invocation.cwd {
        cmd.current_dir(cwd);
    }

    // Own process group so signals reach the whole descendant tree.
    #[cfg(unix)]
    if !inherit_group {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    #[cfg(not(unix))]
    let _ = inherit_group;

    cmd
}

fn detect_shell() -> String {
    if cfg!(target_os = "windows") {
        std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string())
    } else {
        "/bin/sh".to_string()
    }
}

fn spawn_error(invocation: &Invocation, e: std::io::Error) -> BraidError {
    BraidError::Spawn {
        command: invocation.label.clone(),
        message: e.to_string(),
    }
}

/// Run an invocation to completion.
pub fn run_invocation(
    invocation: &Invocation,
    options: &ExecOptions,
    table: &ProcessTable,
) -> Result<ExecOutcome> {
    let start = Instant::now();
    let mut cmd = build_command(invocation, options.inherit_group);

    if options.stdin.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::inherit());
    }
    if options.capture_stdout {
        cmd.stdout(Stdio::piped());
    } else if options.quiet {
        cmd.stdout(Stdio::null());
    } else {
        cmd.stdout(Stdio::inherit());
    }
    if options.quiet {
        cmd.stderr(Stdio::null());
    } else {
        cmd.stderr(Stdio::inherit());
    }

    let mut child = cmd.spawn().map_err(|e| spawn_error(invocation, e))?;
    let pid = child.id();
    table.register(pid);
    tracing::debug!(label = %invocation.label, pid, "spawned");

    // Writer thread keeps stdin feeding from deadlocking against a full
    // stdout pipe.
    let writer = options.stdin.clone().and_then(|bytes| {
        child.stdin.take().map(|mut stdin| {
            thread::spawn(move || {
                let _ = stdin.write_all(&bytes);
            })
        })
    });

    let reader = child.stdout.take().map(|mut stdout| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stdout.read_to_end(&mut buf);
            buf
        })
    });

    let grace = options.grace.unwrap_or(DEFAULT_GRACE);
    let waited = wait_with_limits(&mut child, options, grace);
    table.unregister(pid);

    if let Some(handle) = writer {
        let _ = handle.join();
    }
    let stdout = reader.map(|handle| handle.join().unwrap_or_default());

    let (exit, timed_out, interrupted) = waited.map_err(|e| spawn_error(invocation, e))?;
    let outcome = ExecOutcome {
        status: Status::from(exit),
        stdout,
        duration: start.elapsed(),
        timed_out,
        interrupted,
    };
    tracing::debug!(
        label = %invocation.label,
        status = %outcome.status,
        timed_out = outcome.timed_out,
        "reaped"
    );
    Ok(outcome)
}

/// Spawn an invocation without waiting for it (the delay combinator).
/// The child is not registered in the process table and survives this
/// process.
pub fn spawn_detached(invocation: &Invocation) -> Result<()> {
    let mut cmd = build_command(invocation, false);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::null());
    cmd.stderr(Stdio::null());
    cmd.spawn().map_err(|e| spawn_error(invocation, e))?;
    Ok(())
}

type WaitResult = std::io::Result<(ExitStatus, bool, bool)>;

/// Poll the child until it exits, the deadline expires, or the token fires.
fn wait_with_limits(child: &mut Child, options: &ExecOptions, grace: Duration) -> WaitResult {
    let deadline = options.deadline.map(|d| Instant::now() + d);

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((status, false, false));
        }

        if let Some(token) = &options.cancel {
            if token.is_cancelled() {
                let status = terminate_and_reap(child, grace)?;
                return Ok((status, false, true));
            }
        }

        if let Some(at) = deadline {
            if Instant::now() >= at {
                let status = terminate_and_reap(child, grace)?;
                return Ok((status, true, false));
            }
        }

        thread::sleep(POLL);
    }
}

/// SIGTERM the group, allow `grace` for cleanup, then SIGKILL.
fn terminate_and_reap(child: &mut Child, grace: Duration) -> std::io::Result<ExitStatus> {
    signal_group(child.id(), Signal::Term);

    let until = Instant::now() + grace;
    while Instant::now() < until {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        thread::sleep(POLL);
    }

    signal_group(child.id(), Signal::Kill);
    // Fall back to killing the direct child if group signaling is
    // unavailable on this platform.
    let _ = child.kill();
    child.wait()
}

enum Signal {
    Term,
    Kill,
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: Signal) {
    let sig = match signal {
        Signal::Term => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    unsafe {
        libc::killpg(pid as libc::pid_t, sig);
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: u32, _signal: Signal) {}

/// Best-effort SIGTERM to a process group (cancellation sweep).
#[cfg(unix)]
pub(crate) fn terminate_group(pid: u32) {
    unsafe {
        libc::killpg(pid as libc::pid_t, libc::SIGTERM);
    }
}

#[cfg(not(unix))]
pub(crate) fn terminate_group(_pid: u32) {}
