//! Exit-status values.
//!
//! The combinator algebra computes with process exit statuses, not with
//! errors: `0` is success, any nonzero value is failure, and codes from
//! wrapped tools pass through unmodified. [`Status`] is the value that flows
//! through every evaluation; it is collapsed to a raw process exit code only
//! at the `main` boundary.

use std::fmt;

/// Exit status reserved for an interrupted run (128 + SIGINT).
pub const INTERRUPTED: i32 = 130;

/// A process exit status as seen by the combinator algebra.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Status(i32);

impl Status {
    /// Successful completion.
    pub const OK: Status = Status(0);

    /// Generic failure (also the code for deliberate always-fail actions).
    pub const FAIL: Status = Status(1);

    /// Wrap a raw exit code.
    pub fn from_code(code: i32) -> Self {
        Status(code)
    }

    /// Status for a child killed by a signal (no exit code available).
    /// Mirrors the shell convention of 128 + signal number.
    pub fn from_signal(signal: i32) -> Self {
        Status(128 + signal)
    }

    /// The raw exit code.
    pub fn code(&self) -> i32 {
        self.0
    }

    /// Whether this status means success.
    pub fn success(&self) -> bool {
        self.0 == 0
    }

    /// Invert: success becomes failure and any failure becomes success.
    /// Nonzero codes collapse to 1.
    pub fn invert(&self) -> Status {
        if self.success() {
            Status::FAIL
        } else {
            Status::OK
        }
    }

    /// Status reported for an interrupted run.
    pub fn interrupted() -> Status {
        Status(INTERRUPTED)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<std::process::ExitStatus> for Status {
    fn from(status: std::process::ExitStatus) -> Self {
        match status.code() {
            Some(code) => Status(code),
            // Killed by a signal; exit code is unavailable on unix.
            #[cfg(unix)]
            None => {
                use std::os::unix::process::ExitStatusExt;
                Status::from_signal(status.signal().unwrap_or(15))
            }
            #[cfg(not(unix))]
            None => Status::FAIL,
        }
    }
}
