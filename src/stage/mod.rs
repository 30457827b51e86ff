//! Stage checkpoints.
//!
//! A stage is a named checkpoint owning a persisted LIFO stack of JSON
//! records. Actions running "inside" a stage push and pop checkpoint data to
//! pass state between otherwise stateless invocations. The store is an
//! explicit abstraction so the evaluator never touches global files
//! directly, and tests can swap in an in-memory implementation.

mod file;
mod memory;

pub use file::FileStageStore;
pub use memory::MemoryStageStore;

use crate::error::Result;
use serde_json::Value;

/// Persistent LIFO stacks of JSON records, keyed by stage name.
///
/// `enter` creates a stage and `exit` destroys it; `push`/`pop`/`peek`
/// address the last-in element. All operations on a stage that was never
/// entered fail with `StageNotFound`.
pub trait StageStore: Send + Sync {
    /// Create a stage with an empty stack. Fails with `StageExists` if the
    /// stage is already open, unless `force` is set (which resets it).
    fn enter(&self, stage: &str, force: bool) -> Result<()>;

    /// Destroy a stage and its stack.
    fn exit(&self, stage: &str) -> Result<()>;

    /// Append a record to the stage's stack.
    fn push(&self, stage: &str, value: Value) -> Result<()>;

    /// Remove and return the last-in record.
    fn pop(&self, stage: &str) -> Result<Value>;

    /// Return the last-in record without removing it.
    fn peek(&self, stage: &str) -> Result<Value>;

    /// Return the whole stack, oldest first.
    fn entries(&self, stage: &str) -> Result<Vec<Value>>;

    /// Whether a stage is currently open.
    fn exists(&self, stage: &str) -> bool;
}
