//! File-backed stage store.
//!
//! One JSON-array file per stage under a stage directory, typically
//! `.braid/stages/`. Writers read the entire file and rewrite it whole using
//! the write-to-temp-then-rename pattern, so a crash never leaves a
//! half-written stack behind. There is no file locking: concurrent pushers
//! to the same stage can lose updates, and stage files are not namespaced by
//! session, so unrelated workflows using the same stage name on one host
//! will collide. Callers must serialize pushes to the same stage themselves.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{BraidError, Result};
use crate::stage::StageStore;

/// Stage store persisting each stage as `<dir>/<name>.json`.
#[derive(Debug, Clone)]
pub struct FileStageStore {
    dir: PathBuf,
}

impl FileStageStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// the first `enter`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Default stage directory under a project root.
    pub fn default_dir(project_root: &Path) -> PathBuf {
        project_root.join(".braid").join("stages")
    }

    /// Path of the file backing `stage`.
    pub fn stage_file(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{}.json", stage))
    }

    fn read_stack(&self, stage: &str) -> Result<Vec<Value>> {
        let path = self.stage_file(stage);
        if !path.exists() {
            return Err(BraidError::StageNotFound {
                stage: stage.to_string(),
            });
        }

        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|e| BraidError::StageCorrupt {
            stage: stage.to_string(),
            message: e.to_string(),
        })
    }

    fn write_stack(&self, stage: &str, stack: &[Value]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;

        let path = self.stage_file(stage);
        let content = serde_json::to_string_pretty(stack).map_err(|e| {
            BraidError::StageCorrupt {
                stage: stage.to_string(),
                message: e.to_string(),
            }
        })?;

        // Atomic write: write to temp file, then rename.
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &path)?;

        Ok(())
    }
}

impl StageStore for FileStageStore {
    fn enter(&self, stage: &str, force: bool) -> Result<()> {
        if self.exists(stage) && !force {
            return Err(BraidError::StageExists {
                stage: stage.to_string(),
            });
        }
        self.write_stack(stage, &[])
    }

    fn exit(&self, stage: &str) -> Result<()> {
        let path = self.stage_file(stage);
        if !path.exists() {
            return Err(BraidError::StageNotFound {
                stage: stage.to_string(),
            });
        }
        fs::remove_file(&path)?;
        Ok(())
    }

    fn push(&self, stage: &str, value: Value) -> Result<()> {
        let mut stack = self.read_stack(stage)?;
        stack.push(value);
        self.write_stack(stage, &stack)
    }

    fn pop(&self, stage: &str) -> Result<Value> {
        let mut stack = self.read_stack(stage)?;
        let value = stack.pop().ok_or_else(|| BraidError::StageEmpty {
            stage: stage.to_string(),
        })?;
        self.write_stack(stage, &stack)?;
        Ok(value)
    }

    fn peek(&self, stage: &str) -> Result<Value> {
        let stack = self.read_stack(stage)?;
        stack.last().cloned().ok_or_else(|| BraidError::StageEmpty {
            stage: stage.to_string(),
        })
    }

    fn entries(&self, stage: &str) -> Result<Vec<Value>> {
        self.read_stack(stage)
    }

    fn exists(&self, stage: &str) -> bool {
        self.stage_file(stage).exists()
    }
}
