//! In-memory stage store for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{BraidError, Result};
use crate::stage::StageStore;

/// Stage store keeping every stack in a mutex-guarded map. Used by unit
/// tests and anywhere persistence is unwanted.
#[derive(Debug, Default)]
pub struct MemoryStageStore {
    stages: Mutex<HashMap<String, Vec<Value>>>,
}

impl MemoryStageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StageStore for MemoryStageStore {
    fn enter(&self, stage: &str, force: bool) -> Result<()> {
        let mut stages = self.stages.lock().unwrap();
        if stages.contains_key(stage) && !force {
            return Err(BraidError::StageExists {
                stage: stage.to_string(),
            });
        }
        stages.insert(stage.to_string(), Vec::new());
        Ok(())
    }

    fn exit(&self, stage: &str) -> Result<()> {
        self.stages
            .lock()
            .unwrap()
            .remove(stage)
            .map(|_| ())
            .ok_or_else(|| BraidError::StageNotFound {
                stage: stage.to_string(),
            })
    }

    fn push(&self, stage: &str, value: Value) -> Result<()> {
        let mut stages = self.stages.lock().unwrap();
        let stack = stages
            .get_mut(stage)
            .ok_or_else(|| BraidError::StageNotFound {
                stage: stage.to_string(),
            })?;
        stack.push(value);
        Ok(())
    }

    fn pop(&self, stage: &str) -> Result<Value> {
        let mut stages = self.stages.lock().unwrap();
        let stack = stages
            .get_mut(stage)
            .ok_or_else(|| BraidError::StageNotFound {
                stage: stage.to_string(),
            })?;
        stack.pop().ok_or_else(|| BraidError::StageEmpty {
            stage: stage.to_string(),
        })
    }

    fn peek(&self, stage: &str) -> Result<Value> {
        let stages = self.stages.lock().unwrap();
        let stack = stages.get(stage).ok_or_else(|| BraidError::StageNotFound {
            stage: stage.to_string(),
        })?;
        stack.last().cloned().ok_or_else(|| BraidError::StageEmpty {
            stage: stage.to_string(),
        })
    }

    fn entries(&self, stage: &str) -> Result<Vec<Value>> {
        let stages = self.stages.lock().unwrap();
        stages
            .get(stage)
            .cloned()
            .ok_or_else(|| BraidError::StageNotFound {
                stage: stage.to_string(),
            })
    }

    fn exists(&self, stage: &str) -> bool {
        self.stages.lock().unwrap().contains_key(stage)
    }
}
