//! Actions file loading.
//!
//! The actions file (`braid.yml` by default) declares the shell-backed
//! actions available to expressions, plus the supervisor's hook actions:
//!
//! ```yaml
//! actions:
//!   build:
//!     command: cargo build
//!     env: { RUSTFLAGS: "-D warnings" }
//!   cleanup:
//!     command: rm -rf tmp/
//! hooks:
//!   on_exit: [cleanup]
//!   on_interrupt: cleanup
//! ```
//!
//! The whole file is validated at load time: every action definition must
//! pass registration, and every hook must name a registered action.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{BraidError, Result};
use crate::registry::{ActionRegistry, ShellAction};

/// One action definition in the actions file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionDef {
    /// Shell command line to run.
    pub command: String,

    /// Environment for the command, merged over the parent environment.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Working directory, relative to the actions file's directory.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

/// Hook actions run by the supervisor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Hooks {
    /// Actions run after every top-level invocation, success or failure.
    #[serde(default)]
    pub on_exit: Vec<String>,

    /// Action run when the top-level invocation is cancelled, before the
    /// exit hooks.
    #[serde(default)]
    pub on_interrupt: Option<String>,
}

/// Parsed actions file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActionsFile {
    #[serde(default)]
    pub actions: BTreeMap<String, ActionDef>,

    #[serde(default)]
    pub hooks: Hooks,
}

impl ActionsFile {
    /// Load and parse an actions file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BraidError::ActionsFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| BraidError::ActionsFileParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load the file if it exists, otherwise an empty definition. Used for
    /// the default `braid.yml` location, where absence just means built-ins
    /// only.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Build a registry from these definitions, layered over the built-in
    /// actions. Validates every definition and every hook reference.
    pub fn into_registry(self, base_dir: &Path) -> Result<(ActionRegistry, Hooks)> {
        let mut registry = ActionRegistry::with_builtins();

        for (name, def) in self.actions {
            if def.command.trim().is_empty() {
                return Err(BraidError::InvalidAction {
                    name,
                    message: "command is empty".to_string(),
                });
            }
            let cwd = def.cwd.map(|c| base_dir.join(c));
            registry.register(Box::new(
                ShellAction::new(name, def.command)
                    .with_env(def.env)
                    .with_cwd(cwd),
            ))?;
        }

        for hook in self
            .hooks
            .on_exit
            .iter()
            .chain(self.hooks.on_interrupt.iter())
        {
            if !registry.contains(hook) {
                return Err(BraidError::InvalidAction {
                    name: hook.clone(),
                    message: "hook references an unregistered action".to_string(),
                });
            }
        }

        Ok((registry, self.hooks))
    }
}
