//! Error types for Braid operations.
//!
//! This module defines [`BraidError`], the primary error type used throughout
//! the application, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Action *failure* is not an error: a nonzero exit status flows through
//!   the combinator algebra as a [`crate::status::Status`] value
//! - `BraidError` covers infrastructure problems: expressions that do not
//!   parse, names that do not resolve, files that cannot be read, processes
//!   that cannot be spawned
//! - Use `anyhow::Error` (via `BraidError::Other`) for unexpected errors
//! - All errors should provide actionable messages for users

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Braid operations.
#[derive(Debug, Error)]
pub enum BraidError {
    /// Combinator expression could not be parsed.
    #[error("Failed to parse expression '{expr}': {message}")]
    ExpressionParse { expr: String, message: String },

    /// Referenced action is not registered.
    #[error("Unknown action: {name}")]
    UnknownAction { name: String },

    /// Action definition rejected at registration time.
    #[error("Invalid action '{name}': {message}")]
    InvalidAction { name: String, message: String },

    /// Actions file not found at expected location.
    #[error("Actions file not found: {path}")]
    ActionsFileNotFound { path: PathBuf },

    /// Failed to parse the actions file.
    #[error("Failed to parse actions file at {path}: {message}")]
    ActionsFileParse { path: PathBuf, message: String },

    /// Configuration rejected before evaluation.
    #[error("Invalid configuration: {message}")]
    ConfigValidation { message: String },

    /// Stage does not exist (exit/push/pop before enter).
    #[error("Stage '{stage}' does not exist")]
    StageNotFound { stage: String },

    /// Stage already exists (enter without --force).
    #[error("Stage '{stage}' already exists")]
    StageExists { stage: String },

    /// Pop/peek on a stage with no entries.
    #[error("Stage '{stage}' is empty")]
    StageEmpty { stage: String },

    /// Stage file held malformed JSON.
    #[error("Stage '{stage}' is corrupt: {message}")]
    StageCorrupt { stage: String, message: String },

    /// Child process could not be spawned or awaited.
    #[error("Failed to run '{command}': {message}")]
    Spawn { command: String, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error wrapper.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Braid operations.
pub type Result<T> = std::result::Result<T, BraidError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expression_parse_displays_expr_and_message() {
        let err = BraidError::ExpressionParse {
            expr: "and(a,".into(),
            message: "unbalanced parenthesis".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("and(a,"));
        assert!(msg.contains("unbalanced parenthesis"));
    }

    #[test]
    fn unknown_action_displays_name() {
        let err = BraidError::UnknownAction {
            name: "deploy".into(),
        };
        assert!(err.to_string().contains("deploy"));
    }

    #[test]
    fn invalid_action_displays_name_and_message() {
        let err = BraidError::InvalidAction {
            name: "bad,name".into(),
            message: "name contains a reserved delimiter".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("bad,name"));
        assert!(msg.contains("reserved delimiter"));
    }

    #[test]
    fn actions_file_not_found_displays_path() {
        let err = BraidError::ActionsFileNotFound {
            path: PathBuf::from("/proj/braid.yml"),
        };
        assert!(err.to_string().contains("/proj/braid.yml"));
    }

    #[test]
    fn stage_errors_display_stage_name() {
        let not_found = BraidError::StageNotFound { stage: "X".into() };
        let empty = BraidError::StageEmpty { stage: "X".into() };
        let exists = BraidError::StageExists { stage: "X".into() };
        assert!(not_found.to_string().contains("X"));
        assert!(empty.to_string().contains("empty"));
        assert!(exists.to_string().contains("exists"));
    }

    #[test]
    fn spawn_displays_command() {
        let err = BraidError::Spawn {
            command: "cargo build".into(),
            message: "No such file".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("cargo build"));
        assert!(msg.contains("No such file"));
    }

    #[test]
    fn io_error_converts_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: BraidError = io_err.into();
        assert!(matches!(err, BraidError::Io(_)));
    }

    #[test]
    fn result_type_alias_works() {
        fn returns_error() -> Result<()> {
            Err(BraidError::ConfigValidation {
                message: "test".into(),
            })
        }
        assert!(returns_error().is_err());
    }
}
