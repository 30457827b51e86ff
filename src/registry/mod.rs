//! Action registry.
//!
//! Resolves an action name plus raw argument list into an [`Invocation`],
//! the concrete description of a child process to spawn. Registration
//! validates names and commands up front, so an unknown or malformed action
//! fails before anything runs; the *values* of arguments are deliberately
//! not validated; a bad flag surfaces when the underlying command runs.

mod actions_file;

pub use actions_file::{ActionsFile, Hooks};

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

use crate::combinator::expr::is_keyword;
use crate::error::{BraidError, Result};

/// Parsed action arguments: positional values plus `KEY=value` environment
/// pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionArgs {
    pub positional: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl ActionArgs {
    /// Split raw arguments into positional and environment-style pairs.
    /// An argument is an env pair when everything before its first `=` is a
    /// valid environment variable name.
    pub fn parse(raw: &[String]) -> Self {
        let mut args = ActionArgs::default();
        for arg in raw {
            match arg.split_once('=') {
                Some((key, value)) if is_env_key(key) => {
                    args.env.push((key.to_string(), value.to_string()));
                }
                _ => args.positional.push(arg.clone()),
            }
        }
        args
    }
}

fn is_env_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// What a child process runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    /// A command line interpreted by the shell.
    Shell(String),
    /// A program invoked directly with arguments (used for recursive
    /// runner invocations).
    Program { program: PathBuf, args: Vec<String> },
}

/// A resolved, ready-to-spawn unit of work. Running it has the side effects
/// of the underlying command; resolving it has none.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Action name or expression text, for logs and errors.
    pub label: String,
    pub command: CommandSpec,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
}

/// A named unit of work that can be resolved into an [`Invocation`].
pub trait Action: Send + Sync {
    fn name(&self) -> &str;
    fn invocation(&self, args: &ActionArgs) -> Result<Invocation>;
}

/// An action backed by a shell command line. Positional arguments are
/// appended shell-quoted; env-style arguments become child environment.
#[derive(Debug, Clone)]
pub struct ShellAction {
    name: String,
    command: String,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
}

impl ShellAction {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_cwd(mut self, cwd: Option<PathBuf>) -> Self {
        self.cwd = cwd;
        self
    }

    /// The configured command line, without arguments applied.
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Action for ShellAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn invocation(&self, args: &ActionArgs) -> Result<Invocation> {
        let mut command = self.command.clone();
        for arg in &args.positional {
            command.push(' ');
            command.push_str(&shell_quote(arg));
        }

        let mut env = self.env.clone();
        env.extend(args.env.iter().cloned());

        Ok(Invocation {
            label: self.name.clone(),
            command: CommandSpec::Shell(command),
            env,
            cwd: self.cwd.clone(),
        })
    }
}

/// Single-quote a value for the shell.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '='))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Typed map from action name to handler, validated at registration time.
pub struct ActionRegistry {
    actions: BTreeMap<String, Box<dyn Action>>,
}

impl ActionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            actions: BTreeMap::new(),
        }
    }

    /// A registry pre-populated with the built-in actions: `pass`, `fail`,
    /// `sleep` and `echo`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, command) in [
            ("pass", "true"),
            ("fail", "false"),
            ("sleep", "sleep"),
            ("echo", "echo"),
        ] {
            // Built-in names pass the same validation as user actions.
            registry
                .register(Box::new(ShellAction::new(name, command)))
                .expect("built-in action is valid");
        }
        registry
    }

    /// Register an action, validating its name.
    pub fn register(&mut self, action: Box<dyn Action>) -> Result<()> {
        let name = action.name().to_string();
        validate_action_name(&name)?;
        if self.actions.contains_key(&name) {
            return Err(BraidError::InvalidAction {
                name,
                message: "an action with this name is already registered".to_string(),
            });
        }
        self.actions.insert(name, action);
        Ok(())
    }

    /// Resolve a name and raw argument list to an invocation.
    pub fn resolve(&self, name: &str, raw_args: &[String]) -> Result<Invocation> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| BraidError::UnknownAction {
                name: name.to_string(),
            })?;
        action.invocation(&ActionArgs::parse(raw_args))
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered action names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(String::as_str).collect()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

// Handlers are trait objects; show the registered names instead.
impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}

fn validate_action_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BraidError::InvalidAction {
            name: name.to_string(),
            message: "name is empty".to_string(),
        });
    }
    if is_keyword(name) {
        return Err(BraidError::InvalidAction {
            name: name.to_string(),
            message: "name collides with a combinator keyword".to_string(),
        });
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, ',' | '/' | '(' | ')'))
    {
        return Err(BraidError::InvalidAction {
            name: name.to_string(),
            message: "name contains a reserved delimiter".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_args_splits_env_pairs() {
        let args = ActionArgs::parse(&[
            "positional".to_string(),
            "TARGET=prod".to_string(),
            "path=with=equals".to_string(),
        ]);
        assert_eq!(args.positional, vec!["positional"]);
        assert_eq!(
            args.env,
            vec![
                ("TARGET".to_string(), "prod".to_string()),
                ("path".to_string(), "with=equals".to_string()),
            ]
        );
    }

    #[test]
    fn parse_args_keeps_non_env_equals_positional() {
        let args = ActionArgs::parse(&["--flag=1".to_string()]);
        assert_eq!(args.positional, vec!["--flag=1"]);
        assert!(args.env.is_empty());
    }

    #[test]
    fn shell_action_appends_quoted_positionals() {
        let action = ShellAction::new("greet", "echo hello");
        let inv = action
            .invocation(&ActionArgs::parse(&["wide world".to_string()]))
            .unwrap();
        match inv.command {
            CommandSpec::Shell(cmd) => assert_eq!(cmd, "echo hello 'wide world'"),
            _ => panic!("expected shell command"),
        }
    }

    #[test]
    fn shell_action_merges_env_args() {
        let mut base = HashMap::new();
        base.insert("A".to_string(), "1".to_string());
        let action = ShellAction::new("deploy", "deploy.sh").with_env(base);

        let inv = action
            .invocation(&ActionArgs::parse(&["B=2".to_string()]))
            .unwrap();
        assert_eq!(inv.env.get("A"), Some(&"1".to_string()));
        assert_eq!(inv.env.get("B"), Some(&"2".to_string()));
    }

    #[test]
    fn shell_quote_passes_safe_values_through() {
        assert_eq!(shell_quote("abc-1.2/x"), "abc-1.2/x");
        assert_eq!(shell_quote("two words"), "'two words'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn registry_resolves_builtins() {
        let registry = ActionRegistry::with_builtins();
        assert!(registry.contains("pass"));
        assert!(registry.contains("fail"));
        let inv = registry.resolve("sleep", &["3".to_string()]).unwrap();
        match inv.command {
            CommandSpec::Shell(cmd) => assert_eq!(cmd, "sleep 3"),
            _ => panic!("expected shell command"),
        }
    }

    #[test]
    fn resolve_unknown_action_fails() {
        let registry = ActionRegistry::with_builtins();
        let err = registry.resolve("ghost", &[]).unwrap_err();
        assert!(matches!(err, BraidError::UnknownAction { .. }));
    }

    #[test]
    fn register_rejects_keyword_names() {
        let mut registry = ActionRegistry::new();
        let err = registry
            .register(Box::new(ShellAction::new("retry", "echo")))
            .unwrap_err();
        assert!(matches!(err, BraidError::InvalidAction { .. }));
    }

    #[test]
    fn register_rejects_reserved_delimiters() {
        let mut registry = ActionRegistry::new();
        for bad in ["a,b", "a/b", "a(b", "a b"] {
            let err = registry
                .register(Box::new(ShellAction::new(bad, "echo")))
                .unwrap_err();
            assert!(matches!(err, BraidError::InvalidAction { .. }), "{}", bad);
        }
    }

    #[test]
    fn register_rejects_duplicates() {
        let mut registry = ActionRegistry::new();
        registry
            .register(Box::new(ShellAction::new("build", "make")))
            .unwrap();
        let err = registry
            .register(Box::new(ShellAction::new("build", "make")))
            .unwrap_err();
        assert!(matches!(err, BraidError::InvalidAction { .. }));
    }

    #[test]
    fn debug_lists_registered_names() {
        let registry = ActionRegistry::with_builtins();
        let rendered = format!("{:?}", registry);
        assert!(rendered.contains("pass"));
        assert!(rendered.contains("sleep"));
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = ActionRegistry::new();
        registry
            .register(Box::new(ShellAction::new("zeta", "true")))
            .unwrap();
        registry
            .register(Box::new(ShellAction::new("alpha", "true")))
            .unwrap();
        assert_eq!(registry.names(), vec!["alpha", "zeta"]);
    }
}
