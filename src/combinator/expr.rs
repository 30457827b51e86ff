//! Combinator expression trees and their textual form.
//!
//! Expressions are written `head(arg, arg, ...)`. Commas separate arguments
//! at the current parenthesis depth; a slash separates a numeric head from
//! its target in the counted forms `retry(3/t)`, `loop(4/t)`, `timeout(5/t)`
//! and `delay(10/t)`. A head that is not a combinator keyword names an
//! action; its arguments are plain strings, either positional or `KEY=value`
//! environment pairs.
//!
//! Comma, slash and parentheses are reserved: an action argument containing
//! a literal comma cannot be expressed in this syntax.

use std::fmt;

use crate::error::{BraidError, Result};

/// Combinator keywords. Action names must not collide with these.
pub const KEYWORDS: &[&str] = &[
    "and", "or", "not", "if", "ifelse", "try", "retry", "loop", "until", "timeout", "delay",
    "par", "join", "pipe", "enter", "exit",
];

/// Whether `name` is a combinator keyword.
pub fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Reference to a registered action with its raw argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRef {
    pub name: String,
    pub args: Vec<String>,
}

/// A combinator expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A named action invocation (leaf).
    Action(ActionRef),
    /// Evaluate in order, stop and propagate on first failure.
    And(Vec<Expr>),
    /// Evaluate in order, stop and succeed on first success.
    Or(Vec<Expr>),
    /// Invert the child's status.
    Not(Box<Expr>),
    /// Run `then` only if `cond` succeeds; a failing `cond` is swallowed.
    If { cond: Box<Expr>, then: Box<Expr> },
    /// Dispatch on `cond`'s status.
    IfElse {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Run `body`; on failure run `handler` and adopt its status; always
    /// run `finally` afterwards.
    Try {
        body: Box<Expr>,
        handler: Box<Expr>,
        finally: Option<Box<Expr>>,
    },
    /// Up to `attempts` runs of `target`, pausing between attempts.
    Retry { attempts: u32, target: Box<Expr> },
    /// Run `target` exactly `times` times.
    Loop { times: u32, target: Box<Expr> },
    /// Run `target` repeatedly until it succeeds.
    Until(Box<Expr>),
    /// Terminate `target`'s process group after `seconds`.
    Timeout { seconds: u64, target: Box<Expr> },
    /// Schedule `target` after `seconds` without waiting.
    Delay { seconds: u64, target: Box<Expr> },
    /// Concurrent children, stdio written through, barrier wait.
    Par(Vec<Expr>),
    /// Concurrent children with per-child output capture, barrier wait.
    Join(Vec<Expr>),
    /// Buffered stdout-to-stdin staging, strictly ordered.
    Pipe(Vec<Expr>),
    /// Open a stage checkpoint.
    StageEnter(String),
    /// Close a stage checkpoint.
    StageExit(String),
}

impl Expr {
    /// Parse the textual expression form.
    pub fn parse(input: &str) -> Result<Expr> {
        let input = input.trim();
        if input.is_empty() {
            return Err(parse_error(input, "empty expression"));
        }

        let open = match input.find('(') {
            None => return Ok(Expr::Action(bare_action(input)?)),
            Some(pos) => pos,
        };

        if !input.ends_with(')') {
            return Err(parse_error(input, "expected closing ')'"));
        }

        let head = input[..open].trim();
        if head.is_empty() {
            return Err(parse_error(input, "missing combinator or action name"));
        }

        let body = &input[open + 1..input.len() - 1];
        if !balanced(body) {
            return Err(parse_error(input, "unbalanced parentheses"));
        }

        match head {
            "and" => Ok(Expr::And(parse_children(input, body, 1)?)),
            "or" => Ok(Expr::Or(parse_children(input, body, 1)?)),
            "par" => Ok(Expr::Par(parse_children(input, body, 1)?)),
            "join" => Ok(Expr::Join(parse_children(input, body, 1)?)),
            "pipe" => Ok(Expr::Pipe(parse_children(input, body, 2)?)),
            "not" => {
                let mut children = parse_children(input, body, 1)?;
                if children.len() != 1 {
                    return Err(parse_error(input, "not takes exactly one argument"));
                }
                Ok(Expr::Not(Box::new(children.remove(0))))
            }
            "until" => {
                let mut children = parse_children(input, body, 1)?;
                if children.len() != 1 {
                    return Err(parse_error(input, "until takes exactly one argument"));
                }
                Ok(Expr::Until(Box::new(children.remove(0))))
            }
            "if" => {
                let mut children = parse_children(input, body, 2)?;
                if children.len() != 2 {
                    return Err(parse_error(input, "if takes a condition and a target"));
                }
                let cond = Box::new(children.remove(0));
                let then = Box::new(children.remove(0));
                Ok(Expr::If { cond, then })
            }
            "ifelse" => {
                let mut children = parse_children(input, body, 3)?;
                if children.len() != 3 {
                    return Err(parse_error(
                        input,
                        "ifelse takes a condition and two targets",
                    ));
                }
                let cond = Box::new(children.remove(0));
                let then = Box::new(children.remove(0));
                let otherwise = Box::new(children.remove(0));
                Ok(Expr::IfElse {
                    cond,
                    then,
                    otherwise,
                })
            }
            "try" => {
                let mut children = parse_children(input, body, 2)?;
                if children.len() > 3 {
                    return Err(parse_error(
                        input,
                        "try takes a body, a handler and an optional finally",
                    ));
                }
                let body = Box::new(children.remove(0));
                let handler = Box::new(children.remove(0));
                let finally = if children.is_empty() {
                    None
                } else {
                    Some(Box::new(children.remove(0)))
                };
                Ok(Expr::Try {
                    body,
                    handler,
                    finally,
                })
            }
            "retry" => {
                let (count, target) = parse_counted(input, body)?;
                Ok(Expr::Retry {
                    attempts: repeat_count(input, count)?,
                    target: Box::new(target),
                })
            }
            "loop" => {
                let (count, target) = parse_counted(input, body)?;
                Ok(Expr::Loop {
                    times: repeat_count(input, count)?,
                    target: Box::new(target),
                })
            }
            "timeout" => {
                let (seconds, target) = parse_counted(input, body)?;
                Ok(Expr::Timeout {
                    seconds,
                    target: Box::new(target),
                })
            }
            "delay" => {
                let (seconds, target) = parse_counted(input, body)?;
                Ok(Expr::Delay {
                    seconds,
                    target: Box::new(target),
                })
            }
            "enter" => Ok(Expr::StageEnter(stage_name(input, body)?)),
            "exit" => Ok(Expr::StageExit(stage_name(input, body)?)),
            name => {
                let args = split_args(body)
                    .into_iter()
                    .map(|a| plain_arg(input, a))
                    .collect::<Result<Vec<_>>>()?;
                let name = validate_name(input, name)?;
                Ok(Expr::Action(ActionRef { name, args }))
            }
        }
    }
}

fn parse_error(expr: &str, message: &str) -> BraidError {
    BraidError::ExpressionParse {
        expr: expr.to_string(),
        message: message.to_string(),
    }
}

/// A bare word with no parentheses is an action reference without args.
fn bare_action(input: &str) -> Result<ActionRef> {
    if is_keyword(input) {
        return Err(parse_error(
            input,
            "combinator requires an argument list",
        ));
    }
    Ok(ActionRef {
        name: validate_name(input, input)?,
        args: Vec::new(),
    })
}

fn validate_name(expr: &str, name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(parse_error(expr, "empty action name"));
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, ',' | '/' | '(' | ')'))
    {
        return Err(parse_error(
            expr,
            "action name contains a reserved delimiter",
        ));
    }
    Ok(name.to_string())
}

fn balanced(s: &str) -> bool {
    let mut depth: i32 = 0;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Split on commas at parenthesis depth zero.
fn split_args(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&body[start..]);
    if parts.len() == 1 && parts[0].trim().is_empty() {
        return Vec::new();
    }
    parts
}

fn parse_children(expr: &str, body: &str, min: usize) -> Result<Vec<Expr>> {
    let parts = split_args(body);
    if parts.len() < min {
        return Err(parse_error(expr, "too few arguments"));
    }
    parts.iter().map(|p| Expr::parse(p)).collect()
}

/// Parse the `N/target` form used by retry, loop, timeout and delay.
fn parse_counted(expr: &str, body: &str) -> Result<(u64, Expr)> {
    let mut depth = 0usize;
    let mut slash = None;
    for (i, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                slash = Some(i);
                break;
            }
            _ => {}
        }
    }
    let slash = slash.ok_or_else(|| parse_error(expr, "expected 'count/target'"))?;

    let count: u64 = body[..slash]
        .trim()
        .parse()
        .map_err(|_| parse_error(expr, "count must be a non-negative integer"))?;
    if count == 0 {
        return Err(parse_error(expr, "count must be at least 1"));
    }

    let target = Expr::parse(&body[slash + 1..])?;
    Ok((count, target))
}

/// Repeat counts for retry and loop fit in u32; timeout and delay keep the
/// full u64 seconds.
fn repeat_count(expr: &str, count: u64) -> Result<u32> {
    u32::try_from(count).map_err(|_| parse_error(expr, "repeat count is too large"))
}

fn stage_name(expr: &str, body: &str) -> Result<String> {
    let parts = split_args(body);
    if parts.len() != 1 {
        return Err(parse_error(expr, "expected a single stage name"));
    }
    validate_name(expr, parts[0].trim())
}

/// Action arguments are plain strings; nesting is only legal under
/// combinator heads.
fn plain_arg(expr: &str, arg: &str) -> Result<String> {
    let arg = arg.trim();
    if arg.contains('(') || arg.contains(')') {
        return Err(parse_error(
            expr,
            "action arguments must be plain strings",
        ));
    }
    Ok(arg.to_string())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, head: &str, children: &[Expr]) -> fmt::Result {
            write!(f, "{}(", head)?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", child)?;
            }
            write!(f, ")")
        }

        match self {
            Expr::Action(a) => {
                if a.args.is_empty() {
                    write!(f, "{}", a.name)
                } else {
                    write!(f, "{}({})", a.name, a.args.join(","))
                }
            }
            Expr::And(c) => list(f, "and", c),
            Expr::Or(c) => list(f, "or", c),
            Expr::Par(c) => list(f, "par", c),
            Expr::Join(c) => list(f, "join", c),
            Expr::Pipe(c) => list(f, "pipe", c),
            Expr::Not(t) => write!(f, "not({})", t),
            Expr::Until(t) => write!(f, "until({})", t),
            Expr::If { cond, then } => write!(f, "if({},{})", cond, then),
            Expr::IfElse {
                cond,
                then,
                otherwise,
            } => write!(f, "ifelse({},{},{})", cond, then, otherwise),
            Expr::Try {
                body,
                handler,
                finally,
            } => match finally {
                Some(fin) => write!(f, "try({},{},{})", body, handler, fin),
                None => write!(f, "try({},{})", body, handler),
            },
            Expr::Retry { attempts, target } => write!(f, "retry({}/{})", attempts, target),
            Expr::Loop { times, target } => write!(f, "loop({}/{})", times, target),
            Expr::Timeout { seconds, target } => write!(f, "timeout({}/{})", seconds, target),
            Expr::Delay { seconds, target } => write!(f, "delay({}/{})", seconds, target),
            Expr::StageEnter(name) => write!(f, "enter({})", name),
            Expr::StageExit(name) => write!(f, "exit({})", name),
        }
    }
}
