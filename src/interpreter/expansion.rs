//! Argument Expansion
//!
//! Turns parsed [`Argument`] nodes into the strings handed to commands:
//! variable lookup (positional parameters, the specials `?`, `$`, `#`,
//! `RANDOM`, then the variable table with the environment authoritative
//! for exported names), command substitution via a nested shell
//! invocation, arithmetic evaluation, and concatenation of fragments.

use std::process::{Command, Stdio};

use crate::ast::types::Argument;
use crate::interpreter::arithmetic;
use crate::interpreter::errors::ExecutionError;
use crate::interpreter::types::ShellState;

/// Expand one argument to its final string.
pub fn expand_argument(arg: &Argument, state: &mut ShellState) -> Result<String, ExecutionError> {
    match arg {
        Argument::Literal(text) | Argument::QuotedLiteral(text) => Ok(text.clone()),
        Argument::VariableRef(name) => Ok(expand_variable(name, state)),
        Argument::CommandSubstitution { text, quoted } => {
            command_substitution(text, *quoted, state)
        }
        Argument::ArithmeticExpr(parts) => match arithmetic::evaluate(parts, state) {
            Ok(value) => Ok(value.to_string()),
            Err(err @ ExecutionError::DivideByZero) => {
                eprintln!("{}", err);
                Ok("0".to_string())
            }
            Err(err) => Err(err),
        },
        Argument::Concatenation(parts) => {
            let mut joined = String::new();
            for part in parts {
                joined.push_str(&expand_argument(part, state)?);
            }
            Ok(joined)
        }
    }
}

/// Expand a whole argument list.
pub fn expand_all(args: &[Argument], state: &mut ShellState) -> Result<Vec<String>, ExecutionError> {
    args.iter().map(|a| expand_argument(a, state)).collect()
}

fn expand_variable(name: &str, state: &mut ShellState) -> String {
    if name.chars().all(|c| c.is_ascii_digit()) && !name.is_empty() {
        let position: usize = name.parse().unwrap_or(usize::MAX);
        return state.source.positional(position).unwrap_or("").to_string();
    }
    match name {
        "?" => state.last_status.to_string(),
        "$" => std::process::id().to_string(),
        "#" => state.source.param_count().to_string(),
        "RANDOM" => state.random_value().to_string(),
        _ => state.vars.get(name).unwrap_or_default(),
    }
}

/// Run `text` as a nested shell invocation and capture its stdout.
fn command_substitution(
    text: &str,
    quoted: bool,
    state: &mut ShellState,
) -> Result<String, ExecutionError> {
    let shell = std::env::current_exe()
        .unwrap_or_else(|_| std::path::PathBuf::from("msh"));
    let output = Command::new(shell)
        .arg("-c")
        .arg(text)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .output()
        .map_err(|e| ExecutionError::spawn(text, e))?;

    state.set_status(output.status.code().unwrap_or(1));
    Ok(normalize_substitution_output(&output.stdout, quoted))
}

/// Shape captured substitution output.
///
/// The unquoted form collapses runs of spaces, tabs, and newlines into
/// single spaces and keeps none at the edges. The quoted form preserves
/// bytes exactly. Both lose one trailing separator.
pub fn normalize_substitution_output(bytes: &[u8], quoted: bool) -> String {
    let raw = String::from_utf8_lossy(bytes);
    let mut out = String::with_capacity(raw.len());
    if quoted {
        out.push_str(&raw);
    } else {
        let mut pending_space = false;
        for c in raw.chars() {
            if matches!(c, ' ' | '\t' | '\n') {
                pending_space = true;
            } else {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
        }
    }
    if out.ends_with(' ') || out.ends_with('\n') {
        out.pop();
    }
    out
}
