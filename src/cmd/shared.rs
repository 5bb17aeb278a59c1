/*!
shared.rs - helpers shared by the run and shell entry points.

Focus:
  - partition_tokens: split raw tokens into positionals and --option tokens
  - split_alias_command: typed `[@alias] command rest...` tokenizer
  - coerce_option_value: string input toward a default's JSON type
  - diff_options: forward only options differing from declared defaults
  - option_args: deterministic argv serialization of an option map
  - render_result: stderr-then-newline on failure, paged stdout otherwise
*/

use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::catalog::CommandDescriptor;
use crate::cmd::format::{StyleOptions, page};
use crate::exec::InvocationResult;

/* ---- Token Partitioning ---- */

/// Split raw invocation tokens into positionals and option tokens.
///
/// An option token is `--name` or `--name=value`; everything else stays a
/// positional, in order. A lone `--` passes the remaining tokens through as
/// positionals verbatim.
pub fn partition_tokens(tokens: &[String]) -> (Vec<String>, Vec<(String, Option<String>)>) {
    let mut positionals = Vec::new();
    let mut options = Vec::new();
    let mut literal = false;

    for token in tokens {
        if literal {
            positionals.push(token.clone());
            continue;
        }
        if token == "--" {
            literal = true;
            continue;
        }
        if let Some(body) = token.strip_prefix("--") {
            match body.split_once('=') {
                Some((name, value)) => {
                    options.push((name.to_string(), Some(value.to_string())));
                }
                None => options.push((body.to_string(), None)),
            }
            continue;
        }
        positionals.push(token.clone());
    }

    (positionals, options)
}

/* ---- Alias / Command Split ---- */

/// Typed result of splitting a positional token list on the alias marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellTokens {
    pub alias_token: Option<String>,
    pub command: String,
    pub rest: Vec<String>,
}

/// Split positional tokens into alias, command name, and the rest.
///
/// The first token names the alias when it starts with `marker`; otherwise
/// the first token is the command and no alias is given. Returns `None`
/// when no command name remains, a malformed invocation the caller's input
/// layer reports.
pub fn split_alias_command(positionals: &[String], marker: char) -> Option<ShellTokens> {
    let mut tokens = positionals.iter();

    let first = tokens.next()?;
    let (alias_token, command) = if first.starts_with(marker) {
        (Some(first.clone()), tokens.next()?.clone())
    } else {
        (None, first.clone())
    };

    Some(ShellTokens {
        alias_token,
        command,
        rest: tokens.cloned().collect(),
    })
}

/* ---- Option Coercion ---- */

/// Coerce a raw string toward the JSON type of a declared default.
pub fn coerce_option_value(raw: &str, default: &Value) -> Value {
    match default {
        Value::Bool(_) => {
            let l = raw.to_ascii_lowercase();
            match l.as_str() {
                "true" | "1" | "yes" | "y" => Value::Bool(true),
                "false" | "0" | "no" | "n" => Value::Bool(false),
                _ => Value::String(raw.to_string()),
            }
        }
        Value::Number(n) if n.is_i64() => raw
            .parse::<i64>()
            .map(|v| Value::Number(v.into()))
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        Value::Number(_) => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        _ => Value::String(raw.to_string()),
    }
}

/* ---- Option Forwarding ---- */

/// Keep only options whose value differs from the descriptor's declared
/// default. Supplying the full default set therefore forwards nothing.
pub fn diff_options(
    supplied: &BTreeMap<String, Value>,
    descriptor: &CommandDescriptor,
) -> BTreeMap<String, Value> {
    let defaults = descriptor.default_options();
    supplied
        .iter()
        .filter(|(name, value)| defaults.get(*name) != Some(*value))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// Serialize an option map into argv tokens: `--name` for boolean true,
/// `--name=value` otherwise. BTreeMap ordering keeps the output
/// reproducible for identical inputs.
pub fn option_args(options: &BTreeMap<String, Value>) -> Vec<String> {
    options
        .iter()
        .map(|(name, value)| match value {
            Value::Bool(true) => format!("--{name}"),
            Value::String(s) => format!("--{name}={s}"),
            other => format!("--{name}={other}"),
        })
        .collect()
}

/* ---- Result Rendering ---- */

/// Surface one invocation outcome.
///
/// A failed invocation with stderr content writes that stderr to `out`,
/// then one newline so the next prompt starts on its own line. Everything
/// else renders stdout through the pager.
pub fn render_result(
    result: &InvocationResult,
    out: &mut impl Write,
    style: &StyleOptions,
) -> io::Result<()> {
    if !result.is_success() && !result.stderr.is_empty() {
        out.write_all(result.stderr.as_bytes())?;
        out.write_all(b"\n")?;
        return Ok(());
    }
    page(&result.stdout, style)
}

/* ---- Tests ---- */
