/*!
run.rs

Implements the `run` subcommand: dispatch one `[@alias] command [args...]
[--options]` invocation.

Flow:
  - Partition raw tokens into positionals and options, split off the alias.
  - Resolve the command against the local catalog; unknown names get a
    permissive proxy descriptor so parsing cannot fail before routing.
  - Consult the redispatch hook. A forwarded invocation terminates this one
    with the target's outcome; a fall-through runs the local handler, or fails
    for a proxy, since the name is then unknown everywhere.
  - Render the result the same way the interactive shell does and propagate
    the exit code verbatim.
*/

use anyhow::{Result, bail};
use clap::Args;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use crate::alias::{ALIAS_MARKER, AliasTable};
use crate::catalog::{
    CommandCatalog, CommandDescriptor, ParsedInvocation, parse_args, parse_options,
    proxy_descriptor,
};
use crate::cmd::format::StyleOptions;
use crate::cmd::shared::{diff_options, partition_tokens, render_result, split_alias_command};
use crate::dispatch::{ExecutionContext, Redispatch, RedispatchHook, execute_proxy};
use crate::exec::{InvocationResult, Invoker};
use crate::log_debug;

/// CLI arguments for `siterun run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Invocation tokens: `[@alias] command [args...] [--options]`
    #[arg(
        value_name = "TOKENS",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub tokens: Vec<String>,
}

/// Entry point for the run subcommand.
pub fn execute_run<I: Invoker>(
    args: RunArgs,
    catalog: &CommandCatalog,
    aliases: &AliasTable,
    ctx: &ExecutionContext,
    invoker: &I,
    root: Option<&Path>,
) -> Result<i32> {
    let (positionals, raw_options) = partition_tokens(&args.tokens);
    let Some(tokens) = split_alias_command(&positionals, ALIAS_MARKER) else {
        bail!("usage: siterun run [@alias] command [args...] [--options]");
    };

    let known = catalog.lookup(&tokens.command).cloned();
    let descriptor = known
        .clone()
        .unwrap_or_else(|| proxy_descriptor(&tokens.command));
    log_debug!(
        "dispatching {} ({})",
        tokens.command,
        if known.is_some() { "catalog" } else { "proxy" }
    );

    let supplied = parse_options(&descriptor, &raw_options)?;
    let invocation = ParsedInvocation {
        alias_token: tokens.alias_token.clone(),
        command: descriptor.name.clone(),
        args: parse_args(&descriptor, &tokens.rest)?,
        options: diff_options(&supplied, &descriptor),
    };

    let hook = RedispatchHook::new(aliases, invoker);
    let result = match known {
        Some(descriptor) => match hook.redispatch_if_remote(&invocation, ctx)? {
            Redispatch::Terminated(result) => result,
            Redispatch::NotRedispatched => {
                run_local(&descriptor, &invocation.args, &supplied, aliases, ctx, root)?
            }
        },
        None => execute_proxy(&hook, &invocation, ctx)?,
    };

    let style = StyleOptions::detect();
    render_result(&result, &mut io::stdout(), &style)?;
    Ok(result.exit_code)
}

/// Run one catalog command in this process. Only reached when the hook
/// decided the invocation stays here.
fn run_local(
    descriptor: &CommandDescriptor,
    args: &[String],
    supplied: &BTreeMap<String, Value>,
    aliases: &AliasTable,
    ctx: &ExecutionContext,
    root: Option<&Path>,
) -> Result<InvocationResult> {
    let mut options = descriptor.default_options();
    options.extend(supplied.iter().map(|(k, v)| (k.clone(), v.clone())));

    match descriptor.name.as_str() {
        "version" => Ok(version_command(&options)),
        "status" => Ok(status_command(args, &options, aliases, ctx, root)),
        "env:get" => Ok(env_get_command(args, &options)),
        other => bail!("catalog entry `{other}` has no local handler"),
    }
}

fn flag(options: &BTreeMap<String, Value>, name: &str) -> bool {
    matches!(options.get(name), Some(Value::Bool(true)))
}

fn ok_with(stdout: String) -> InvocationResult {
    InvocationResult {
        exit_code: 0,
        stdout,
        stderr: String::new(),
    }
}

fn failed_with(stderr: String) -> InvocationResult {
    InvocationResult {
        exit_code: 1,
        stdout: String::new(),
        stderr,
    }
}

fn version_command(options: &BTreeMap<String, Value>) -> InvocationResult {
    let version = env!("CARGO_PKG_VERSION");
    if flag(options, "short") {
        ok_with(format!("{version}\n"))
    } else {
        ok_with(format!("siterun {version}\n"))
    }
}

fn status_fields(
    aliases: &AliasTable,
    ctx: &ExecutionContext,
    root: Option<&Path>,
) -> Vec<(&'static str, String)> {
    vec![
        ("version", env!("CARGO_PKG_VERSION").to_string()),
        (
            "root",
            root.map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("default-alias", ctx.default_alias.clone()),
        ("final-target", ctx.final_target.to_string()),
        ("aliases", aliases.len().to_string()),
    ]
}

fn status_command(
    args: &[String],
    options: &BTreeMap<String, Value>,
    aliases: &AliasTable,
    ctx: &ExecutionContext,
    root: Option<&Path>,
) -> InvocationResult {
    let fields = status_fields(aliases, ctx, root);

    if let Some(wanted) = args.first() {
        return match fields.iter().find(|(name, _)| name == wanted) {
            Some((_, value)) => ok_with(format!("{value}\n")),
            None => failed_with(format!("Unknown status field: {wanted}\n")),
        };
    }

    if options.get("format").and_then(Value::as_str) == Some("json") {
        let map: serde_json::Map<String, Value> = fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), Value::String(value)))
            .collect();
        let json = Value::Object(map);
        return ok_with(format!(
            "{}\n",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
        ));
    }

    let mut out = String::new();
    for (name, value) in fields {
        out.push_str(&format!("{name:<14} {value}\n"));
    }
    ok_with(out)
}

fn env_get_command(args: &[String], options: &BTreeMap<String, Value>) -> InvocationResult {
    let mut out = String::new();
    let mut missing = Vec::new();
    for name in args {
        match std::env::var(name) {
            Ok(value) => out.push_str(&format!("{name}={value}\n")),
            Err(_) => missing.push(name.as_str()),
        }
    }
    if flag(options, "strict") && !missing.is_empty() {
        return failed_with(format!("Unset: {}\n", missing.join(", ")));
    }
    ok_with(out)
}

/* ---- Tests ---- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::{Alias, AliasTarget};
    use crate::error::DispatchError;
    use crate::exec::InvocationRequest;
    use serde_json::json;
    use std::cell::RefCell;

    struct FakeInvoker {
        seen: RefCell<Vec<InvocationRequest>>,
        result: InvocationResult,
    }

    impl FakeInvoker {
        fn returning(exit_code: i32, stdout: &str, stderr: &str) -> Self {
            FakeInvoker {
                seen: RefCell::new(Vec::new()),
                result: InvocationResult {
                    exit_code,
                    stdout: stdout.into(),
                    stderr: stderr.into(),
                },
            }
        }
    }

    impl Invoker for FakeInvoker {
        fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResult, DispatchError> {
            self.seen.borrow_mut().push(request.clone());
            Ok(self.result.clone())
        }
    }

    fn prod_table() -> AliasTable {
        let mut table = AliasTable::with_self();
        table.insert(Alias {
            name: "@prod".into(),
            target: AliasTarget::Remote {
                host: "prod.example.com".into(),
                user: None,
                root: None,
            },
        });
        table
    }

    fn run_args(tokens: &[&str]) -> RunArgs {
        RunArgs {
            tokens: tokens.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn known_local_command_executes_here() {
        let invoker = FakeInvoker::returning(0, "", "");
        let ctx = ExecutionContext::new("@self", true);
        let code = execute_run(
            run_args(&["version", "--short"]),
            &CommandCatalog::builtin(),
            &AliasTable::with_self(),
            &ctx,
            &invoker,
            None,
        )
        .unwrap();
        assert_eq!(code, 0);
        assert!(invoker.seen.borrow().is_empty(), "nothing forwarded");
    }

    #[test]
    fn remote_alias_forwards_and_adopts_exit_code() {
        let invoker = FakeInvoker::returning(4, "", "remote broke\n");
        let ctx = ExecutionContext::new("@self", true);
        let code = execute_run(
            run_args(&["@prod", "status"]),
            &CommandCatalog::builtin(),
            &prod_table(),
            &ctx,
            &invoker,
            None,
        )
        .unwrap();
        assert_eq!(code, 4);
        assert_eq!(invoker.seen.borrow()[0].alias.name, "@prod");
    }

    #[test]
    fn unknown_command_goes_through_proxy_to_remote() {
        let invoker = FakeInvoker::returning(0, "pm:list from prod\n", "");
        let ctx = ExecutionContext::new("@self", true);
        let code = execute_run(
            run_args(&["@prod", "pm:list", "--no-core", "--field=name"]),
            &CommandCatalog::builtin(),
            &prod_table(),
            &ctx,
            &invoker,
            None,
        )
        .unwrap();
        assert_eq!(code, 0);
        let seen = invoker.seen.borrow();
        assert_eq!(seen[0].command, "pm:list");
        assert_eq!(seen[0].options.get("no-core"), Some(&json!(true)));
        assert_eq!(seen[0].options.get("field"), Some(&json!("name")));
    }

    #[test]
    fn unknown_command_at_final_target_is_not_executable() {
        let invoker = FakeInvoker::returning(0, "", "");
        let ctx = ExecutionContext::new("@self", true);
        let err = execute_run(
            run_args(&["definitely:not-a-command"]),
            &CommandCatalog::builtin(),
            &AliasTable::with_self(),
            &ctx,
            &invoker,
            None,
        )
        .unwrap_err();
        let dispatch = err.downcast_ref::<DispatchError>().unwrap();
        assert!(matches!(dispatch, DispatchError::CommandNotExecutable(_)));
        assert_eq!(dispatch.exit_code(), 127);
    }

    #[test]
    fn version_output_respects_short_flag() {
        let long = version_command(&BTreeMap::from([("short".to_string(), json!(false))]));
        assert!(long.stdout.starts_with("siterun "));
        let short = version_command(&BTreeMap::from([("short".to_string(), json!(true))]));
        assert_eq!(short.stdout.trim(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn status_single_field_and_unknown_field() {
        let ctx = ExecutionContext::new("@self", true);
        let table = prod_table();

        let ok = status_command(
            &["default-alias".to_string()],
            &BTreeMap::new(),
            &table,
            &ctx,
            None,
        );
        assert_eq!(ok.stdout, "@self\n");

        let bad = status_command(&["nope".to_string()], &BTreeMap::new(), &table, &ctx, None);
        assert_eq!(bad.exit_code, 1);
        assert!(bad.stderr.contains("Unknown status field"));
    }

    #[test]
    fn status_json_format_is_parseable() {
        let ctx = ExecutionContext::new("@self", true);
        let result = status_command(
            &[],
            &BTreeMap::from([("format".to_string(), json!("json"))]),
            &AliasTable::with_self(),
            &ctx,
            None,
        );
        let parsed: serde_json::Value = serde_json::from_str(&result.stdout).unwrap();
        assert_eq!(parsed["default-alias"], json!("@self"));
    }

    #[test]
    fn env_get_strict_fails_on_unset_variable() {
        let result = env_get_command(
            &["SITERUN_TEST_SURELY_UNSET".to_string()],
            &BTreeMap::from([("strict".to_string(), json!(true))]),
        );
        assert_eq!(result.exit_code, 1);
        assert!(result.stderr.contains("SITERUN_TEST_SURELY_UNSET"));
    }

    #[test]
    fn strict_catalog_command_still_validates_options() {
        let invoker = FakeInvoker::returning(0, "", "");
        let ctx = ExecutionContext::new("@self", true);
        let err = execute_run(
            run_args(&["status", "--bogus"]),
            &CommandCatalog::builtin(),
            &AliasTable::with_self(),
            &ctx,
            &invoker,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::UnknownOption { .. })
        ));
    }
}
