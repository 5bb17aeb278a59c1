/*!
shell.rs

Interactive shell over the command catalog.

`ShellCommandAdapter` turns one catalog descriptor into an
interactively-invokable command: derived name and aliases, generated help
(word-wrapped description plus filtered example usages), and an execute path
that re-invokes the command against an arbitrary alias as an ordinary
subprocess call.

The surrounding input layer is a plain read-line loop; line editing and
history are out of scope here. Every dispatched line follows
`[@alias] command [args...] [--options]`; the subprocess does its own
routing, so `@self` lines run locally and remote aliases hop transparently.
*/

use anyhow::Result;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::alias::{ALIAS_MARKER, AliasTable};
use crate::catalog::{CommandCatalog, CommandDescriptor, parse_options, proxy_descriptor};
use crate::cmd::format::{Role, StyleOptions, color, escape_control, page, wrap_text};
use crate::cmd::shared::{diff_options, partition_tokens, render_result, split_alias_command};
use crate::dispatch::ExecutionContext;
use crate::exec::{InvocationRequest, Invoker};
use crate::error::DispatchError;
use crate::{log_error, log_trace};

/// Generated help wraps descriptions at a conventional terminal width.
const HELP_WRAP_WIDTH: usize = 78;
/// Example descriptions wrap a little narrower to leave room for `// `.
const EXAMPLE_WRAP_WIDTH: usize = 75;

/* ---- Help Generation ---- */

/// Build help text for one descriptor: the word-wrapped description, then an
/// `e.g.` block of example usages.
///
/// Examples with empty invocation text are skipped, as are ones containing a
/// pipe, since a replayed pipeline would not mean what the original did. A
/// leading `<tool_name> ` prefix is stripped so examples read as shell
/// input.
pub fn build_help(descriptor: &CommandDescriptor, tool_name: &str) -> String {
    let mut help = wrap_text(&descriptor.description, HELP_WRAP_WIDTH).join("\n");

    let examples: Vec<(String, String)> = descriptor
        .examples
        .iter()
        .filter(|ex| !ex.invocation.is_empty() && !ex.invocation.contains('|'))
        .map(|ex| {
            let invocation = ex
                .invocation
                .strip_prefix(tool_name)
                .filter(|rest| rest.starts_with(char::is_whitespace))
                .map(str::trim_start)
                .unwrap_or(&ex.invocation);
            (invocation.to_string(), ex.description.clone())
        })
        .collect();

    if !examples.is_empty() {
        help.push_str("\n\ne.g.");
        for (invocation, description) in &examples {
            for line in wrap_text(&escape_control(description), EXAMPLE_WRAP_WIDTH) {
                help.push_str("\n// ");
                help.push_str(&line);
            }
            help.push_str("\n>>> ");
            help.push_str(&escape_control(invocation));
            help.push('\n');
        }
    }

    help
}

/* ---- Adapter ---- */

/// One catalog entry wrapped for interactive invocation.
#[derive(Debug, Clone)]
pub struct ShellCommandAdapter {
    descriptor: CommandDescriptor,
}

impl ShellCommandAdapter {
    pub fn new(descriptor: CommandDescriptor) -> Self {
        ShellCommandAdapter { descriptor }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.descriptor.aliases
    }

    pub fn help(&self, tool_name: &str) -> String {
        build_help(&self.descriptor, tool_name)
    }

    /// Dispatch one interactive invocation.
    ///
    /// The first positional names the alias when it carries the marker;
    /// otherwise the context default applies and the first positional is the
    /// command. Empty positionals are dropped, and only options differing
    /// from the descriptor's declared defaults are forwarded. The child's
    /// exit code becomes this command's own.
    pub fn execute<I: Invoker>(
        &self,
        positionals: &[String],
        supplied: &BTreeMap<String, Value>,
        aliases: &AliasTable,
        ctx: &ExecutionContext,
        invoker: &I,
        out: &mut impl Write,
        style: &StyleOptions,
    ) -> Result<i32> {
        let Some(tokens) = split_alias_command(positionals, ALIAS_MARKER) else {
            return Err(DispatchError::MissingArgument {
                command: self.descriptor.name.clone(),
                argument: "command".into(),
            }
            .into());
        };

        let alias = aliases.resolve_or_default(tokens.alias_token.as_deref(), &ctx.default_alias)?;
        let args: Vec<String> = tokens.rest.iter().filter(|t| !t.is_empty()).cloned().collect();
        let options = diff_options(supplied, &self.descriptor);

        let request = InvocationRequest {
            alias: alias.clone(),
            command: tokens.command,
            args,
            options,
        };
        log_trace!("shell dispatch: {:?}", request);

        let result = invoker.invoke(&request)?;
        render_result(&result, out, style)?;
        Ok(result.exit_code)
    }
}

/* ---- Interactive Loop ---- */

pub fn execute_shell<I: Invoker>(
    catalog: &CommandCatalog,
    aliases: &AliasTable,
    ctx: &ExecutionContext,
    invoker: &I,
) -> Result<i32> {
    let style = StyleOptions::detect();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!(
        "siterun {} interactive shell ({} aliases loaded)",
        env!("CARGO_PKG_VERSION"),
        aliases.len()
    );
    println!(
        "{}",
        color(
            Role::Dim,
            "Type `[@alias] command [args...]`, `help [command]`, or `exit`.",
            &style
        )
    );

    loop {
        print!("{} ", color(Role::Accent, "siterun>", &style));
        stdout.flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            // EOF ends the session like `exit`.
            println!();
            return Ok(0);
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let tokens = match shell_words::split(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                log_error!("unparseable input: {err}");
                continue;
            }
        };

        match tokens.first().map(String::as_str) {
            Some("exit") | Some("quit") => return Ok(0),
            Some("help") => {
                show_help(catalog, tokens.get(1).map(String::as_str), &style)?;
                continue;
            }
            _ => {}
        }

        let (positionals, raw_options) = partition_tokens(&tokens);
        let Some(shell_tokens) = split_alias_command(&positionals, ALIAS_MARKER) else {
            eprintln!("siterun: usage: [@alias] command [args...] [--options]");
            continue;
        };

        let descriptor = catalog
            .lookup(&shell_tokens.command)
            .cloned()
            .unwrap_or_else(|| proxy_descriptor(&shell_tokens.command));

        let supplied = match parse_options(&descriptor, &raw_options) {
            Ok(supplied) => supplied,
            Err(err) => {
                eprintln!("siterun: {err}");
                continue;
            }
        };

        let adapter = ShellCommandAdapter::new(descriptor);
        match adapter.execute(
            &positionals,
            &supplied,
            aliases,
            ctx,
            invoker,
            &mut stdout,
            &style,
        ) {
            Ok(code) => {
                if code != 0 {
                    log_trace!("command exited with {code}");
                }
            }
            Err(err) => log_error!("{err:#}"),
        }
    }
}

fn show_help(
    catalog: &CommandCatalog,
    command: Option<&str>,
    style: &StyleOptions,
) -> Result<()> {
    match command {
        Some(name) => match catalog.lookup(name) {
            Some(descriptor) => {
                let adapter = ShellCommandAdapter::new(descriptor.clone());
                let mut text = adapter.name().to_string();
                if !adapter.aliases().is_empty() {
                    text.push_str(&format!(" ({})", adapter.aliases().join(", ")));
                }
                text.push_str("\n\n");
                text.push_str(&adapter.help("siterun"));
                page(&text, style)?;
            }
            None => {
                println!(
                    "No local help for `{name}`; the command may still exist on a remote target."
                );
            }
        },
        None => {
            let mut text = String::from("Available commands:\n");
            for descriptor in catalog.iter() {
                let aliases = if descriptor.aliases.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", descriptor.aliases.join(", "))
                };
                let summary = wrap_text(&descriptor.description, 60);
                text.push_str(&format!(
                    "  {:<16} {}\n",
                    format!("{}{aliases}", descriptor.name),
                    summary.first().map(String::as_str).unwrap_or("")
                ));
            }
            text.push_str("\nUnknown names are routed to the target alias before failing.\n");
            page(&text, style)?;
        }
    }
    Ok(())
}

/* ---- Tests ---- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ArgSpec, ExampleUsage, OptionSpec};
    use crate::error::DispatchError;
    use crate::exec::InvocationResult;
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

    fn cache_clear_descriptor() -> CommandDescriptor {
        CommandDescriptor {
            name: "cache-clear".into(),
            aliases: vec![],
            args: vec![ArgSpec::variadic("targets")],
            options: vec![OptionSpec::new("verbose", "Chatty output", json!(false))],
            description: "Drop a cache on the target environment.".into(),
            examples: vec![],
            accept_unknown_options: false,
        }
    }

    fn plain_style() -> StyleOptions {
        StyleOptions {
            use_color: false,
            term_width: 80,
            term_height: 24,
        }
    }

    fn prod_table() -> AliasTable {
        let mut table = AliasTable::with_self();
        table.insert(crate::alias::Alias {
            name: "@prod".into(),
            target: crate::alias::AliasTarget::Remote {
                host: "prod.example.com".into(),
                user: None,
                root: None,
            },
        });
        table
    }

    #[test]
    fn alias_token_and_empty_args_handled() {
        let adapter = ShellCommandAdapter::new(cache_clear_descriptor());
        let invoker = FakeInvoker::returning(0, "", "");
        let ctx = ExecutionContext::new("@self", true);
        let mut out = Vec::new();

        let positionals: Vec<String> =
            vec!["@prod".into(), "cache-clear".into(), "".into(), "bin".into()];
        let supplied = BTreeMap::from([("verbose".to_string(), json!(true))]);

        let code = adapter
            .execute(
                &positionals,
                &supplied,
                &prod_table(),
                &ctx,
                &invoker,
                &mut out,
                &plain_style(),
            )
            .unwrap();

        assert_eq!(code, 0);
        let seen = invoker.seen.borrow();
        assert_eq!(seen[0].alias.name, "@prod");
        assert_eq!(seen[0].command, "cache-clear");
        assert_eq!(seen[0].args, vec!["bin"], "empty token dropped");
        assert_eq!(seen[0].options.get("verbose"), Some(&json!(true)));
    }

    #[test]
    fn default_options_are_not_forwarded() {
        let adapter = ShellCommandAdapter::new(cache_clear_descriptor());
        let invoker = FakeInvoker::returning(0, "", "");
        let ctx = ExecutionContext::new("@self", true);
        let mut out = Vec::new();

        let positionals: Vec<String> = vec!["cache-clear".into(), "bin".into()];
        let supplied = BTreeMap::from([("verbose".to_string(), json!(false))]);

        adapter
            .execute(
                &positionals,
                &supplied,
                &AliasTable::with_self(),
                &ctx,
                &invoker,
                &mut out,
                &plain_style(),
            )
            .unwrap();

        let seen = invoker.seen.borrow();
        assert!(seen[0].options.is_empty(), "defaults must diff away");
        assert_eq!(seen[0].alias.name, "@self", "no marker token means default alias");
    }

    #[test]
    fn failed_result_writes_stderr_and_blank_line() {
        let adapter = ShellCommandAdapter::new(cache_clear_descriptor());
        let invoker = FakeInvoker::returning(1, "", "permission denied");
        let ctx = ExecutionContext::new("@self", true);
        let mut out = Vec::new();

        let positionals: Vec<String> = vec!["cache-clear".into(), "bin".into()];
        let code = adapter
            .execute(
                &positionals,
                &BTreeMap::new(),
                &AliasTable::with_self(),
                &ctx,
                &invoker,
                &mut out,
                &plain_style(),
            )
            .unwrap();

        assert_eq!(code, 1, "child exit code propagates verbatim");
        assert_eq!(String::from_utf8(out).unwrap(), "permission denied\n");
    }

    #[test]
    fn unknown_alias_aborts_before_invoking() {
        let adapter = ShellCommandAdapter::new(cache_clear_descriptor());
        let invoker = FakeInvoker::returning(0, "", "");
        let ctx = ExecutionContext::new("@self", true);
        let mut out = Vec::new();

        let positionals: Vec<String> = vec!["@ghost".into(), "cache-clear".into()];
        let err = adapter
            .execute(
                &positionals,
                &BTreeMap::new(),
                &AliasTable::with_self(),
                &ctx,
                &invoker,
                &mut out,
                &plain_style(),
            )
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::AliasNotFound(_))
        ));
        assert!(invoker.seen.borrow().is_empty());
    }

    #[test]
    fn help_skips_empty_and_piped_examples() {
        let mut descriptor = cache_clear_descriptor();
        descriptor.examples = vec![
            ExampleUsage::new("", "An empty invocation."),
            ExampleUsage::new("cache-clear bin | tee log", "A piped invocation."),
            ExampleUsage::new("siterun cache-clear bin", "Clear the binary cache."),
        ];
        let help = build_help(&descriptor, "siterun");

        assert!(!help.contains("tee log"));
        assert!(help.contains(">>> cache-clear bin"), "prefix stripped: {help}");
        assert!(help.contains("// Clear the binary cache."));
    }

    #[test]
    fn help_without_examples_is_just_the_description() {
        let descriptor = cache_clear_descriptor();
        let help = build_help(&descriptor, "siterun");
        assert_eq!(help, "Drop a cache on the target environment.");
        assert!(!help.contains("e.g."));
    }

    #[test]
    fn help_wraps_long_descriptions() {
        let mut descriptor = cache_clear_descriptor();
        descriptor.description = "word ".repeat(40).trim_end().to_string();
        let help = build_help(&descriptor, "siterun");
        for line in help.lines() {
            assert!(line.chars().count() <= HELP_WRAP_WIDTH, "{line}");
        }
    }

    #[test]
    fn help_prefix_strip_requires_whitespace_boundary() {
        let mut descriptor = cache_clear_descriptor();
        descriptor.examples = vec![ExampleUsage::new("siterunner cache-clear", "Close call.")];
        let help = build_help(&descriptor, "siterun");
        assert!(help.contains(">>> siterunner cache-clear"));
    }
}
