//! Command catalog: descriptors, lookup, and the proxy placeholder.
//!
//! A `CommandDescriptor` is plain data: name, aliases, argument and option
//! definitions, description, example usages. The interactive adapter and the
//! dispatcher both work from this one shape; there is no command class
//! hierarchy. Names unknown to the catalog get a synthesized proxy
//! descriptor that accepts anything, so parsing can never fail before the
//! routing decision is made.

use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::DispatchError;

/// How many values a positional argument takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgArity {
    Required,
    Optional,
    /// Captures all remaining tokens.
    Variadic,
}

/// One positional argument definition.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub name: String,
    pub arity: ArgArity,
}

impl ArgSpec {
    pub fn required(name: impl Into<String>) -> Self {
        ArgSpec {
            name: name.into(),
            arity: ArgArity::Required,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        ArgSpec {
            name: name.into(),
            arity: ArgArity::Optional,
        }
    }

    pub fn variadic(name: impl Into<String>) -> Self {
        ArgSpec {
            name: name.into(),
            arity: ArgArity::Variadic,
        }
    }
}

/// One option definition with its declared default.
#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub name: String,
    pub description: String,
    pub default: Value,
}

impl OptionSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>, default: Value) -> Self {
        OptionSpec {
            name: name.into(),
            description: description.into(),
            default,
        }
    }
}

/// One example invocation shown in generated help.
#[derive(Debug, Clone)]
pub struct ExampleUsage {
    pub invocation: String,
    pub description: String,
}

impl ExampleUsage {
    pub fn new(invocation: impl Into<String>, description: impl Into<String>) -> Self {
        ExampleUsage {
            invocation: invocation.into(),
            description: description.into(),
        }
    }
}

/// Data shape of one catalog entry.
#[derive(Debug, Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    pub args: Vec<ArgSpec>,
    pub options: Vec<OptionSpec>,
    pub description: String,
    pub examples: Vec<ExampleUsage>,
    /// Accept and keep option names with no definition instead of rejecting
    /// them. Set only on proxy descriptors.
    pub accept_unknown_options: bool,
}

impl CommandDescriptor {
    pub fn option(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.name == name)
    }

    /// Declared defaults as a name → value map.
    pub fn default_options(&self) -> BTreeMap<String, Value> {
        self.options
            .iter()
            .map(|o| (o.name.clone(), o.default.clone()))
            .collect()
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

/// Synthesize a permissive placeholder descriptor for an unknown name.
///
/// The result parses anything: one variadic positional swallows all tokens
/// verbatim and unrecognized options are kept without validation. Rejection
/// is deferred to dispatch time; the remote end may know commands the local
/// catalog does not.
pub fn proxy_descriptor(name: &str) -> CommandDescriptor {
    CommandDescriptor {
        name: name.to_string(),
        aliases: Vec::new(),
        args: vec![ArgSpec::variadic("arguments")],
        options: Vec::new(),
        description: String::new(),
        examples: Vec::new(),
        accept_unknown_options: true,
    }
}

/// The set of locally known commands.
#[derive(Debug, Clone)]
pub struct CommandCatalog {
    commands: Vec<CommandDescriptor>,
}

impl CommandCatalog {
    pub fn new(commands: Vec<CommandDescriptor>) -> Self {
        CommandCatalog { commands }
    }

    /// Lookup by primary name or declared alias.
    pub fn lookup(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.iter().find(|c| c.matches_name(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// The commands this binary implements itself.
    pub fn builtin() -> Self {
        CommandCatalog::new(vec![
            CommandDescriptor {
                name: "version".into(),
                aliases: vec![],
                args: vec![],
                options: vec![OptionSpec::new(
                    "short",
                    "Print the bare version number",
                    Value::Bool(false),
                )],
                description: "Show the siterun version the target environment runs.".into(),
                examples: vec![
                    ExampleUsage::new("version", "Show the version banner."),
                    ExampleUsage::new("version --short", "Print only the version number."),
                ],
                accept_unknown_options: false,
            },
            CommandDescriptor {
                name: "status".into(),
                aliases: vec!["st".into()],
                args: vec![ArgSpec::optional("field")],
                options: vec![OptionSpec::new(
                    "format",
                    "Output format (table or json)",
                    Value::String("table".into()),
                )],
                description: "Report environment details for the dispatch target: alias table \
                              size, configured root, and whether this process is the final \
                              execution target."
                    .into(),
                examples: vec![
                    ExampleUsage::new("status", "Show the full status table."),
                    ExampleUsage::new("siterun status root", "Show a single field."),
                    ExampleUsage::new("status --format=json | jq .root", "Pipe status into jq."),
                ],
                accept_unknown_options: false,
            },
            CommandDescriptor {
                name: "env:get".into(),
                aliases: vec!["env".into()],
                args: vec![ArgSpec::required("name"), ArgSpec::variadic("names")],
                options: vec![OptionSpec::new(
                    "strict",
                    "Fail when a variable is unset",
                    Value::Bool(false),
                )],
                description: "Print environment variables as seen by the target environment; \
                              handy for checking what a forwarded invocation actually runs \
                              under."
                    .into(),
                examples: vec![
                    ExampleUsage::new("siterun env:get PATH", "Show the target's PATH."),
                    ExampleUsage::new("env:get PATH | tr ':' '\\n'", "Split PATH onto lines."),
                ],
                accept_unknown_options: false,
            },
        ])
    }
}

/// A fully parsed invocation, ready for routing. The alias token is kept
/// unresolved; resolution happens in the dispatch hook against an explicit
/// default.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInvocation {
    pub alias_token: Option<String>,
    pub command: String,
    /// Positional arguments with empty entries removed.
    pub args: Vec<String>,
    /// Options as supplied (coerced), keyed by name.
    pub options: BTreeMap<String, Value>,
}

/// Validate positional tokens against a descriptor's argument definitions.
///
/// Empty tokens are dropped before arity checks. Proxy descriptors end in a
/// variadic argument and therefore accept any sequence.
pub fn parse_args(
    descriptor: &CommandDescriptor,
    positionals: &[String],
) -> Result<Vec<String>, DispatchError> {
    let args: Vec<String> = positionals
        .iter()
        .filter(|t| !t.is_empty())
        .cloned()
        .collect();

    let mut supplied = args.len();
    for spec in &descriptor.args {
        match spec.arity {
            ArgArity::Required => {
                if supplied == 0 {
                    return Err(DispatchError::MissingArgument {
                        command: descriptor.name.clone(),
                        argument: spec.name.clone(),
                    });
                }
                supplied -= 1;
            }
            ArgArity::Optional => {
                supplied = supplied.saturating_sub(1);
            }
            ArgArity::Variadic => {
                supplied = 0;
            }
        }
    }

    Ok(args)
}

/// Coerce and validate supplied options against a descriptor.
///
/// Known options are coerced toward their default's type; unknown names are
/// an error for strict descriptors and kept verbatim for proxy descriptors.
/// A bare `--flag` with no value reads as boolean true.
pub fn parse_options(
    descriptor: &CommandDescriptor,
    raw: &[(String, Option<String>)],
) -> Result<BTreeMap<String, Value>, DispatchError> {
    let mut out = BTreeMap::new();
    for (name, value) in raw {
        match descriptor.option(name) {
            Some(spec) => {
                let coerced = match value {
                    Some(v) => crate::cmd::shared::coerce_option_value(v, &spec.default),
                    None => Value::Bool(true),
                };
                out.insert(name.clone(), coerced);
            }
            None if descriptor.accept_unknown_options => {
                let kept = match value {
                    Some(v) => Value::String(v.clone()),
                    None => Value::Bool(true),
                };
                out.insert(name.clone(), kept);
            }
            None => {
                return Err(DispatchError::UnknownOption {
                    command: descriptor.name.clone(),
                    option: name.clone(),
                });
            }
        }
    }
    Ok(out)
}
