/*!
`list.rs`

Implements the `list` subcommand: enumerate the local command catalog.

Behavior:
  - Human output: a table of NAME | ALIASES | ARGUMENTS | DESCRIPTION.
  - `--json`: machine output, one object per catalog entry.
  - The listing covers only locally known commands; unknown names are still
    dispatchable; they are routed to the target alias before failing.

JSON Output Shape:
{
  "status": "ok",
  "count": 3,
  "commands": [
    { "name": "status", "aliases": ["st"], "description": "..." }
  ]
}
*/

use anyhow::Result;
use clap::Args;

use crate::catalog::{ArgArity, CommandCatalog};
use crate::cmd::format::{Role, StyleOptions, color, table};

/// CLI arguments for `siterun list`.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

/// Entry point for the list subcommand.
pub fn execute_list(args: ListArgs, catalog: &CommandCatalog) -> Result<i32> {
    if args.json {
        let commands: Vec<serde_json::Value> = catalog
            .iter()
            .map(|c| {
                serde_json::json!({
                    "name": c.name,
                    "aliases": c.aliases,
                    "description": c.description,
                })
            })
            .collect();
        let payload = serde_json::json!({
            "status": "ok",
            "count": commands.len(),
            "commands": commands,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
        );
        return Ok(0);
    }

    let style = StyleOptions::detect();
    let rows: Vec<Vec<String>> = catalog
        .iter()
        .map(|c| {
            vec![
                c.name.clone(),
                c.aliases.join(", "),
                argument_summary(c),
                c.description.clone(),
            ]
        })
        .collect();

    println!(
        "{}",
        color(Role::Heading, format!("Commands ({})", catalog.len()), &style)
    );
    println!("{}", table(&["NAME", "ALIASES", "ARGUMENTS", "DESCRIPTION"], &rows, &style));
    println!();
    println!(
        "{}",
        color(
            Role::Dim,
            "Names not listed here are forwarded to the target alias before failing.",
            &style
        )
    );
    Ok(0)
}

/// Render an argument list the way usage lines do: `<name>`, `[name]`,
/// `[name...]`.
fn argument_summary(descriptor: &crate::catalog::CommandDescriptor) -> String {
    descriptor
        .args
        .iter()
        .map(|a| match a.arity {
            ArgArity::Required => format!("<{}>", a.name),
            ArgArity::Optional => format!("[{}]", a.name),
            ArgArity::Variadic => format!("[{}...]", a.name),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/* ---- Tests ---- */
