/*!
`alias_cmd.rs`

Implements the `alias` subcommand: inspect the loaded alias table.

Behavior:
  - With no argument: list every alias with its kind and endpoint.
  - With a token: resolve that one alias and show its details, failing with
    the same error the dispatcher would raise for an unknown token.
  - `--json` for machine output in both forms.
*/

use anyhow::Result;
use clap::Args;

use crate::alias::{Alias, AliasTable, AliasTarget};
use crate::cmd::format::{Role, StyleOptions, color, table};

/// CLI arguments for `siterun alias`.
#[derive(Args, Debug)]
pub struct AliasArgs {
    /// Alias token to inspect (lists all when omitted)
    #[arg(value_name = "ALIAS")]
    pub token: Option<String>,

    /// Output JSON instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

fn alias_json(alias: &Alias) -> serde_json::Value {
    match &alias.target {
        AliasTarget::Local { root } => serde_json::json!({
            "name": alias.name,
            "kind": "local",
            "root": root.as_ref().map(|p| p.display().to_string()),
        }),
        AliasTarget::Remote { host, user, root } => serde_json::json!({
            "name": alias.name,
            "kind": "remote",
            "host": host,
            "user": user,
            "root": root,
        }),
    }
}

/// Entry point for the alias subcommand.
pub fn execute_alias(args: AliasArgs, aliases: &AliasTable) -> Result<i32> {
    if let Some(token) = &args.token {
        let alias = aliases.resolve(token)?;
        if args.json {
            let payload = alias_json(alias);
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
            );
        } else {
            println!("{}  {}", alias.name, alias);
        }
        return Ok(0);
    }

    if args.json {
        let payload = serde_json::json!({
            "status": "ok",
            "count": aliases.len(),
            "aliases": aliases.iter().map(alias_json).collect::<Vec<_>>(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string())
        );
        return Ok(0);
    }

    let style = StyleOptions::detect();
    let rows: Vec<Vec<String>> = aliases
        .iter()
        .map(|a| {
            let kind = if a.is_remote() { "remote" } else { "local" };
            vec![a.name.clone(), kind.to_string(), a.to_string()]
        })
        .collect();

    println!(
        "{}",
        color(Role::Heading, format!("Aliases ({})", aliases.len()), &style)
    );
    println!("{}", table(&["NAME", "KIND", "TARGET"], &rows, &style));
    Ok(0)
}

/* ---- Tests ---- */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::canonical_token;
    use crate::error::DispatchError;

    fn loaded_table() -> AliasTable {
        let mut t = AliasTable::with_self();
        t.insert(Alias {
            name: canonical_token("prod"),
            target: AliasTarget::Remote {
                host: "prod.example.com".into(),
                user: Some("deploy".into()),
                root: Some("/var/www/html".into()),
            },
        });
        t
    }

    #[test]
    fn inspect_unknown_alias_fails_like_dispatch() {
        let err = execute_alias(
            AliasArgs {
                token: Some("@ghost".into()),
                json: false,
            },
            &loaded_table(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DispatchError>(),
            Some(DispatchError::AliasNotFound(_))
        ));
    }

    #[test]
    fn remote_alias_json_carries_endpoint() {
        let table = loaded_table();
        let alias = table.resolve("@prod").unwrap();
        let json = alias_json(alias);
        assert_eq!(json["kind"], "remote");
        assert_eq!(json["host"], "prod.example.com");
        assert_eq!(json["user"], "deploy");
    }

    #[test]
    fn listing_exits_zero() {
        let code = execute_alias(
            AliasArgs {
                token: None,
                json: true,
            },
            &loaded_table(),
        )
        .unwrap();
        assert_eq!(code, 0);
    }
}
