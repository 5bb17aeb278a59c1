use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod alias;
mod catalog;
mod cmd;
mod dispatch;
mod error;
mod exec;
mod utils;

use alias::{AliasTable, SELF_ALIAS};
use catalog::CommandCatalog;
use cmd::{AliasArgs, ListArgs, RunArgs};
use dispatch::ExecutionContext;
use error::DispatchError;
use exec::ProcessInvoker;

/// Siterun - dispatch commands to local or remote site environments.
///
/// Command layout:
///   siterun run [@alias] <command> [args...] [--options]
///   siterun shell
///   siterun list  [--json]
///   siterun alias [ALIAS] [--json]
///
/// Notes:
///   - `run` resolves the command against the local catalog; unknown names
///     are still routed to the target alias and only fail if the final
///     target does not know them either.
///   - Omitting `@alias` dispatches to `@self`, the current environment.
///
/// Global flags / env:
///   -v / -vv           Increase verbosity
///   -q / --quiet       Errors only
///   -A / --alias-file  Alias definitions (or SITERUN_ALIAS_FILE env)
///   -r / --root        Site root the target environment operates on
///   SITERUN_ALIAS_FILE   Environment fallback if -A not provided
///   SITERUN_FINAL_TARGET Set to 0/false to forward even local invocations
///   SITERUN_REMOTE_BIN   Binary name used on the far side of an ssh hop
///
/// Examples:
///   siterun run status
///   siterun run @prod cache:rebuild --verbose
///   siterun -A ~/.config/siterun/aliases.yml run @staging env:get PATH
///   siterun alias @prod --json
#[derive(Parser, Debug)]
#[command(
    name = "siterun",
    version,
    author,
    about = "Siterun - dispatch commands to local or remote site environments",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Alias definition file, YAML or JSON (falls back to SITERUN_ALIAS_FILE)
    #[arg(short = 'A', long = "alias-file", global = true, value_name = "PATH")]
    alias_file: Option<PathBuf>,

    /// Site root the target environment operates on
    #[arg(short = 'r', long = "root", global = true, value_name = "PATH")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch one command against an alias
    Run(RunArgs),

    /// Interactive shell over the command catalog
    Shell,

    /// List locally known commands
    List(ListArgs),

    /// Inspect the loaded alias table
    Alias(AliasArgs),
}

fn main() {
    let cli = Cli::parse();

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("siterun: {err:#}");
            let code = err
                .downcast_ref::<DispatchError>()
                .map(DispatchError::exit_code)
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    // Determine the alias file (CLI flag > SITERUN_ALIAS_FILE env).
    let alias_file = cli.alias_file.clone().or_else(|| {
        std::env::var("SITERUN_ALIAS_FILE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
    });

    let aliases = match &alias_file {
        Some(path) => AliasTable::load(path)?,
        None => AliasTable::with_self(),
    };
    utils::logging::debug(format!("{} aliases loaded", aliases.len()));

    let ctx = ExecutionContext::new(SELF_ALIAS, final_target_from_env());
    let catalog = CommandCatalog::builtin();
    let invoker = ProcessInvoker::from_env();

    match cli.command {
        Commands::Run(args) => {
            cmd::execute_run(args, &catalog, &aliases, &ctx, &invoker, cli.root.as_deref())
        }
        Commands::Shell => cmd::execute_shell(&catalog, &aliases, &ctx, &invoker),
        Commands::List(args) => cmd::execute_list(args, &catalog),
        Commands::Alias(args) => cmd::execute_alias(args, &aliases),
    }
}

/// Whether this process is itself the final execution target.
///
/// An explicit input rather than inferred state: the default is true for a
/// directly started process, and an orchestrating parent can set
/// SITERUN_FINAL_TARGET=0 to make even local invocations forward onward.
fn final_target_from_env() -> bool {
    match std::env::var("SITERUN_FINAL_TARGET") {
        Ok(v) => !matches!(v.trim().to_ascii_lowercase().as_str(), "0" | "false" | "no"),
        Err(_) => true,
    }
}
