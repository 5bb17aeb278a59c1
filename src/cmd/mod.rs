/*!
Subcommand modules.

Conventions:
  - Each subcommand module exposes one public `execute_*` function that
    returns `anyhow::Result<i32>`, the process exit code.
  - Argument structs derive `clap::Args` and stay minimal.
  - Helpers shared between the one-shot and interactive paths live in
    `shared.rs`; rendering primitives live in `format.rs`.
*/

pub mod alias_cmd;
pub mod format;
pub mod list;
pub mod run;
pub mod shared;
pub mod shell;

pub use alias_cmd::{AliasArgs, execute_alias};
pub use list::{ListArgs, execute_list};
pub use run::{RunArgs, execute_run};
pub use shell::execute_shell;
