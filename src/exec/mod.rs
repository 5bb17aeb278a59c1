//! Process invocation: one request in, one spawned child, one captured
//! result out.
//!
//! Local aliases re-invoke this binary against the alias root; remote
//! aliases go through `ssh` with the forwarded command line joined
//! shell-safely. Spawning is synchronous from the caller's point of view:
//! a temporary runtime drives the child to completion and the exit code
//! comes back verbatim, with stdout and stderr captured separately.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::alias::{Alias, AliasTarget};
use crate::cmd::shared::option_args;
use crate::error::DispatchError;
use crate::log_debug;

/// One invocation against one resolved alias. Immutable once built; scoped
/// to a single execution.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub alias: Alias,
    pub command: String,
    pub args: Vec<String>,
    /// Only options differing from the command's declared defaults.
    pub options: BTreeMap<String, Value>,
}

/// Captured outcome of one invocation. Never mutated after capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Seam to the execution mechanism, so routing and rendering can be tested
/// against a fake.
pub trait Invoker {
    fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResult, DispatchError>;
}

/// Spawns real child processes for forwarded invocations.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    /// Binary re-invoked for local aliases.
    local_bin: PathBuf,
    /// Binary named on the remote side of an ssh hop.
    remote_bin: String,
}

impl ProcessInvoker {
    pub fn new(local_bin: PathBuf, remote_bin: impl Into<String>) -> Self {
        ProcessInvoker {
            local_bin,
            remote_bin: remote_bin.into(),
        }
    }

    /// Resolve binaries from the environment: the running executable for
    /// local hops, `SITERUN_REMOTE_BIN` (default `siterun`) for remote ones.
    pub fn from_env() -> Self {
        let local_bin = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("siterun"));
        let remote_bin = std::env::var("SITERUN_REMOTE_BIN")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "siterun".to_string());
        ProcessInvoker::new(local_bin, remote_bin)
    }

    /// The `run` argv forwarded to the target, excluding the program itself.
    /// Global flags go before the subcommand so the receiving parser never
    /// confuses them with forwarded command tokens.
    fn forwarded_argv(&self, request: &InvocationRequest) -> Vec<String> {
        let mut argv = Vec::new();
        if let Some(root) = request.alias.root() {
            argv.push("--root".to_string());
            argv.push(root);
        }
        argv.push("run".to_string());
        argv.push(request.command.clone());
        argv.extend(request.args.iter().cloned());
        argv.extend(option_args(&request.options));
        argv
    }

    /// Program + arguments for one request.
    pub fn command_line(&self, request: &InvocationRequest) -> (String, Vec<String>) {
        match &request.alias.target {
            AliasTarget::Local { .. } => {
                let program = self.local_bin.display().to_string();
                (program, self.forwarded_argv(request))
            }
            AliasTarget::Remote { host, user, .. } => {
                let destination = match user {
                    Some(user) => format!("{user}@{host}"),
                    None => host.clone(),
                };
                let mut remote = vec![self.remote_bin.clone()];
                remote.extend(self.forwarded_argv(request));
                (
                    "ssh".to_string(),
                    vec![destination, shell_words::join(remote.iter())],
                )
            }
        }
    }
}

impl Invoker for ProcessInvoker {
    fn invoke(&self, request: &InvocationRequest) -> Result<InvocationResult, DispatchError> {
        let (program, args) = self.command_line(request);
        log_debug!("invoking {} {}", program, shell_words::join(args.iter()));

        let start_failure = |source: std::io::Error| DispatchError::InvocationStart {
            program: program.clone(),
            source,
        };

        let rt = tokio::runtime::Runtime::new().map_err(start_failure)?;
        rt.block_on(async {
            let output = tokio::process::Command::new(&program)
                .args(&args)
                .output()
                .await
                .map_err(|e| DispatchError::InvocationStart {
                    program: program.clone(),
                    source: e,
                })?;

            Ok(InvocationResult {
                exit_code: output.status.code().unwrap_or(1),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::canonical_token;
    use serde_json::json;

    fn remote_request() -> InvocationRequest {
        InvocationRequest {
            alias: Alias {
                name: canonical_token("prod"),
                target: AliasTarget::Remote {
                    host: "prod.example.com".into(),
                    user: Some("deploy".into()),
                    root: Some("/var/www/html".into()),
                },
            },
            command: "rebuild".into(),
            args: vec!["bin".into()],
            options: BTreeMap::from([("verbose".to_string(), json!(true))]),
        }
    }

    #[test]
    fn remote_command_line_goes_through_ssh() {
        let invoker = ProcessInvoker::new(PathBuf::from("/usr/local/bin/siterun"), "siterun");
        let (program, args) = invoker.command_line(&remote_request());
        assert_eq!(program, "ssh");
        assert_eq!(args[0], "deploy@prod.example.com");
        assert_eq!(
            args[1],
            "siterun --root /var/www/html run rebuild bin --verbose"
        );
    }

    #[test]
    fn local_alias_reinvokes_this_binary_with_root() {
        let invoker = ProcessInvoker::new(PathBuf::from("/usr/local/bin/siterun"), "siterun");
        let request = InvocationRequest {
            alias: Alias {
                name: canonical_token("other"),
                target: AliasTarget::Local {
                    root: Some(PathBuf::from("/srv/other-site")),
                },
            },
            command: "status".into(),
            args: vec![],
            options: BTreeMap::new(),
        };
        let (program, args) = invoker.command_line(&request);
        assert_eq!(program, "/usr/local/bin/siterun");
        assert_eq!(args, vec!["--root", "/srv/other-site", "run", "status"]);
    }

    #[test]
    fn forwarded_argv_is_reproducible() {
        let invoker = ProcessInvoker::new(PathBuf::from("siterun"), "siterun");
        let request = remote_request();
        assert_eq!(
            invoker.command_line(&request),
            invoker.command_line(&request)
        );
    }

    #[test]
    fn remote_args_with_spaces_survive_joining() {
        let invoker = ProcessInvoker::new(PathBuf::from("siterun"), "siterun");
        let mut request = remote_request();
        request.args = vec!["two words".into()];
        let (_, args) = invoker.command_line(&request);
        assert!(args[1].contains("'two words'"), "joined: {}", args[1]);
    }

    #[test]
    fn result_success_tracks_exit_code() {
        let ok = InvocationResult {
            exit_code: 0,
            stdout: "fine".into(),
            stderr: String::new(),
        };
        assert!(ok.is_success());
        let failed = InvocationResult {
            exit_code: 1,
            stdout: String::new(),
            stderr: "permission denied".into(),
        };
        assert!(!failed.is_success());
    }
}
