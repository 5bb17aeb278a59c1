//! Error types for the dispatch layer.

use thiserror::Error;

/// Errors raised while resolving, routing, or starting an invocation.
///
/// Non-zero exit codes of a successfully started child are NOT errors; they
/// travel back as ordinary `InvocationResult` values. Only failure to route
/// or to even attempt execution lands here.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Unknown alias: {0}")]
    AliasNotFound(String),

    #[error("Command {0} could not be executed remotely")]
    CommandNotExecutable(String),

    #[error("Failed to start invocation via '{program}': {source}")]
    InvocationStart {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown option --{option} for command {command}")]
    UnknownOption { command: String, option: String },

    #[error("Missing required argument <{argument}> for command {command}")]
    MissingArgument { command: String, argument: String },

    #[error("Invalid alias file {path}: {reason}")]
    InvalidAliasFile { path: String, reason: String },
}

impl DispatchError {
    /// Process exit code for this error kind.
    ///
    /// 127 marks a command unknown both locally and at the final target,
    /// 2 marks resolution/usage failures (nothing was spawned),
    /// 1 marks an invocation that could not be started.
    pub fn exit_code(&self) -> i32 {
        match self {
            DispatchError::CommandNotExecutable(_) => 127,
            DispatchError::AliasNotFound(_)
            | DispatchError::UnknownOption { .. }
            | DispatchError::MissingArgument { .. }
            | DispatchError::InvalidAliasFile { .. } => 2,
            DispatchError::InvocationStart { .. } => 1,
        }
    }
}
