//! Routing: decide whether an invocation runs here or is forwarded, and the
//! proxy execution path for names the local catalog does not know.
//!
//! The hook is consulted before any command executes. Forwarding adopts the
//! target's outcome wholesale; the caller ends the process with that exit
//! code. Falling through is an explicit `NotRedispatched` value, not an
//! implicit control-flow accident, so both branches are testable.

use crate::alias::AliasTable;
use crate::catalog::ParsedInvocation;
use crate::error::DispatchError;
use crate::exec::{InvocationRequest, InvocationResult, Invoker};
use crate::log_debug;

/// Explicit inputs the routing decision depends on. Built once per process
/// at the binary edge; tests construct their own.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Alias substituted when an invocation names none.
    pub default_alias: String,
    /// Whether this process is itself the final execution target. When
    /// false, even local invocations are forwarded onward.
    pub final_target: bool,
}

impl ExecutionContext {
    pub fn new(default_alias: impl Into<String>, final_target: bool) -> Self {
        ExecutionContext {
            default_alias: default_alias.into(),
            final_target,
        }
    }
}

/// Outcome of consulting the hook.
#[derive(Debug, Clone, PartialEq)]
pub enum Redispatch {
    /// The invocation stays local; the caller continues executing it.
    NotRedispatched,
    /// The invocation ran elsewhere; its outcome is final and the caller
    /// must end with this result's exit code.
    Terminated(InvocationResult),
}

/// Routes invocations to their resolved target.
pub struct RedispatchHook<'a, I: Invoker> {
    aliases: &'a AliasTable,
    invoker: &'a I,
}

impl<'a, I: Invoker> RedispatchHook<'a, I> {
    pub fn new(aliases: &'a AliasTable, invoker: &'a I) -> Self {
        RedispatchHook { aliases, invoker }
    }

    /// Forward the invocation if its target is remote, or if this process is
    /// not the final execution target. Alias resolution failures abort
    /// before anything is spawned.
    pub fn redispatch_if_remote(
        &self,
        invocation: &ParsedInvocation,
        ctx: &ExecutionContext,
    ) -> Result<Redispatch, DispatchError> {
        let alias = self
            .aliases
            .resolve_or_default(invocation.alias_token.as_deref(), &ctx.default_alias)?;

        if alias.is_remote() || !ctx.final_target {
            log_debug!(
                "redispatching {} to {} ({})",
                invocation.command,
                alias.name,
                alias
            );
            let request = InvocationRequest {
                alias: alias.clone(),
                command: invocation.command.clone(),
                args: invocation.args.clone(),
                options: invocation.options.clone(),
            };
            let result = self.invoker.invoke(&request)?;
            return Ok(Redispatch::Terminated(result));
        }

        log_debug!("{} stays local on {}", invocation.command, alias.name);
        Ok(Redispatch::NotRedispatched)
    }
}

/// Execute a proxy stand-in for a name the local catalog does not know.
///
/// A proxy can only succeed by being forwarded elsewhere. When the hook
/// falls through, meaning the target is this very process, the name is unknown
/// everywhere and the invocation fails.
pub fn execute_proxy<I: Invoker>(
    hook: &RedispatchHook<'_, I>,
    invocation: &ParsedInvocation,
    ctx: &ExecutionContext,
) -> Result<InvocationResult, DispatchError> {
    if let Redispatch::Terminated(result) = hook.redispatch_if_remote(invocation, ctx)? {
        return Ok(result);
    }
    Err(DispatchError::CommandNotExecutable(invocation.command.clone()))
}
