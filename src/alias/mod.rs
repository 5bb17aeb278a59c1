//! Alias model and resolution (local vs remote site targets).
//!
//! An alias names an environment a command can be dispatched to: the current
//! one (`@self`), another local root, or a remote host. Tables are loaded
//! once from an alias file (YAML or JSON) and are read-only afterwards.
//!
//! Helpers: canonical_token / parse_endpoint; AliasTable::{resolve,
//! resolve_or_default, load}.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::DispatchError;

/// Marker character that prefixes alias tokens (`@prod`).
pub const ALIAS_MARKER: char = '@';

/// Conventional name of the already-bootstrapped current environment.
pub const SELF_ALIAS: &str = "@self";

/// Where an alias points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    /// An environment reachable in-process or by re-invoking the tool
    /// against another root on this machine.
    Local { root: Option<PathBuf> },
    /// An environment on another host, reached over the remote transport.
    Remote {
        host: String,
        user: Option<String>,
        root: Option<String>,
    },
}

/// A named target environment. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    pub name: String,
    pub target: AliasTarget,
}

impl Alias {
    /// A local alias with no explicit root.
    pub fn local(name: impl Into<String>) -> Self {
        Alias {
            name: canonical_token(&name.into()),
            target: AliasTarget::Local { root: None },
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.target, AliasTarget::Remote { .. })
    }

    pub fn is_local(&self) -> bool {
        matches!(self.target, AliasTarget::Local { .. })
    }

    /// Remote root path, if any. Local roots are surfaced as `--root` on the
    /// re-invocation instead.
    pub fn root(&self) -> Option<String> {
        match &self.target {
            AliasTarget::Local { root } => root.as_ref().map(|p| p.display().to_string()),
            AliasTarget::Remote { root, .. } => root.clone(),
        }
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            AliasTarget::Local { root: None } => write!(f, "local"),
            AliasTarget::Local { root: Some(root) } => {
                write!(f, "local: {}", root.display())
            }
            AliasTarget::Remote { host, user, root } => {
                write!(f, "remote: ")?;
                if let Some(user) = user {
                    write!(f, "{user}@")?;
                }
                write!(f, "{host}")?;
                if let Some(root) = root {
                    write!(f, ":{root}")?;
                }
                Ok(())
            }
        }
    }
}

/// Normalize an alias token to its canonical `@name` form.
pub fn canonical_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.starts_with(ALIAS_MARKER) {
        trimmed.to_string()
    } else {
        format!("{ALIAS_MARKER}{trimmed}")
    }
}

/// On-disk shape of one alias entry. A `host` makes the alias remote.
#[derive(Debug, Deserialize)]
struct AliasFileEntry {
    host: Option<String>,
    user: Option<String>,
    root: Option<String>,
}

/// Turn a file entry into a target.
///
/// Hosts may be bare (`prod.example.com`) or `ssh://user@host` URLs; a URL
/// username wins over the entry-level `user` field.
fn parse_endpoint(entry: &AliasFileEntry) -> Result<AliasTarget> {
    let Some(host_raw) = entry.host.as_deref().map(str::trim).filter(|h| !h.is_empty()) else {
        return Ok(AliasTarget::Local {
            root: entry.root.as_ref().map(PathBuf::from),
        });
    };

    if host_raw.contains("://") {
        let url = Url::parse(host_raw)
            .with_context(|| format!("invalid host URL '{host_raw}'"))?;
        if url.scheme() != "ssh" {
            bail!("unsupported host scheme '{}' (expected ssh://)", url.scheme());
        }
        let host = url
            .host_str()
            .with_context(|| format!("host URL '{host_raw}' has no host part"))?
            .to_string();
        let user = if url.username().is_empty() {
            entry.user.clone()
        } else {
            Some(url.username().to_string())
        };
        return Ok(AliasTarget::Remote {
            host,
            user,
            root: entry.root.clone(),
        });
    }

    Ok(AliasTarget::Remote {
        host: host_raw.to_string(),
        user: entry.user.clone(),
        root: entry.root.clone(),
    })
}

/// Pre-loaded, read-only alias table. `@self` is always present.
#[derive(Debug, Clone)]
pub struct AliasTable {
    entries: BTreeMap<String, Alias>,
}

impl AliasTable {
    /// A table holding only the `@self` local alias.
    pub fn with_self() -> Self {
        let mut entries = BTreeMap::new();
        let this = Alias::local(SELF_ALIAS);
        entries.insert(this.name.clone(), this);
        AliasTable { entries }
    }

    pub fn insert(&mut self, alias: Alias) {
        self.entries.insert(alias.name.clone(), alias);
    }

    /// Pure lookup of one token. The marker prefix is optional on input.
    pub fn resolve(&self, token: &str) -> Result<&Alias, DispatchError> {
        let canonical = canonical_token(token);
        self.entries
            .get(&canonical)
            .ok_or(DispatchError::AliasNotFound(canonical))
    }

    /// Resolve, substituting `default` for an omitted or empty token.
    ///
    /// The default is an explicit input so callers (and tests) choose it;
    /// nothing here hard-codes `@self`.
    pub fn resolve_or_default(
        &self,
        token: Option<&str>,
        default: &str,
    ) -> Result<&Alias, DispatchError> {
        match token.map(str::trim) {
            Some(t) if !t.trim_start_matches(ALIAS_MARKER).is_empty() => self.resolve(t),
            _ => self.resolve(default),
        }
    }

    /// Load a table from a YAML or JSON alias file, seeded with `@self`.
    ///
    /// Extension decides the format: `.yaml` / `.yml` parse as YAML,
    /// anything else as JSON. File keys may carry the marker or not.
    pub fn load(path: &Path) -> Result<Self, DispatchError> {
        let invalid = |reason: String| DispatchError::InvalidAliasFile {
            path: path.display().to_string(),
            reason,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let lower = path.display().to_string().to_ascii_lowercase();

        let parsed: BTreeMap<String, AliasFileEntry> =
            if lower.ends_with(".yaml") || lower.ends_with(".yml") {
                serde_yaml::from_str(&raw).map_err(|e| invalid(e.to_string()))?
            } else {
                serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?
            };

        let mut table = AliasTable::with_self();
        for (name, entry) in &parsed {
            let target = parse_endpoint(entry).map_err(|e| invalid(format!("{name}: {e:#}")))?;
            table.insert(Alias {
                name: canonical_token(name),
                target,
            });
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Aliases in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Alias> {
        self.entries.values()
    }
}
