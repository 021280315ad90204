//! Verbosity spec parsing and per-module level resolution.
//!
//! The raw spec is a comma-separated list of `module:level` tokens, e.g.
//! `DRIVER:2,OPT:1`. A token without a `:` must be a bare integer and sets
//! the global default level for every module.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

/// Sentinel key holding the global default level.
///
/// Serialized as a bare integer token, never as `__ALL__:n`.
pub const ALL: &str = "__ALL__";

/// Parsed verbosity spec: module name (or [`ALL`]) mapped to a level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceSpec {
    levels: BTreeMap<String, u32>,
}

impl TraceSpec {
    /// Parse a raw spec string.
    ///
    /// An empty string yields an empty spec. A malformed level is fatal:
    /// there is no best-effort partial parse. When several bare-integer
    /// tokens appear, the last one wins.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut levels = BTreeMap::new();
        if raw.is_empty() {
            return Ok(Self { levels });
        }
        for token in raw.split(',') {
            match token.split_once(':') {
                Some((module, level)) if !level.contains(':') => {
                    let level: u32 = level.parse().with_context(|| {
                        format!("invalid level for module {module:?} in trace spec {raw:?}")
                    })?;
                    levels.insert(module.to_string(), level);
                }
                // Not exactly `module:level`, so it must be a bare global level.
                _ => {
                    let level: u32 = token
                        .parse()
                        .with_context(|| format!("invalid token {token:?} in trace spec {raw:?}"))?;
                    levels.insert(ALL.to_string(), level);
                }
            }
        }
        Ok(Self { levels })
    }

    /// Level recorded for `module` itself, if any.
    pub fn level(&self, module: &str) -> Option<u32> {
        self.levels.get(module).copied()
    }

    /// The level that gates whether `module` produces output at all: the
    /// greater of its own level and the global default, each defaulting to 0.
    pub fn effective_level(&self, module: &str) -> u32 {
        let own = self.levels.get(module).copied().unwrap_or(0);
        let global = self.levels.get(ALL).copied().unwrap_or(0);
        own.max(global)
    }

    /// Drop `module` from the spec. Removing an absent module is a no-op.
    pub fn remove(&mut self, module: &str) {
        self.levels.remove(module);
    }

    /// Serialize back to the raw string form: the global default first as a
    /// bare integer, then `module:level` pairs in sorted order.
    pub fn render(&self) -> String {
        let mut tokens = Vec::with_capacity(self.levels.len());
        if let Some(global) = self.levels.get(ALL) {
            tokens.push(global.to_string());
        }
        for (module, level) in &self.levels {
            if module != ALL {
                tokens.push(format!("{module}:{level}"));
            }
        }
        tokens.join(",")
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
