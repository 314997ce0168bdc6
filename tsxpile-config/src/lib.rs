//! tsxpile Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic beyond default
//! merging. It serves as the shared configuration vocabulary across all
//! tsxpile crates.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Default entry module path for a compile cycle.
pub const DEFAULT_ENTRY_FILE: &str = "/index.js";

/// Default display name attached to the rendered root.
pub const DEFAULT_DISPLAY_NAME: &str = "Preview";

/// Module resolution configuration for one compile cycle.
///
/// `extensions` are tried in order when a require target has no exact
/// match; `externals` maps a module name to either a URL or a
/// version-or-global descriptor; `cdn_prefix` is where versioned
/// externals are fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveConfig {
    /// Extensions appended to unresolved require paths, in order.
    pub extensions: Vec<String>,
    /// External module name -> URL, host-global name, or version string.
    pub externals: BTreeMap<String, String>,
    /// CDN base used for version-string externals.
    pub cdn_prefix: String,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".js".to_string()],
            externals: BTreeMap::new(),
            cdn_prefix: "https://unpkg.com".to_string(),
        }
    }
}

/// Caller-supplied partial resolve configuration.
///
/// Unset fields fall back to [`ResolveConfig::default`]; set fields win.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveOverrides {
    /// Override for [`ResolveConfig::extensions`].
    pub extensions: Option<Vec<String>>,
    /// Override for [`ResolveConfig::externals`].
    pub externals: Option<BTreeMap<String, String>>,
    /// Override for [`ResolveConfig::cdn_prefix`].
    pub cdn_prefix: Option<String>,
}

impl ResolveOverrides {
    /// Merge these overrides on top of the defaults.
    pub fn merge(self) -> ResolveConfig {
        let defaults = ResolveConfig::default();
        ResolveConfig {
            extensions: self.extensions.unwrap_or(defaults.extensions),
            externals: self.externals.unwrap_or(defaults.externals),
            cdn_prefix: self.cdn_prefix.unwrap_or(defaults.cdn_prefix),
        }
    }
}

/// Phase enum for phase-specific logging targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Prepare,
    Compile,
    Link,
}

impl Phase {
    /// Get the string name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Prepare => "prepare",
            Phase::Compile => "compile",
            Phase::Link => "link",
        }
    }

    /// Get the log target name for this phase
    pub fn target(&self) -> String {
        format!("tsxpile::{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resolve_config() {
        let cfg = ResolveConfig::default();
        assert_eq!(cfg.extensions, vec![".js"]);
        assert!(cfg.externals.is_empty());
        assert_eq!(cfg.cdn_prefix, "https://unpkg.com");
    }

    #[test]
    fn test_merge_empty_overrides_yields_defaults() {
        let merged = ResolveOverrides::default().merge();
        assert_eq!(merged, ResolveConfig::default());
    }

    #[test]
    fn test_merge_caller_wins() {
        let mut externals = BTreeMap::new();
        externals.insert("lodash".to_string(), "4.17.21".to_string());
        let merged = ResolveOverrides {
            extensions: Some(vec![".js".to_string(), ".cjs".to_string()]),
            externals: Some(externals),
            cdn_prefix: None,
        }
        .merge();

        assert_eq!(merged.extensions, vec![".js", ".cjs"]);
        assert_eq!(merged.externals.get("lodash").map(String::as_str), Some("4.17.21"));
        // Unset field falls back to the default.
        assert_eq!(merged.cdn_prefix, "https://unpkg.com");
    }

    #[test]
    fn test_phase_target() {
        assert_eq!(Phase::Prepare.target(), "tsxpile::prepare");
        assert_eq!(Phase::Link.as_str(), "link");
    }
}
