//! CLI configuration
//!
//! Project manifest (`tsxpile.json`) plus the log configuration the
//! manifest and flags combine into.

use std::path::{Path, PathBuf};

use tracing::Level;
use tsxpile_config::ResolveOverrides;

/// `tsxpile.json` structure.
#[derive(Debug, serde::Deserialize)]
pub struct Manifest {
    /// Directory of sources loaded into the virtual tree, relative to
    /// the manifest.
    pub root: String,
    /// Entry module path inside the virtual tree.
    pub entry: Option<String>,
    /// Display name handed to the host when rendering.
    pub display_name: Option<String>,
    /// Resolution overrides (extensions, externals, cdn_prefix).
    pub resolve: Option<ResolveOverrides>,
    /// Stop after compilation, skip linking and rendering.
    pub emit_only: Option<bool>,
}

impl Manifest {
    /// Read and parse the manifest at `path`.
    pub fn read(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Err(format!(
                "'{}' not found\n\nThis directory is not a tsxpile project.\nHint: create '{}' with a 'root' field",
                path.display(),
                path.display()
            ));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;

        let manifest: Manifest = serde_json::from_str(&content)
            .map_err(|e| format!("cannot parse '{}': {}", path.display(), e))?;

        if manifest.root.is_empty() {
            return Err(format!("'root' in '{}' must not be empty", path.display()));
        }

        Ok(manifest)
    }

    /// Source root resolved relative to the manifest's directory.
    pub fn root_dir(&self, manifest_path: &Path) -> PathBuf {
        let base = manifest_path.parent().unwrap_or(Path::new("."));
        base.join(&self.root)
    }
}

/// Per-phase log configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub global: Level,
    pub prepare: Option<Level>,
    pub compile: Option<Level>,
    pub link: Option<Level>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            global: Level::INFO,
            prepare: None,
            compile: None,
            link: None,
        }
    }
}

impl LogConfig {
    /// Build from the `-v` count: 0 warn, 1 info, 2+ debug.
    pub fn from_verbosity(verbose: u8) -> Self {
        let global = match verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        };
        Self {
            global,
            ..Self::default()
        }
    }

    /// Log level for a specific phase target.
    pub fn level_for(&self, target: &str) -> Level {
        match target {
            "tsxpile::prepare" => self.prepare.unwrap_or(self.global),
            "tsxpile::compile" => self.compile.unwrap_or(self.global),
            "tsxpile::link" => self.link.unwrap_or(self.global),
            _ => self.global,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_mapping() {
        assert_eq!(LogConfig::from_verbosity(0).global, Level::WARN);
        assert_eq!(LogConfig::from_verbosity(1).global, Level::INFO);
        assert_eq!(LogConfig::from_verbosity(2).global, Level::DEBUG);
        assert_eq!(LogConfig::from_verbosity(9).global, Level::DEBUG);
    }

    #[test]
    fn test_phase_override_wins() {
        let config = LogConfig {
            global: Level::WARN,
            link: Some(Level::TRACE),
            ..LogConfig::default()
        };
        assert_eq!(config.level_for("tsxpile::link"), Level::TRACE);
        assert_eq!(config.level_for("tsxpile::compile"), Level::WARN);
    }

    #[test]
    fn test_manifest_parses() {
        let manifest: Manifest = serde_json::from_str(
            r#"{
                "root": "src",
                "entry": "/main.tsx",
                "display_name": "Demo",
                "resolve": { "extensions": [".js", ".jsx"] }
            }"#,
        )
        .unwrap();
        assert_eq!(manifest.root, "src");
        assert_eq!(manifest.entry.as_deref(), Some("/main.tsx"));
        assert_eq!(
            manifest.resolve.unwrap().extensions,
            Some(vec![".js".to_string(), ".jsx".to_string()])
        );
    }
}
