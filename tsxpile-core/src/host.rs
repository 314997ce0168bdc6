//! Host environment boundary
//!
//! The pipeline never touches a real document or global scope directly;
//! everything presentation- or environment-shaped goes through this trait:
//! style injection (stylesheet modules), runtime globals (externals bound
//! to pre-existing host values), pre-seeded runtime modules (the UI
//! framework and its JSX runtime), and rendering of the entry module's
//! default export.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::HostError;
use crate::module::{ExportValue, Exports};

/// Host environment one compile cycle runs against.
pub trait Host: Send + Sync {
    /// Create or update the style element tagged with `path`.
    ///
    /// The tag is stable per path: re-injecting for the same path updates
    /// the existing element instead of duplicating it.
    fn inject_style(&self, path: &str, css: &str);

    /// Remove the style element tagged with `path`, if present.
    fn remove_style(&self, path: &str);

    /// Look up a live runtime global by name.
    fn global(&self, name: &str) -> Option<ExportValue>;

    /// Runtime bindings pre-seeded into the module registry as
    /// already-realized modules.
    fn runtime_modules(&self) -> Vec<(String, Exports)>;

    /// Turn the entry module's default export into the rendered output.
    fn render(&self, component: &ExportValue, display_name: &str)
        -> Result<ExportValue, HostError>;
}

/// In-memory host: records styles and globals, renders by invoking
/// function exports with no arguments and passing other values through.
#[derive(Default)]
pub struct MemoryHost {
    styles: RwLock<BTreeMap<String, String>>,
    globals: RwLock<BTreeMap<String, ExportValue>>,
    modules: RwLock<Vec<(String, Exports)>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a runtime global (externals bound by global name).
    pub fn set_global(&self, name: impl Into<String>, value: ExportValue) {
        self.globals
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), value);
    }

    /// Register a runtime module seeded into every cycle.
    pub fn set_runtime_module(&self, name: impl Into<String>, exports: Exports) {
        self.modules
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push((name.into(), exports));
    }

    /// Read back an injected style (test/inspection hook).
    pub fn style(&self, path: &str) -> Option<String> {
        self.styles
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
            .cloned()
    }

    /// Number of currently injected styles.
    pub fn style_count(&self) -> usize {
        self.styles.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Host for MemoryHost {
    fn inject_style(&self, path: &str, css: &str) {
        self.styles
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_string(), css.to_string());
    }

    fn remove_style(&self, path: &str) {
        self.styles
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(path);
    }

    fn global(&self, name: &str) -> Option<ExportValue> {
        self.globals
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    fn runtime_modules(&self) -> Vec<(String, Exports)> {
        self.modules
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn render(
        &self,
        component: &ExportValue,
        display_name: &str,
    ) -> Result<ExportValue, HostError> {
        tracing::debug!(target: "tsxpile::link", display_name, "rendering default export");
        match component {
            ExportValue::Function(_) => component
                .call(&[])
                .map_err(|e| HostError::RenderFailed(e.to_string())),
            other => Ok(other.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inject_updates_in_place() {
        let host = MemoryHost::new();
        host.inject_style("/s.css", "body{color:red}");
        host.inject_style("/s.css", "body{color:blue}");
        assert_eq!(host.style_count(), 1);
        assert_eq!(host.style("/s.css").as_deref(), Some("body{color:blue}"));
    }

    #[test]
    fn test_remove_style() {
        let host = MemoryHost::new();
        host.inject_style("/s.css", "x");
        host.remove_style("/s.css");
        assert_eq!(host.style("/s.css"), None);
        // Removing again is a no-op.
        host.remove_style("/s.css");
    }

    #[test]
    fn test_globals() {
        let host = MemoryHost::new();
        assert!(host.global("_").is_none());
        host.set_global("_", ExportValue::json("lodash"));
        assert_eq!(host.global("_"), Some(ExportValue::json("lodash")));
    }

    #[test]
    fn test_render_calls_functions() {
        let host = MemoryHost::new();
        let component = ExportValue::function(|_args| Ok(ExportValue::json("<div/>")));
        let rendered = host.render(&component, "Preview").unwrap();
        assert_eq!(rendered, ExportValue::json("<div/>"));
    }

    #[test]
    fn test_render_passes_values_through() {
        let host = MemoryHost::new();
        let rendered = host.render(&ExportValue::json(42), "Preview").unwrap();
        assert_eq!(rendered, ExportValue::json(42));
    }

    #[test]
    fn test_render_surfaces_function_failure() {
        let host = MemoryHost::new();
        let component = ExportValue::function(|_args| {
            Err(crate::error::LinkError::Runtime {
                path: "/index.js".to_string(),
                message: "boom".to_string(),
            })
        });
        let err = host.render(&component, "Preview").unwrap_err();
        assert!(matches!(err, HostError::RenderFailed(_)));
    }

    #[test]
    fn test_runtime_modules_roundtrip() {
        let host = MemoryHost::new();
        host.set_runtime_module("react", Exports::new());
        let modules = host.runtime_modules();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].0, "react");
    }
}
