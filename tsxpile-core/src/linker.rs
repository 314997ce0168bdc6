//! Module linker
//!
//! Turns deferred module bodies into lazily realized modules. Resolution
//! follows require semantics over the virtual path space: exact match,
//! then each configured extension, then the directory-index convention.
//! A module is realized at most once per cycle; its exports object is
//! cached *before* the body runs, so require cycles terminate with the
//! partially populated object.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tsxpile_config::ResolveConfig;
use tsxpile_vfs::normalize_path;

use crate::error::LinkError;
use crate::module::{BodyFn, Exports, ModuleScope};

/// Caller-supplied resolver consulted before any path math.
pub type RequireOverride = dyn Fn(&str, &str) -> Result<Exports, LinkError> + Send + Sync;

enum Slot {
    /// Body known, not yet invoked.
    Deferred(BodyFn),
    /// Invoked once; exports cached for the rest of the cycle.
    Realized(Exports),
}

/// Per-cycle module registry and resolver.
pub struct Linker {
    modules: Mutex<HashMap<String, Slot>>,
    resolve: ResolveConfig,
    require_override: Option<Arc<RequireOverride>>,
}

impl Linker {
    /// Create an empty linker for one compile cycle.
    pub fn new(resolve: ResolveConfig) -> Self {
        Self {
            modules: Mutex::new(HashMap::new()),
            resolve,
            require_override: None,
        }
    }

    /// Defer entirely to a caller-supplied resolver.
    pub fn with_require_override(mut self, require: Arc<RequireOverride>) -> Self {
        self.require_override = Some(require);
        self
    }

    /// Register a deferred module body under its emitted path.
    pub fn define(&self, path: impl Into<String>, body: BodyFn) {
        self.lock().insert(path.into(), Slot::Deferred(body));
    }

    /// Register an already-realized module (host runtime bindings,
    /// host-global externals).
    pub fn seed(&self, name: impl Into<String>, exports: Exports) {
        self.lock().insert(name.into(), Slot::Realized(exports));
    }

    /// Check whether a module (deferred or realized) exists under `path`.
    pub fn has_module(&self, path: &str) -> bool {
        self.lock().contains_key(path)
    }

    /// Resolve and realize the module `spec` requested from `current`.
    pub fn require(&self, spec: &str, current: &str) -> Result<Exports, LinkError> {
        if let Some(require) = &self.require_override {
            return require(spec, current);
        }

        let normalized = normalize_path(spec, current);
        let resolved = self.resolve_candidate(&normalized).ok_or_else(|| {
            LinkError::ModuleNotFound {
                path: normalized.clone(),
                requested_from: current.to_string(),
                tried: self.candidates(&normalized),
            }
        })?;
        self.realize(&resolved)
    }

    /// Realize the entry module directly by its emitted path.
    ///
    /// Bypasses the caller override: the override services requires made
    /// *by* module code, not the orchestrator's entry invocation.
    pub fn realize_entry(&self, path: &str) -> Result<Exports, LinkError> {
        self.realize(path)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.modules.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// First candidate present in the registry: exact, `path + ext`,
    /// then `path + "/index" + ext`, extensions in configured order.
    fn resolve_candidate(&self, normalized: &str) -> Option<String> {
        let modules = self.lock();
        self.candidates(normalized)
            .into_iter()
            .find(|candidate| modules.contains_key(candidate))
    }

    fn candidates(&self, normalized: &str) -> Vec<String> {
        let mut candidates = vec![normalized.to_string()];
        for extension in &self.resolve.extensions {
            candidates.push(format!("{normalized}{extension}"));
        }
        for extension in &self.resolve.extensions {
            candidates.push(format!("{normalized}/index{extension}"));
        }
        candidates
    }

    fn realize(&self, path: &str) -> Result<Exports, LinkError> {
        let (body, exports) = {
            let mut modules = self.lock();
            match modules.get(path) {
                Some(Slot::Realized(exports)) => return Ok(exports.clone()),
                Some(Slot::Deferred(body)) => {
                    let body = body.clone();
                    let exports = Exports::new();
                    // Cache before running the body: a cyclic require of
                    // this module sees the partial exports object.
                    modules.insert(path.to_string(), Slot::Realized(exports.clone()));
                    (body, exports)
                }
                None => {
                    return Err(LinkError::ModuleNotFound {
                        path: path.to_string(),
                        requested_from: path.to_string(),
                        tried: vec![path.to_string()],
                    })
                }
            }
        };

        tracing::debug!(target: "tsxpile::link", path, "realizing module");
        let require = |spec: &str| self.require(spec, path);
        let scope = ModuleScope::new(path, exports.clone(), &require);
        match body(&scope) {
            Ok(()) => Ok(exports),
            Err(err) => {
                // Evict the half-realized slot so the failure is not
                // masked by an empty cached module.
                self.lock().remove(path);
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for Linker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Linker")
            .field("modules", &self.lock().len())
            .field("resolve", &self.resolve)
            .field("has_override", &self.require_override.is_some())
            .finish()
    }
}
