//! Externals loader
//!
//! Binds declared external dependencies into the module registry before
//! the entry module runs: URL descriptors are fetched and evaluated as
//! self-contained bundles, live host globals are bound directly, and
//! anything else is treated as a version string fetched from the CDN
//! (which serves the package's browser-targeted bundle). Failures are
//! per-entry and never abort the batch.

use std::collections::BTreeMap;

use serde_json::Value;

use tsxpile_config::ResolveConfig;

use crate::error::{FetchError, LinkError};
use crate::eval::Evaluate;
use crate::host::Host;
use crate::linker::Linker;
use crate::module::{ExportValue, Exports};

/// The externals fetch boundary: `fetch(url) -> text`.
///
/// The body must be directly evaluable as a module, whatever the
/// transport.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Canned url -> body responses, for tests and offline hosts.
#[derive(Debug, Default, Clone)]
pub struct StaticFetch {
    responses: BTreeMap<String, String>,
}

impl StaticFetch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a response body for a URL.
    pub fn with_response(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses.insert(url.into(), body.into());
        self
    }
}

impl Fetch for StaticFetch {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Failed {
                url: url.to_string(),
                message: "not found".to_string(),
            })
    }
}

/// Transport-less host: every fetch fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFetch;

impl Fetch for NoFetch {
    fn fetch(&self, url: &str) -> Result<String, FetchError> {
        Err(FetchError::NoTransport {
            url: url.to_string(),
        })
    }
}

/// Load every declared external into the linker.
///
/// Must complete before the entry module executes; resolution is eager
/// at require-time, not at declaration time. Returns the per-entry
/// failures.
pub fn load_externals(
    resolve: &ResolveConfig,
    fetch: &dyn Fetch,
    host: &dyn Host,
    evaluator: &dyn Evaluate,
    linker: &Linker,
) -> Vec<LinkError> {
    let mut errors = Vec::new();
    for (name, descriptor) in &resolve.externals {
        let result = if descriptor.starts_with("http://") || descriptor.starts_with("https://") {
            load_bundle(name, descriptor, fetch, evaluator, linker)
        } else if let Some(value) = host.global(descriptor) {
            tracing::debug!(target: "tsxpile::link", name, global = descriptor, "binding external to host global");
            linker.seed(name.clone(), exports_from_value(value));
            Ok(())
        } else {
            let url = format!("{}/{}@{}", resolve.cdn_prefix, name, descriptor);
            load_bundle(name, &url, fetch, evaluator, linker)
        };
        if let Err(err) = result {
            errors.push(err);
        }
    }
    errors
}

fn load_bundle(
    name: &str,
    url: &str,
    fetch: &dyn Fetch,
    evaluator: &dyn Evaluate,
    linker: &Linker,
) -> Result<(), LinkError> {
    tracing::debug!(target: "tsxpile::link", name, url, "fetching external bundle");
    let code = fetch.fetch(url).map_err(|e| LinkError::External {
        name: name.to_string(),
        message: e.to_string(),
    })?;
    let body = evaluator
        .module_body(name, &code)
        .map_err(|e| LinkError::External {
            name: name.to_string(),
            message: e.to_string(),
        })?;
    linker.define(name.to_string(), body);
    Ok(())
}

/// Turn one bound value into a module exports object: object fields are
/// spread as named exports, and the whole value doubles as `default`.
fn exports_from_value(value: ExportValue) -> Exports {
    let exports = Exports::new();
    if let ExportValue::Json(Value::Object(fields)) = &value {
        for (name, field) in fields {
            exports.set(name.clone(), ExportValue::Json(field.clone()));
        }
    }
    exports.set("default", value);
    exports
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::BasicEvaluator;
    use crate::host::MemoryHost;

    fn externals(entries: &[(&str, &str)]) -> ResolveConfig {
        ResolveConfig {
            externals: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..ResolveConfig::default()
        }
    }

    #[test]
    fn test_url_external_is_fetched_and_linked() {
        let resolve = externals(&[("answers", "https://cdn.test/answers.js")]);
        let fetch = StaticFetch::new()
            .with_response("https://cdn.test/answers.js", "module.exports = {\"x\": 42};");
        let linker = Linker::new(resolve.clone());
        let errors = load_externals(&resolve, &fetch, &MemoryHost::new(), &BasicEvaluator::new(), &linker);
        assert!(errors.is_empty());

        let exports = linker.require("answers", "/index.js").unwrap();
        assert_eq!(exports.get("x"), Some(ExportValue::json(42)));
    }

    #[test]
    fn test_host_global_binding() {
        let resolve = externals(&[("lodash", "_")]);
        let host = MemoryHost::new();
        host.set_global("_", ExportValue::json(serde_json::json!({"chunk": "fn"})));
        let linker = Linker::new(resolve.clone());
        let errors = load_externals(&resolve, &NoFetch, &host, &BasicEvaluator::new(), &linker);
        assert!(errors.is_empty());

        let exports = linker.require("lodash", "/index.js").unwrap();
        assert_eq!(exports.get("chunk"), Some(ExportValue::json("fn")));
        assert!(exports.default_export().is_some());
    }

    #[test]
    fn test_version_descriptor_uses_cdn_prefix() {
        let mut resolve = externals(&[("dayjs", "1.11.0")]);
        resolve.cdn_prefix = "https://unpkg.test".to_string();
        let fetch = StaticFetch::new().with_response(
            "https://unpkg.test/dayjs@1.11.0",
            "module.exports = {\"version\": \"1.11.0\"};",
        );
        let linker = Linker::new(resolve.clone());
        let errors = load_externals(&resolve, &fetch, &MemoryHost::new(), &BasicEvaluator::new(), &linker);
        assert!(errors.is_empty());

        let exports = linker.require("dayjs", "/index.js").unwrap();
        assert_eq!(exports.get("version"), Some(ExportValue::json("1.11.0")));
    }

    #[test]
    fn test_failed_entry_does_not_abort_batch() {
        let resolve = externals(&[
            ("broken", "https://cdn.test/missing.js"),
            ("working", "https://cdn.test/working.js"),
        ]);
        let fetch = StaticFetch::new()
            .with_response("https://cdn.test/working.js", "module.exports = {\"ok\": true};");
        let linker = Linker::new(resolve.clone());
        let errors = load_externals(&resolve, &fetch, &MemoryHost::new(), &BasicEvaluator::new(), &linker);

        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("broken"));
        assert!(linker.require("working", "/index.js").is_ok());
    }

    #[test]
    fn test_no_transport_reports_url() {
        let err = NoFetch.fetch("https://x.test/y").unwrap_err();
        assert!(matches!(err, FetchError::NoTransport { .. }));
        assert!(err.to_string().contains("https://x.test/y"));
    }

    #[test]
    fn test_bundles_are_lazy_until_required() {
        // Defined externals stay deferred; only a require realizes them.
        let resolve = externals(&[("lib", "https://cdn.test/lib.js")]);
        let fetch = StaticFetch::new()
            .with_response("https://cdn.test/lib.js", "exports.loaded = true;");
        let linker = Linker::new(resolve.clone());
        load_externals(&resolve, &fetch, &MemoryHost::new(), &BasicEvaluator::new(), &linker);
        assert!(linker.has_module("lib"));
        let exports = linker.require("lib", "/index.js").unwrap();
        assert_eq!(exports.get("loaded"), Some(ExportValue::json(true)));
    }
}
