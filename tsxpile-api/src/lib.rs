//! tsxpile API
//!
//! Single entry point for running one compile cycle: virtual sources in,
//! prepared through the rule engine, handed to the compiler adapter,
//! linked into a synthetic module registry and executed, with the
//! entry's default export rendered by the host. Faults anywhere along
//! the way are collected into the result, never panicked or thrown past
//! the caller.
//!
//! ```
//! use tsxpile_api::{compile, CompileConfig};
//!
//! let result = compile(
//!     [("/index.tsx", "export default 42;")],
//!     &CompileConfig::default(),
//! );
//! assert!(result.errors.is_empty());
//! assert_eq!(result.compiled.len(), 1);
//! result.cleanup.run();
//! ```

mod config;
mod error;
mod types;

pub use config::CompileConfig;
pub use error::CompileError;
pub use types::{Cleanup, CompileResult, EmittedFile};

use std::collections::HashSet;

use tsxpile_core::{load_externals, Linker, ModuleSeed, Prepared};
use tsxpile_vfs::normalize_path;

/// Diagnostic codes suppressed by default: unresolvable module
/// specifiers (2307) and implicit-any on untyped requires (7026), both
/// expected artifacts of compiling against a virtual tree with no real
/// type roots.
pub const IGNORED_DIAGNOSTIC_CODES: &[u32] = &[2307, 7026];

/// Run one compile cycle over `sources`.
///
/// Accepts any iterable of `(name, content)` pairs; names are rooted and
/// normalized to absolute virtual paths. The returned [`CompileResult`]
/// is always complete: compiled listing, collected errors and cleanup
/// are populated whether or not the cycle reached rendering.
pub fn compile<I, K, V>(sources: I, config: &CompileConfig) -> CompileResult
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut errors: Vec<CompileError> = Vec::new();

    tracing::info!(target: "tsxpile::prepare", entry = %config.entry_file, "starting compile cycle");
    let prepared = tsxpile_core::prepare(sources, &config.rules, &config.host);
    errors.extend(prepared.errors.iter().cloned().map(CompileError::from));
    let cleanup = Cleanup::new(config.host.clone(), prepared.cleanup_paths.clone());

    tracing::info!(
        target: "tsxpile::compile",
        files = prepared.files.len(),
        seeds = prepared.seeds.len(),
        "compiling virtual tree"
    );
    let emits = config.compiler.emit(&prepared.files);
    let mut compiled = Vec::new();
    for emit in &emits {
        for diag in &emit.diagnostics {
            if IGNORED_DIAGNOSTIC_CODES.contains(&diag.code) {
                tracing::debug!(
                    target: "tsxpile::compile",
                    path = %diag.path,
                    code = diag.code,
                    "suppressing diagnostic"
                );
                continue;
            }
            errors.push(CompileError::Diagnostic {
                path: diag.path.clone(),
                code: diag.code,
                message: diag.message.clone(),
            });
        }
        compiled.push(EmittedFile {
            path: emit.path.clone(),
            code: emit.code.clone(),
        });
    }

    if compiled.is_empty() {
        errors.push(CompileError::NoCodeEmitted);
        return CompileResult {
            rendered: None,
            default_export: None,
            compiled,
            errors,
            cleanup,
        };
    }

    tracing::info!(target: "tsxpile::link", modules = compiled.len(), "linking modules");
    let resolve = config.resolve.clone().merge();
    let mut linker = Linker::new(resolve.clone());
    if let Some(require) = &config.require_override {
        linker = linker.with_require_override(require.clone());
    }
    define_modules(&linker, config, &prepared, &compiled, &mut errors);

    let entry = entry_path(&config.entry_file);
    if !linker.has_module(&entry) {
        errors.push(CompileError::EntryNotEmitted { entry });
        return CompileResult {
            rendered: None,
            default_export: None,
            compiled,
            errors,
            cleanup,
        };
    }

    for (name, exports) in config.host.runtime_modules() {
        linker.seed(name, exports);
    }
    errors.extend(
        load_externals(
            &resolve,
            config.fetch.as_ref(),
            config.host.as_ref(),
            config.evaluator.as_ref(),
            &linker,
        )
        .into_iter()
        .map(CompileError::from),
    );

    let exports = match linker.realize_entry(&entry) {
        Ok(exports) => exports,
        Err(err) => {
            errors.push(err.into());
            return CompileResult {
                rendered: None,
                default_export: None,
                compiled,
                errors,
                cleanup,
            };
        }
    };

    let default_export = exports.default_export();
    let rendered = match &default_export {
        Some(value) => match config.host.render(value, &config.display_name) {
            Ok(rendered) => Some(rendered),
            Err(err) => {
                errors.push(err.into());
                None
            }
        },
        None => {
            errors.push(CompileError::Link(tsxpile_core::LinkError::Runtime {
                path: entry,
                message: "entry module has no default export".to_string(),
            }));
            None
        }
    };

    tracing::info!(
        target: "tsxpile::link",
        rendered = rendered.is_some(),
        errors = errors.len(),
        "compile cycle finished"
    );
    CompileResult {
        rendered,
        default_export,
        compiled,
        errors,
        cleanup,
    }
}

/// Populate the registry: native seeds first, then a deferred body for
/// every other emitted file. Seeds win over evaluation for the same
/// path, so synthetic modules never depend on the evaluator.
fn define_modules(
    linker: &Linker,
    config: &CompileConfig,
    prepared: &Prepared,
    compiled: &[EmittedFile],
    errors: &mut Vec<CompileError>,
) {
    let mut seeded: HashSet<&str> = HashSet::new();
    for ModuleSeed { path, body } in &prepared.seeds {
        linker.define(path.clone(), body.clone());
        seeded.insert(path.as_str());
    }
    for file in compiled {
        if seeded.contains(file.path.as_str()) {
            continue;
        }
        match config.evaluator.module_body(&file.path, &file.code) {
            Ok(body) => linker.define(file.path.clone(), body),
            Err(err) => errors.push(err.into()),
        }
    }
}

fn entry_path(entry_file: &str) -> String {
    let rooted = if entry_file.starts_with('/') {
        entry_file.to_string()
    } else {
        format!("/{entry_file}")
    };
    normalize_path(&rooted, tsxpile_config::DEFAULT_ENTRY_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_path_roots_bare_names() {
        assert_eq!(entry_path("index.js"), "/index.js");
        assert_eq!(entry_path("/app/main.js"), "/app/main.js");
    }

    #[test]
    fn test_ignored_codes() {
        assert!(IGNORED_DIAGNOSTIC_CODES.contains(&2307));
        assert!(IGNORED_DIAGNOSTIC_CODES.contains(&7026));
        assert!(!IGNORED_DIAGNOSTIC_CODES.contains(&2345));
    }
}
