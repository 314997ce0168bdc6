//! Compiler adapter boundary
//!
//! The type-checking/transpilation engine is an external collaborator:
//! given the prepared virtual file map it returns emitted code per file
//! plus diagnostics, and the orchestrator needs nothing else from it.
//! [`PassthroughCompiler`] is the reference adapter used by the CLI and
//! the test suites; a host wrapping a real TypeScript service implements
//! [`Compile`] the same way.

use once_cell::sync::Lazy;
use regex::Regex;

use tsxpile_vfs::VirtualFileMap;

use crate::prepare::SourceKind;

/// A diagnostic reported by the compiler for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// File the diagnostic points at.
    pub path: String,
    /// Numeric diagnostic code.
    pub code: u32,
    /// Human-readable message.
    pub message: String,
}

/// Emitted code for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOutput {
    /// Emitted (output) path.
    pub path: String,
    /// Emitted code.
    pub code: String,
    /// Diagnostics collected while compiling this file.
    pub diagnostics: Vec<Diagnostic>,
}

/// The compiler adapter collaborator.
pub trait Compile: Send + Sync {
    /// Emit code for every file in the map, in map traversal order.
    ///
    /// Files that produce no output (declaration stubs, unknown
    /// extensions) are simply absent from the result.
    fn emit(&self, files: &VirtualFileMap) -> Vec<EmitOutput>;
}

static IMPORT_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^import\s+(?:\*\s+as\s+)?([A-Za-z_$][\w$]*)\s+from\s+(?:'([^']+)'|"([^"]+)")\s*;?$"#,
    )
    .unwrap_or_else(|_| unreachable!("static pattern"))
});

static IMPORT_NAMED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^import\s*\{([^}]*)\}\s*from\s+(?:'([^']+)'|"([^"]+)")\s*;?$"#)
        .unwrap_or_else(|_| unreachable!("static pattern"))
});

static IMPORT_BARE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^import\s+(?:'([^']+)'|"([^"]+)")\s*;?$"#)
        .unwrap_or_else(|_| unreachable!("static pattern"))
});

static EXPORT_DEFAULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^export\s+default\s+(.+?)\s*;?$").unwrap_or_else(|_| unreachable!("static pattern"))
});

static EXPORT_BINDING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^export\s+(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(.+?)\s*;?$")
        .unwrap_or_else(|_| unreachable!("static pattern"))
});

static EXPORT_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^export\s*\{([^}]*)\}\s*;?$").unwrap_or_else(|_| unreachable!("static pattern"))
});

/// Reference adapter: no type checking, line-oriented ESM-to-CommonJS
/// lowering, script extensions renamed to `.js` on output.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughCompiler;

impl PassthroughCompiler {
    pub fn new() -> Self {
        Self
    }

    fn lower_line(line: &str) -> Option<String> {
        let trimmed = line.trim();
        if let Some(caps) = IMPORT_DEFAULT.captures(trimmed) {
            let spec = spec_of(&caps, 2, 3);
            return Some(format!("const {} = require(\"{}\");", &caps[1], spec));
        }
        if let Some(caps) = IMPORT_NAMED.captures(trimmed) {
            let spec = spec_of(&caps, 2, 3);
            let mut lowered = Vec::new();
            for binding in caps[1].split(',') {
                let binding = binding.trim();
                if binding.is_empty() {
                    continue;
                }
                let (source, local) = match binding.split_once(" as ") {
                    Some((source, local)) => (source.trim(), local.trim()),
                    None => (binding, binding),
                };
                lowered.push(format!("const {local} = require(\"{spec}\").{source};"));
            }
            return Some(lowered.join("\n"));
        }
        if let Some(caps) = IMPORT_BARE.captures(trimmed) {
            let spec = spec_of(&caps, 1, 2);
            return Some(format!("require(\"{spec}\");"));
        }
        if let Some(caps) = EXPORT_DEFAULT.captures(trimmed) {
            return Some(format!("exports.default = {};", &caps[1]));
        }
        if let Some(caps) = EXPORT_BINDING.captures(trimmed) {
            return Some(format!("exports.{} = {};", &caps[1], &caps[2]));
        }
        if let Some(caps) = EXPORT_LIST.captures(trimmed) {
            let mut lowered = Vec::new();
            for name in caps[1].split(',') {
                let name = name.trim();
                if name.is_empty() {
                    continue;
                }
                let (local, exported) = match name.split_once(" as ") {
                    Some((local, exported)) => (local.trim(), exported.trim()),
                    None => (name, name),
                };
                lowered.push(format!("exports.{exported} = {local};"));
            }
            return Some(lowered.join("\n"));
        }
        None
    }

    fn lower(code: &str) -> String {
        code.lines()
            .map(|line| Self::lower_line(line).unwrap_or_else(|| line.to_string()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Map a source path to its emitted path (`outDir` is the virtual
    /// root, so only the extension changes).
    fn output_path(path: &str) -> String {
        for extension in [".tsx", ".ts", ".jsx", ".mts", ".mjs"] {
            if let Some(stem) = path.strip_suffix(extension) {
                return format!("{stem}.js");
            }
        }
        path.to_string()
    }
}

impl Compile for PassthroughCompiler {
    fn emit(&self, files: &VirtualFileMap) -> Vec<EmitOutput> {
        let mut outputs = Vec::new();
        for (path, content) in files.iter() {
            if path.ends_with(".d.ts") {
                continue;
            }
            if SourceKind::of(path) != SourceKind::Script {
                continue;
            }
            tracing::debug!(target: "tsxpile::compile", path, "emitting");
            outputs.push(EmitOutput {
                path: Self::output_path(path),
                code: Self::lower(content),
                diagnostics: Vec::new(),
            });
        }
        outputs
    }
}

fn spec_of(caps: &regex::Captures<'_>, single: usize, double: usize) -> String {
    caps.get(single)
        .or_else(|| caps.get(double))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
