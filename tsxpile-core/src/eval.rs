//! Code evaluation boundary
//!
//! The single seam where compiler-emitted text becomes an invocable
//! module body. Hosts embedding a real script engine implement
//! [`Evaluate`] themselves; [`BasicEvaluator`] covers the lowered
//! CommonJS subset the reference compiler adapter emits, which is enough
//! to run literal-exporting modules, require graphs, and external UMD
//! stubs without any dynamic execution elsewhere in the codebase.

use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{EvalError, LinkError};
use crate::module::{BodyFn, ExportValue, Exports, ModuleScope};

/// Converts emitted code into a deferred module body.
pub trait Evaluate: Send + Sync {
    /// Build the module body for `code` emitted at `path`.
    ///
    /// Construction failures are per-file and non-fatal to the cycle.
    fn module_body(&self, path: &str, code: &str) -> Result<BodyFn, EvalError>;
}

static REQUIRE_BIND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*require\(\s*(?:'([^']+)'|"([^"]+)")\s*\)(?:\.([A-Za-z_$][\w$]*))?\s*;?$"#,
    )
    .unwrap_or_else(|_| unreachable!("static pattern"))
});

static REQUIRE_BARE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^require\(\s*(?:'([^']+)'|"([^"]+)")\s*\)\s*;?$"#)
        .unwrap_or_else(|_| unreachable!("static pattern"))
});

static EXPORT_NAMED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^exports\.([A-Za-z_$][\w$]*)\s*=\s*(.+?)\s*;?$")
        .unwrap_or_else(|_| unreachable!("static pattern"))
});

static MODULE_EXPORTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^module\.exports\s*=\s*(.+?)\s*;?$").unwrap_or_else(|_| unreachable!("static pattern"))
});

static IDENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_$][\w$]*)$").unwrap_or_else(|_| unreachable!("static pattern"))
});

static MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z_$][\w$]*)\.([A-Za-z_$][\w$]*)$")
        .unwrap_or_else(|_| unreachable!("static pattern"))
});

#[derive(Debug, Clone)]
enum Expr {
    Literal(Value),
    Ident(String),
    Member(String, String),
}

#[derive(Debug, Clone)]
enum Instr {
    Require {
        binding: Option<String>,
        spec: String,
        member: Option<String>,
    },
    ExportNamed {
        name: String,
        expr: Expr,
    },
    ExportAll(Expr),
}

/// Local binding inside one module body.
#[derive(Clone)]
enum Binding {
    Module(Exports),
    Value(ExportValue),
}

/// Reference evaluator for the lowered CommonJS subset.
///
/// Supported statements, one per line:
/// - `const X = require("spec");` (also `let`/`var`, optional `.member`)
/// - `require("spec");`
/// - `exports.NAME = <expr>;`
/// - `module.exports = <expr>;`
///
/// where `<expr>` is a single-line JSON literal, a single-quoted string,
/// an identifier, or `ident.member`. `module.exports = {…}` replaces the
/// exports map with the object's fields and also binds the whole value as
/// `default` for default-import interop.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicEvaluator;

impl BasicEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn parse(path: &str, code: &str) -> Result<Vec<Instr>, EvalError> {
        let mut instrs = Vec::new();
        for (index, raw) in code.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty()
                || line.starts_with("//")
                || line == "\"use strict\";"
                || line == "'use strict';"
            {
                continue;
            }

            if let Some(caps) = REQUIRE_BIND.captures(line) {
                instrs.push(Instr::Require {
                    binding: Some(caps[1].to_string()),
                    spec: caps
                        .get(2)
                        .or_else(|| caps.get(3))
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default(),
                    member: caps.get(4).map(|m| m.as_str().to_string()),
                });
            } else if let Some(caps) = REQUIRE_BARE.captures(line) {
                instrs.push(Instr::Require {
                    binding: None,
                    spec: caps
                        .get(1)
                        .or_else(|| caps.get(2))
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default(),
                    member: None,
                });
            } else if let Some(caps) = EXPORT_NAMED.captures(line) {
                instrs.push(Instr::ExportNamed {
                    name: caps[1].to_string(),
                    expr: parse_expr(path, index + 1, &caps[2])?,
                });
            } else if let Some(caps) = MODULE_EXPORTS.captures(line) {
                instrs.push(Instr::ExportAll(parse_expr(path, index + 1, &caps[1])?));
            } else {
                return Err(EvalError::UnsupportedSyntax {
                    path: path.to_string(),
                    line: index + 1,
                    snippet: snippet(line),
                });
            }
        }
        Ok(instrs)
    }
}

impl Evaluate for BasicEvaluator {
    fn module_body(&self, path: &str, code: &str) -> Result<BodyFn, EvalError> {
        let instrs = Self::parse(path, code)?;
        let path = path.to_string();
        Ok(Arc::new(move |scope: &ModuleScope<'_>| {
            let mut env: BTreeMap<String, Binding> = BTreeMap::new();
            for instr in &instrs {
                match instr {
                    Instr::Require {
                        binding,
                        spec,
                        member,
                    } => {
                        let module = scope.require(spec)?;
                        if let Some(name) = binding {
                            let bound = match member {
                                Some(member) => {
                                    Binding::Value(module.get(member).unwrap_or(ExportValue::Null))
                                }
                                None => Binding::Module(module),
                            };
                            env.insert(name.clone(), bound);
                        }
                    }
                    Instr::ExportNamed { name, expr } => {
                        let value = eval_expr(&path, &env, expr)?;
                        scope.exports.set(name.clone(), value.clone());
                        env.insert(name.clone(), Binding::Value(value));
                    }
                    Instr::ExportAll(expr) => {
                        let value = eval_expr(&path, &env, expr)?;
                        if let ExportValue::Json(Value::Object(fields)) = &value {
                            let map: BTreeMap<String, ExportValue> = fields
                                .iter()
                                .map(|(k, v)| (k.clone(), ExportValue::Json(v.clone())))
                                .collect();
                            scope.exports.replace(map);
                        }
                        scope.exports.set("default", value);
                    }
                }
            }
            Ok(())
        }))
    }
}

fn eval_expr(path: &str, env: &BTreeMap<String, Binding>, expr: &Expr) -> Result<ExportValue, LinkError> {
    match expr {
        Expr::Literal(value) => Ok(ExportValue::Json(value.clone())),
        Expr::Ident(name) => match env.get(name) {
            Some(Binding::Value(value)) => Ok(value.clone()),
            Some(Binding::Module(module)) => Ok(ExportValue::Opaque(Arc::new(module.clone()))),
            None => Err(undefined(path, name)),
        },
        Expr::Member(object, member) => match env.get(object) {
            Some(Binding::Module(module)) => Ok(module.get(member).unwrap_or(ExportValue::Null)),
            Some(Binding::Value(ExportValue::Json(Value::Object(fields)))) => Ok(fields
                .get(member)
                .map(|v| ExportValue::Json(v.clone()))
                .unwrap_or(ExportValue::Null)),
            Some(Binding::Value(_)) => Err(LinkError::Runtime {
                path: path.to_string(),
                message: format!("'{object}.{member}': '{object}' is not an object"),
            }),
            None => Err(undefined(path, object)),
        },
    }
}

fn undefined(path: &str, name: &str) -> LinkError {
    LinkError::Runtime {
        path: path.to_string(),
        message: format!("'{name}' is not defined"),
    }
}

fn parse_expr(path: &str, line: usize, text: &str) -> Result<Expr, EvalError> {
    if let Some(caps) = MEMBER.captures(text) {
        return Ok(Expr::Member(caps[1].to_string(), caps[2].to_string()));
    }
    if let Some(caps) = IDENT.captures(text) {
        // JSON keywords are literals, not identifiers.
        if !matches!(&caps[1], "true" | "false" | "null") {
            return Ok(Expr::Ident(caps[1].to_string()));
        }
    }
    // Single-quoted strings are common in emitted source; JSON covers the
    // rest of the literal grammar.
    if text.len() >= 2 && text.starts_with('\'') && text.ends_with('\'') && !text[1..text.len() - 1].contains('\'')
    {
        return Ok(Expr::Literal(Value::String(text[1..text.len() - 1].to_string())));
    }
    serde_json::from_str(text)
        .map(Expr::Literal)
        .map_err(|_| EvalError::UnsupportedSyntax {
            path: path.to_string(),
            line,
            snippet: snippet(text),
        })
}

fn snippet(text: &str) -> String {
    const MAX: usize = 60;
    if text.len() <= MAX {
        text.to_string()
    } else {
        let cut = text
            .char_indices()
            .take_while(|(i, _)| *i < MAX)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}…", &text[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_body(
        code: &str,
        require: impl Fn(&str) -> Result<Exports, LinkError>,
    ) -> Result<Exports, LinkError> {
        let body = BasicEvaluator::new().module_body("/index.js", code).unwrap();
        let exports = Exports::new();
        let require_ref: &dyn Fn(&str) -> Result<Exports, LinkError> = &require;
        let scope = ModuleScope::new("/index.js", exports.clone(), require_ref);
        body(&scope)?;
        Ok(exports)
    }

    fn no_require(spec: &str) -> Result<Exports, LinkError> {
        Err(LinkError::ModuleNotFound {
            path: spec.to_string(),
            requested_from: "/index.js".to_string(),
            tried: vec![spec.to_string()],
        })
    }

    #[test]
    fn test_export_literal() {
        let exports = run_body("exports.default = 42;", no_require).unwrap();
        assert_eq!(exports.default_export(), Some(ExportValue::json(42)));
    }

    #[test]
    fn test_export_string_literals() {
        let exports = run_body("exports.a = \"dq\";\nexports.b = 'sq';", no_require).unwrap();
        assert_eq!(exports.get("a"), Some(ExportValue::json("dq")));
        assert_eq!(exports.get("b"), Some(ExportValue::json("sq")));
    }

    #[test]
    fn test_use_strict_and_comments_skipped() {
        let code = "\"use strict\";\n// comment\n\nexports.default = true;";
        let exports = run_body(code, no_require).unwrap();
        assert_eq!(exports.default_export(), Some(ExportValue::json(true)));
    }

    #[test]
    fn test_require_binding_and_member_export() {
        let dep = Exports::with_values([("value", ExportValue::json(7))]);
        let code = "const util = require(\"./util.js\");\nexports.default = util.value;";
        let exports = run_body(code, move |spec| {
            assert_eq!(spec, "./util.js");
            Ok(dep.clone())
        })
        .unwrap();
        assert_eq!(exports.default_export(), Some(ExportValue::json(7)));
    }

    #[test]
    fn test_require_member_pick() {
        let dep = Exports::with_values([("named", ExportValue::json("n"))]);
        let code = "const named = require(\"./dep.js\").named;\nexports.default = named;";
        let exports = run_body(code, move |_spec| Ok(dep.clone())).unwrap();
        assert_eq!(exports.default_export(), Some(ExportValue::json("n")));
    }

    #[test]
    fn test_bare_require_side_effect_only() {
        let called = std::cell::Cell::new(false);
        let exports = run_body("require('./s.css');\nexports.default = 1;", |_spec| {
            called.set(true);
            Ok(Exports::new())
        })
        .unwrap();
        assert!(called.get());
        assert_eq!(exports.default_export(), Some(ExportValue::json(1)));
    }

    #[test]
    fn test_module_exports_object_spreads_fields() {
        let exports = run_body("module.exports = {\"x\": 1, \"y\": 2};", no_require).unwrap();
        assert_eq!(exports.get("x"), Some(ExportValue::json(1)));
        assert_eq!(exports.get("y"), Some(ExportValue::json(2)));
        assert!(exports.default_export().is_some());
    }

    #[test]
    fn test_unsupported_syntax_is_construction_error() {
        let err = BasicEvaluator::new()
            .module_body("/index.js", "for (;;) {}")
            .map(|_| ())
            .unwrap_err();
        match err {
            EvalError::UnsupportedSyntax { path, line, .. } => {
                assert_eq!(path, "/index.js");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_undefined_identifier_is_runtime_error() {
        let err = run_body("exports.default = missing;", no_require).unwrap_err();
        assert!(matches!(err, LinkError::Runtime { .. }));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_require_failure_propagates() {
        let err = run_body("const x = require(\"./gone.js\");", no_require).unwrap_err();
        assert!(matches!(err, LinkError::ModuleNotFound { .. }));
    }
}
