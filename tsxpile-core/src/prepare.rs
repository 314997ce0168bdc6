//! Source preparer
//!
//! Converts raw caller sources into a compiler-ready virtual file map.
//! Scripts pass through untouched (after rules); JSON and stylesheet
//! sources are rewritten into synthetic script modules plus ambient
//! declaration stubs so the type checker accepts the import. For each
//! synthetic module the preparer also produces a native module body
//! (seed) which the orchestrator links in preference to evaluating the
//! synthetic text, keeping dynamic evaluation at the [`crate::eval`]
//! boundary.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use tsxpile_vfs::{normalize_path, VirtualFileMap};

use crate::error::PrepareError;
use crate::host::Host;
use crate::module::{BodyFn, ExportValue, ModuleScope};
use crate::rules::{apply_rules, Rule};

static SCRIPT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.m?[jt]sx?$").unwrap_or_else(|_| unreachable!("static pattern")));
static JSON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.json$").unwrap_or_else(|_| unreachable!("static pattern")));
static STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(?:css|less|sass|scss|stylus)$")
        .unwrap_or_else(|_| unreachable!("static pattern"))
});

/// Declaration stub accompanying every non-script source, see
/// <https://www.typescriptlang.org/tsconfig#allowArbitraryExtensions>.
const DECLARATION_STUB: &str = "declare const result: any;\nexport default result;";

/// Extension family of a virtual path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `.js/.jsx/.ts/.tsx` and module variants.
    Script,
    Json,
    /// `.css/.less/.sass/.scss/.stylus`.
    Stylesheet,
    Other,
}

impl SourceKind {
    /// Classify a path by its extension.
    pub fn of(path: &str) -> Self {
        if SCRIPT_RE.is_match(path) {
            SourceKind::Script
        } else if JSON_RE.is_match(path) {
            SourceKind::Json
        } else if STYLE_RE.is_match(path) {
            SourceKind::Stylesheet
        } else {
            SourceKind::Other
        }
    }
}

/// Native module body standing in for a synthetic script.
#[derive(Clone)]
pub struct ModuleSeed {
    /// Emitted path the seed binds to.
    pub path: String,
    pub body: BodyFn,
}

impl fmt::Debug for ModuleSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleSeed").field("path", &self.path).finish()
    }
}

/// Result of one preparation pass.
#[derive(Debug, Default)]
pub struct Prepared {
    /// Compiler-ready virtual file map.
    pub files: VirtualFileMap,
    /// Native bodies for synthetic modules.
    pub seeds: Vec<ModuleSeed>,
    /// Originating paths of injected styles, for later cleanup.
    pub cleanup_paths: Vec<String>,
    /// Non-fatal per-file errors; preparation continues regardless.
    pub errors: Vec<PrepareError>,
}

/// Prepare raw sources for the compiler adapter.
///
/// Every source name is normalized to an absolute path (default base
/// `/index.js`) and run through the rule engine before classification.
/// Individual failures are collected, never fatal.
pub fn prepare<I, K, V>(sources: I, rules: &[Rule], host: &Arc<dyn Host>) -> Prepared
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut prepared = Prepared::default();

    for (name, content) in sources {
        let name = name.into();
        let rooted = if name.starts_with('/') {
            name
        } else {
            format!("/{name}")
        };
        let filename = normalize_path(&rooted, tsxpile_config::DEFAULT_ENTRY_FILE);

        let content = match apply_rules(rules, &filename, &content.into()) {
            Ok(content) => content,
            Err(err) => {
                prepared.errors.push(err.into());
                continue;
            }
        };

        match SourceKind::of(&filename) {
            SourceKind::Script => {
                prepared.files.insert(filename, content);
            }
            SourceKind::Json => prepare_json(&mut prepared, &filename, &content),
            SourceKind::Stylesheet => prepare_stylesheet(&mut prepared, host, &filename, &content),
            SourceKind::Other => {
                if !rules.iter().any(|rule| rule.test.matches(&filename)) {
                    prepared.errors.push(PrepareError::NeedsCustomRule {
                        path: filename.clone(),
                    });
                }
                prepared.files.insert(filename, content);
            }
        }
    }

    tracing::debug!(
        target: "tsxpile::prepare",
        files = prepared.files.len(),
        seeds = prepared.seeds.len(),
        errors = prepared.errors.len(),
        "sources prepared"
    );
    prepared
}

fn prepare_json(prepared: &mut Prepared, filename: &str, content: &str) {
    let script_path = format!("{filename}.js");
    prepared
        .files
        .insert(format!("{filename}.d.ts"), DECLARATION_STUB);
    prepared
        .files
        .insert(script_path.clone(), format!("export default {content};"));

    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(value) => {
            prepared.seeds.push(ModuleSeed {
                path: script_path,
                body: Arc::new(move |scope: &ModuleScope<'_>| {
                    // Object fields double as named exports, so both the
                    // default and the named import forms see the data.
                    if let serde_json::Value::Object(fields) = &value {
                        let map: BTreeMap<String, ExportValue> = fields
                            .iter()
                            .map(|(k, v)| (k.clone(), ExportValue::Json(v.clone())))
                            .collect();
                        scope.exports.replace(map);
                    }
                    scope.exports.set("default", ExportValue::Json(value.clone()));
                    Ok(())
                }),
            });
        }
        Err(err) => {
            prepared.errors.push(PrepareError::InvalidJson {
                path: filename.to_string(),
                message: err.to_string(),
            });
        }
    }
}

fn prepare_stylesheet(
    prepared: &mut Prepared,
    host: &Arc<dyn Host>,
    filename: &str,
    content: &str,
) {
    let css = content.trim().to_string();
    let script_path = format!("{filename}.js");
    prepared
        .files
        .insert(format!("{filename}.d.ts"), DECLARATION_STUB);
    prepared
        .files
        .insert(script_path.clone(), injector_script(filename, &css));
    prepared.cleanup_paths.push(filename.to_string());

    let host = Arc::clone(host);
    let origin = filename.to_string();
    prepared.seeds.push(ModuleSeed {
        path: script_path,
        body: Arc::new(move |_scope: &ModuleScope<'_>| {
            host.inject_style(&origin, &css);
            Ok(())
        }),
    });
}

/// The user-visible synthetic text of a stylesheet module: create or
/// update a style element tagged with the originating path.
fn injector_script(filename: &str, css: &str) -> String {
    format!(
        "const css = `{css}`;\n\
         let el = document.head.querySelector('style[data-tsxpile-path=\"{filename}\"]');\n\
         if (!el) {{\n\
         el = document.createElement('style');\n\
         el.setAttribute('data-tsxpile-path', '{filename}');\n\
         document.head.appendChild(el);\n\
         }}\n\
         el.textContent = css;"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkError;
    use crate::host::MemoryHost;
    use crate::module::Exports;
    use crate::rules::{Loader, RuleTest};

    fn test_host() -> Arc<MemoryHost> {
        Arc::new(MemoryHost::new())
    }

    fn run_seed(seed: &ModuleSeed) -> Exports {
        let exports = Exports::new();
        let require: &dyn Fn(&str) -> Result<Exports, LinkError> =
            &|_spec| panic!("seed must not require");
        let scope = ModuleScope::new(&seed.path, exports.clone(), require);
        (seed.body)(&scope).unwrap();
        exports
    }

    #[test]
    fn test_source_kind_classification() {
        assert_eq!(SourceKind::of("/a.js"), SourceKind::Script);
        assert_eq!(SourceKind::of("/a.TSX"), SourceKind::Script);
        assert_eq!(SourceKind::of("/a.mjs"), SourceKind::Script);
        assert_eq!(SourceKind::of("/a.json"), SourceKind::Json);
        assert_eq!(SourceKind::of("/a.scss"), SourceKind::Stylesheet);
        assert_eq!(SourceKind::of("/a.stylus"), SourceKind::Stylesheet);
        assert_eq!(SourceKind::of("/a.svg"), SourceKind::Other);
    }

    #[test]
    fn test_script_passes_through() {
        let host: Arc<dyn Host> = test_host();
        let prepared = prepare([("/index.js", "export default 1;")], &[], &host);
        assert_eq!(prepared.files.read("/index.js"), Some("export default 1;"));
        assert!(prepared.errors.is_empty());
        assert!(prepared.seeds.is_empty());
    }

    #[test]
    fn test_bare_name_gets_rooted() {
        let host: Arc<dyn Host> = test_host();
        let prepared = prepare([("index.js", "export default 1;")], &[], &host);
        assert!(prepared.files.contains("/index.js"));
    }

    #[test]
    fn test_json_is_wrapped() {
        let host: Arc<dyn Host> = test_host();
        let prepared = prepare([("/data.json", "{\"a\": 1}")], &[], &host);
        assert_eq!(
            prepared.files.read("/data.json.js"),
            Some("export default {\"a\": 1};")
        );
        assert_eq!(prepared.files.read("/data.json.d.ts"), Some(DECLARATION_STUB));
        assert!(!prepared.files.contains("/data.json"));

        assert_eq!(prepared.seeds.len(), 1);
        let exports = run_seed(&prepared.seeds[0]);
        assert_eq!(
            exports.default_export(),
            Some(ExportValue::json(serde_json::json!({"a": 1})))
        );
        // object fields are also reachable as named exports
        assert_eq!(exports.get("a"), Some(ExportValue::json(1)));
    }

    #[test]
    fn test_invalid_json_is_collected_not_fatal() {
        let host: Arc<dyn Host> = test_host();
        let prepared = prepare([("/data.json", "{oops")], &[], &host);
        assert!(matches!(
            prepared.errors.as_slice(),
            [PrepareError::InvalidJson { .. }]
        ));
        // The synthetic text still exists so the cycle can proceed.
        assert!(prepared.files.contains("/data.json.js"));
        assert!(prepared.seeds.is_empty());
    }

    #[test]
    fn test_stylesheet_is_rewritten() {
        let host = test_host();
        let host_dyn: Arc<dyn Host> = host.clone();
        let prepared = prepare([("/s.css", "body{color:red}\n")], &[], &host_dyn);

        assert_eq!(prepared.cleanup_paths, vec!["/s.css"]);
        let text = prepared.files.read("/s.css.js").unwrap();
        assert!(text.contains("body{color:red}"));
        assert!(text.contains("data-tsxpile-path=\"/s.css\""));
        assert!(prepared.files.contains("/s.css.d.ts"));

        // The seed injects through the host, tagged by originating path.
        run_seed(&prepared.seeds[0]);
        assert_eq!(host.style("/s.css").as_deref(), Some("body{color:red}"));
    }

    #[test]
    fn test_unknown_extension_is_error_but_kept() {
        let host: Arc<dyn Host> = test_host();
        let prepared = prepare([("/x.svg", "data")], &[], &host);
        assert!(matches!(
            prepared.errors.as_slice(),
            [PrepareError::NeedsCustomRule { .. }]
        ));
        assert_eq!(prepared.files.read("/x.svg"), Some("data"));
    }

    #[test]
    fn test_unknown_extension_with_matching_rule_is_not_error() {
        let host: Arc<dyn Host> = test_host();
        let rules = vec![Rule::new(RuleTest::suffix(".svg"))
            .with_loader(Loader::new("svg", |content, _ctx| Ok(content.to_string())))];
        let prepared = prepare([("/x.svg", "data")], &rules, &host);
        assert!(prepared.errors.is_empty());
        assert_eq!(prepared.files.read("/x.svg"), Some("data"));
    }

    #[test]
    fn test_rules_transform_before_classification() {
        let host: Arc<dyn Host> = test_host();
        let rules = vec![Rule::new(RuleTest::suffix(".less")).with_loader(Loader::new(
            "less",
            |content, _ctx| Ok(content.replace("@red", "red")),
        ))];
        let prepared = prepare([("/s.less", "body{color:@red}")], &rules, &host);
        let text = prepared.files.read("/s.less.js").unwrap();
        assert!(text.contains("body{color:red}"));
    }

    #[test]
    fn test_rule_failure_skips_file_and_continues() {
        let host: Arc<dyn Host> = test_host();
        let rules = vec![Rule::new(RuleTest::suffix(".less"))
            .with_loader(Loader::new("broken", |_content, _ctx| Err("boom".to_string())))];
        let prepared = prepare(
            [("/s.less", "x"), ("/index.js", "export default 1;")],
            &rules,
            &host,
        );
        assert_eq!(prepared.errors.len(), 1);
        assert!(prepared.errors[0].to_string().contains("/s.less"));
        assert!(!prepared.files.contains("/s.less.js"));
        // Other files are unaffected.
        assert!(prepared.files.contains("/index.js"));
    }
}
