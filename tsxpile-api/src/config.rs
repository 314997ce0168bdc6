//! Per-cycle configuration
//!
//! One [`CompileConfig`] describes one compile cycle: entry point, rule
//! set, resolution overrides and the four collaborator boundaries. The
//! default wires in the reference collaborators, which is enough to run
//! the whole pipeline in memory.

use std::fmt;
use std::sync::Arc;

use tsxpile_config::{ResolveOverrides, DEFAULT_DISPLAY_NAME, DEFAULT_ENTRY_FILE};
use tsxpile_core::{
    BasicEvaluator, Compile, Evaluate, Fetch, Host, MemoryHost, NoFetch, PassthroughCompiler,
    RequireOverride, Rule,
};

/// Configuration for one compile cycle.
#[derive(Clone)]
pub struct CompileConfig {
    /// Absolute path of the module to execute and render.
    pub entry_file: String,
    /// Name handed to the host when rendering.
    pub display_name: String,
    /// Caller-supplied resolution overrides, merged over the defaults.
    pub resolve: ResolveOverrides,
    /// Rule set applied to every source during preparation.
    pub rules: Vec<Rule>,
    /// Consulted before the module registry on every require.
    pub require_override: Option<Arc<RequireOverride>>,
    pub compiler: Arc<dyn Compile>,
    pub evaluator: Arc<dyn Evaluate>,
    pub host: Arc<dyn Host>,
    pub fetch: Arc<dyn Fetch>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        CompileConfig {
            entry_file: DEFAULT_ENTRY_FILE.to_string(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            resolve: ResolveOverrides::default(),
            rules: Vec::new(),
            require_override: None,
            compiler: Arc::new(PassthroughCompiler::new()),
            evaluator: Arc::new(BasicEvaluator::new()),
            host: Arc::new(MemoryHost::new()),
            fetch: Arc::new(NoFetch),
        }
    }
}

impl CompileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry_file(mut self, entry_file: impl Into<String>) -> Self {
        self.entry_file = entry_file.into();
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_resolve(mut self, resolve: ResolveOverrides) -> Self {
        self.resolve = resolve;
        self
    }

    pub fn with_rules(mut self, rules: Vec<Rule>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_require_override(mut self, require: Arc<RequireOverride>) -> Self {
        self.require_override = Some(require);
        self
    }

    pub fn with_compiler(mut self, compiler: Arc<dyn Compile>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluate>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_host(mut self, host: Arc<dyn Host>) -> Self {
        self.host = host;
        self
    }

    pub fn with_fetch(mut self, fetch: Arc<dyn Fetch>) -> Self {
        self.fetch = fetch;
        self
    }
}

impl fmt::Debug for CompileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileConfig")
            .field("entry_file", &self.entry_file)
            .field("display_name", &self.display_name)
            .field("resolve", &self.resolve)
            .field("rules", &self.rules.len())
            .field("require_override", &self.require_override.is_some())
            .finish()
    }
}
