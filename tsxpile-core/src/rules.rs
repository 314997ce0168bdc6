//! Rule engine (loader pipeline)
//!
//! Rules are pattern-matched, ordered transform chains applied to raw
//! source text before it reaches the compiler adapter. Each loader is a
//! plain function pair: an optional *pitch* hook running forward over the
//! chain (a `Some` return short-circuits the remaining pitches) and a
//! *normal* hook running backward over the chain, so the last-declared
//! loader sees the raw content first.
//!
//! Canonical ordering: rules are stable-sorted by `(enforce rank,
//! declaration index)` with `Pre < Normal < Post`; ties keep declaration
//! order. Within a rule the pitch pass runs in declaration order and the
//! unwind pass runs from the stopping index (inclusive) down to zero.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::error::RuleError;

/// Enforcement tier of a rule. `Pre` runs before `Normal` before `Post`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Enforce {
    Pre,
    #[default]
    Normal,
    Post,
}

impl Enforce {
    fn rank(self) -> i8 {
        match self {
            Enforce::Pre => -1,
            Enforce::Normal => 0,
            Enforce::Post => 1,
        }
    }
}

/// Path pattern deciding whether a rule applies to a file.
#[derive(Debug, Clone)]
pub struct RuleTest {
    regex: Regex,
}

impl RuleTest {
    /// Build a test from a regular expression over the virtual path.
    pub fn pattern(pattern: &str) -> Result<Self, RuleError> {
        let regex = Regex::new(pattern).map_err(|e| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { regex })
    }

    /// Build a test matching paths ending with `suffix` (e.g. `.less`).
    pub fn suffix(suffix: &str) -> Self {
        let regex = Regex::new(&format!("{}$", regex::escape(suffix)))
            .unwrap_or_else(|_| unreachable!("escaped suffix is a valid pattern"));
        Self { regex }
    }

    /// Check whether a filename matches.
    pub fn matches(&self, filename: &str) -> bool {
        self.regex.is_match(filename)
    }
}

/// Context handed to every loader hook.
#[derive(Debug, Clone)]
pub struct LoaderContext {
    /// Absolute virtual path of the file being transformed.
    pub filename: String,
    /// Loader-specific options, opaque to the engine.
    pub options: Value,
}

/// Normal-phase hook: content in, content out, or a bare failure message.
pub type RunFn = Arc<dyn Fn(&str, &LoaderContext) -> Result<String, String> + Send + Sync>;

/// Pitch-phase hook: `Ok(Some(content))` replaces the content and
/// short-circuits the remaining pitches.
pub type PitchFn = Arc<dyn Fn(&str, &LoaderContext) -> Result<Option<String>, String> + Send + Sync>;

/// A single transform in a rule's chain.
#[derive(Clone)]
pub struct Loader {
    /// Name used in error context.
    pub name: String,
    /// Optional forward-phase hook.
    pub pitch: Option<PitchFn>,
    /// Backward-phase hook.
    pub run: RunFn,
    /// Options passed through to both hooks.
    pub options: Value,
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("name", &self.name)
            .field("has_pitch", &self.pitch.is_some())
            .field("options", &self.options)
            .finish()
    }
}

impl Loader {
    /// Create a loader from its normal-phase hook.
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(&str, &LoaderContext) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            pitch: None,
            run: Arc::new(run),
            options: Value::Null,
        }
    }

    /// Attach a pitch hook.
    pub fn with_pitch<F>(mut self, pitch: F) -> Self
    where
        F: Fn(&str, &LoaderContext) -> Result<Option<String>, String> + Send + Sync + 'static,
    {
        self.pitch = Some(Arc::new(pitch));
        self
    }

    /// Attach loader options.
    pub fn with_options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    fn context(&self, filename: &str) -> LoaderContext {
        LoaderContext {
            filename: filename.to_string(),
            options: self.options.clone(),
        }
    }
}

/// A pattern-matched loader chain with an enforcement tier.
#[derive(Debug, Clone)]
pub struct Rule {
    pub test: RuleTest,
    pub loaders: Vec<Loader>,
    pub enforce: Enforce,
}

impl Rule {
    /// Create a rule with an empty chain.
    pub fn new(test: RuleTest) -> Self {
        Self {
            test,
            loaders: Vec::new(),
            enforce: Enforce::Normal,
        }
    }

    /// Append a loader to the chain.
    pub fn with_loader(mut self, loader: Loader) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Set the enforcement tier.
    pub fn with_enforce(mut self, enforce: Enforce) -> Self {
        self.enforce = enforce;
        self
    }
}

/// Rule declaration order, stable-sorted by enforcement tier.
fn ordered_indices(rules: &[Rule]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..rules.len()).collect();
    indices.sort_by_key(|&i| rules[i].enforce.rank());
    indices
}

/// Apply every matching rule's loader chain to `content`.
///
/// Each rule's full pitch+unwind cycle completes before the next rule
/// begins. The first hook error aborts processing for this file and is
/// returned with the file path attached.
pub fn apply_rules(rules: &[Rule], filename: &str, content: &str) -> Result<String, RuleError> {
    let mut result = content.to_string();

    for index in ordered_indices(rules) {
        let rule = &rules[index];
        if !rule.test.matches(filename) {
            continue;
        }
        tracing::debug!(target: "tsxpile::prepare", rule = index, filename, "applying rule");

        // Pitch pass, forward. A Some return replaces the content and
        // stops the scan at that loader.
        let mut unwind_from = rule.loaders.len();
        for (i, loader) in rule.loaders.iter().enumerate() {
            let Some(pitch) = &loader.pitch else {
                continue;
            };
            match pitch(&result, &loader.context(filename)) {
                Ok(None) => {}
                Ok(Some(replaced)) => {
                    result = replaced;
                    unwind_from = i + 1;
                    break;
                }
                Err(message) => {
                    return Err(RuleError::PitchFailed {
                        filename: filename.to_string(),
                        loader: loader.name.clone(),
                        message,
                    });
                }
            }
        }

        // Unwind pass, backward from the stopping index down to zero.
        for loader in rule.loaders[..unwind_from].iter().rev() {
            result = (loader.run)(&result, &loader.context(filename)).map_err(|message| {
                RuleError::TransformFailed {
                    filename: filename.to_string(),
                    loader: loader.name.clone(),
                    message,
                }
            })?;
        }
    }

    Ok(result)
}
