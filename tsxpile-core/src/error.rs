//! Error types for the core pipeline
//!
//! Each stage has its own error enum; faults are returned, not thrown.
//! The single catch-and-convert point for user code is module-body
//! execution inside the linker, which surfaces as [`LinkError::Runtime`].

use thiserror::Error;

/// Error type for rule/loader transforms
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("{filename}: loader '{loader}' pitch failed: {message}")]
    PitchFailed {
        filename: String,
        loader: String,
        message: String,
    },

    #[error("{filename}: loader '{loader}' failed: {message}")]
    TransformFailed {
        filename: String,
        loader: String,
        message: String,
    },

    #[error("invalid rule pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

/// Error type for source preparation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrepareError {
    #[error("{0}")]
    Rule(#[from] RuleError),

    #[error("{path}: you may need a custom rule for this file type")]
    NeedsCustomRule { path: String },

    #[error("{path}: invalid JSON: {message}")]
    InvalidJson { path: String, message: String },
}

/// Error type for closure construction from emitted code
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("{path}:{line}: unsupported syntax: {snippet}")]
    UnsupportedSyntax {
        path: String,
        line: usize,
        snippet: String,
    },
}

/// Error type for module resolution and execution
#[derive(Error, Debug, Clone)]
pub enum LinkError {
    #[error("{requested_from}: cannot find module '{path}' (tried {})", .tried.join(", "))]
    ModuleNotFound {
        path: String,
        requested_from: String,
        tried: Vec<String>,
    },

    #[error("{path}: {message}")]
    Runtime { path: String, message: String },

    #[error("external '{name}': {message}")]
    External { name: String, message: String },
}

/// Error type for the externals fetch boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("fetch failed for '{url}': {message}")]
    Failed { url: String, message: String },

    #[error("no fetch transport configured (requested '{url}')")]
    NoTransport { url: String },
}

/// Error type for the host environment boundary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("render failed: {0}")]
    RenderFailed(String),
}
