//! Error type for a compile cycle
//!
//! Every fault a cycle can hit folds into [`CompileError`]; the
//! orchestrator collects them instead of aborting, so one result carries
//! everything that went wrong alongside whatever still succeeded.

use thiserror::Error;

use tsxpile_core::{EvalError, HostError, LinkError, PrepareError};

/// A single fault collected during one compile cycle.
#[derive(Error, Debug, Clone)]
pub enum CompileError {
    /// Per-source preparation failure (rule engine, JSON parse, unknown
    /// file type).
    #[error("{0}")]
    Prepare(#[from] PrepareError),

    /// Compiler diagnostic that survived the allow-list filter.
    #[error("{path}: {message} ts({code})")]
    Diagnostic {
        path: String,
        code: u32,
        message: String,
    },

    /// Closure construction failed for one emitted file.
    #[error("{0}")]
    Closure(#[from] EvalError),

    /// Resolution or execution failure inside the module registry.
    #[error("{0}")]
    Link(#[from] LinkError),

    /// The host could not render the entry's default export.
    #[error("{0}")]
    Render(#[from] HostError),

    /// The compiler produced no runnable output at all.
    #[error("no code emitted")]
    NoCodeEmitted,

    /// Compilation produced output, but none of it is the entry module.
    #[error("no entry file emitted: '{entry}'")]
    EntryNotEmitted { entry: String },
}

impl CompileError {
    /// True for faults that leave nothing to link or render.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CompileError::NoCodeEmitted | CompileError::EntryNotEmitted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_message_carries_code() {
        let err = CompileError::Diagnostic {
            path: "/index.tsx".to_string(),
            code: 2345,
            message: "Argument of type 'string' is not assignable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "/index.tsx: Argument of type 'string' is not assignable ts(2345)"
        );
    }

    #[test]
    fn test_entry_not_emitted_names_the_entry() {
        let err = CompileError::EntryNotEmitted {
            entry: "/index.js".to_string(),
        };
        assert_eq!(err.to_string(), "no entry file emitted: '/index.js'");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_prepare_error_passes_through() {
        let err: CompileError = PrepareError::NeedsCustomRule {
            path: "/logo.svg".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "/logo.svg: you may need a custom rule for this file type"
        );
        assert!(!err.is_fatal());
    }
}
