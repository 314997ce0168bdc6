//! tsxpile Core
//!
//! The build pipeline around compilation: rule engine (loader pipeline),
//! source preparer, module linker, and externals loader, plus the
//! collaborator boundaries the orchestrator wires together: compiler
//! adapter ([`Compile`]), code evaluation ([`Evaluate`]), host
//! environment ([`Host`]) and externals transport ([`Fetch`]). Each
//! boundary ships a reference implementation; hosts embedding a real
//! compiler, script engine or document substitute their own.

pub mod compiler;
pub mod error;
pub mod eval;
pub mod externals;
pub mod host;
pub mod linker;
pub mod module;
pub mod prepare;
pub mod rules;

pub use compiler::{Compile, Diagnostic, EmitOutput, PassthroughCompiler};
pub use error::{EvalError, FetchError, HostError, LinkError, PrepareError, RuleError};
pub use eval::{BasicEvaluator, Evaluate};
pub use externals::{load_externals, Fetch, NoFetch, StaticFetch};
pub use host::{Host, MemoryHost};
pub use linker::{Linker, RequireOverride};
pub use module::{BodyFn, ExportValue, Exports, HostFn, ModuleScope};
pub use prepare::{prepare, ModuleSeed, Prepared, SourceKind};
pub use rules::{apply_rules, Enforce, Loader, LoaderContext, PitchFn, Rule, RuleTest, RunFn};
