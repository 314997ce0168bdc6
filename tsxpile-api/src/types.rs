//! Result types returned from a compile cycle

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tsxpile_core::{ExportValue, Host};

use crate::error::CompileError;

/// One file of compiled output, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedFile {
    pub path: String,
    pub code: String,
}

/// Deferred removal of the styles one cycle injected.
///
/// Holds the originating paths of this cycle's styles only, so running
/// it never touches styles a newer cycle owns under different paths.
/// Running twice is a no-op.
pub struct Cleanup {
    host: Arc<dyn Host>,
    paths: Vec<String>,
    done: AtomicBool,
}

impl Cleanup {
    pub(crate) fn new(host: Arc<dyn Host>, paths: Vec<String>) -> Self {
        Cleanup {
            host,
            paths,
            done: AtomicBool::new(false),
        }
    }

    /// Remove every style this cycle injected. Idempotent.
    pub fn run(&self) {
        if self.done.swap(true, Ordering::SeqCst) {
            return;
        }
        for path in &self.paths {
            tracing::debug!(target: "tsxpile::prepare", path, "removing injected style");
            self.host.remove_style(path);
        }
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// Originating paths scheduled for removal.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

impl fmt::Debug for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cleanup")
            .field("paths", &self.paths)
            .field("done", &self.is_done())
            .finish()
    }
}

/// Everything one compile cycle produced.
///
/// Always fully populated: a failed cycle still reports its compiled
/// listing, its errors and a runnable [`Cleanup`], with `rendered` and
/// `default_export` left empty.
#[derive(Debug)]
pub struct CompileResult {
    /// Host-rendered form of the entry's default export, when the cycle
    /// reached rendering.
    pub rendered: Option<ExportValue>,
    /// The entry module's default export, when the entry executed.
    pub default_export: Option<ExportValue>,
    /// Every emitted file, in emission order.
    pub compiled: Vec<EmittedFile>,
    /// All faults collected across the cycle.
    pub errors: Vec<CompileError>,
    /// Removes this cycle's injected styles when run.
    pub cleanup: Cleanup,
}

impl CompileResult {
    /// True when the cycle rendered without collecting any fault.
    pub fn is_clean(&self) -> bool {
        self.rendered.is_some() && self.errors.is_empty()
    }
}
