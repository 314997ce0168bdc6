//! tsxpile CLI - compile and run a project directory in memory
//!
//! Project-based execution - all configuration from tsxpile.json

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, ValueEnum};

mod config;
mod logging;

use crate::config::{LogConfig, Manifest};
use crate::logging::LogFormat;
use tsxpile_api::{compile, CompileConfig};
use tsxpile_core::{prepare, Compile, ExportValue, Host, MemoryHost, PassthroughCompiler};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "tsxpile",
    about = "In-memory TSX compile-and-run pipeline",
    version = "0.1.0"
)]
struct Cli {
    /// Manifest path (default: ./tsxpile.json)
    #[arg(value_name = "CONFIG", default_value = "tsxpile.json")]
    config: PathBuf,

    /// Stop after compilation and print the emitted listing
    #[arg(long)]
    emit_only: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value = "compact")]
    log_format: LogFormatArg,
}

fn main() {
    let cli = Cli::parse();
    logging::init(&LogConfig::from_verbosity(cli.verbose), cli.log_format.into());

    let manifest = match Manifest::read(&cli.config) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    let root = manifest.root_dir(&cli.config);
    let sources = match load_sources(&root) {
        Ok(sources) => sources,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };
    if sources.is_empty() {
        eprintln!("Error: no sources found under '{}'", root.display());
        process::exit(1);
    }

    if cli.emit_only || manifest.emit_only.unwrap_or(false) {
        handle_emit_only(sources);
        return;
    }
    handle_run(sources, &manifest);
}

/// Prepare and compile only, no linking or rendering.
fn handle_emit_only(sources: Vec<(String, String)>) {
    let host: Arc<dyn Host> = Arc::new(MemoryHost::new());
    let prepared = prepare(sources, &[], &host);
    let outputs = PassthroughCompiler::new().emit(&prepared.files);

    for output in &outputs {
        println!("--- {}", output.path);
        println!("{}", output.code);
    }
    for error in &prepared.errors {
        eprintln!("error: {error}");
    }
    if outputs.is_empty() {
        eprintln!("error: no code emitted");
        process::exit(1);
    }
    if !prepared.errors.is_empty() {
        process::exit(1);
    }
}

/// Run one full compile cycle and report the outcome.
fn handle_run(sources: Vec<(String, String)>, manifest: &Manifest) {
    let mut config = CompileConfig::default();
    if let Some(entry) = &manifest.entry {
        config = config.with_entry_file(entry);
    }
    if let Some(name) = &manifest.display_name {
        config = config.with_display_name(name);
    }
    if let Some(resolve) = &manifest.resolve {
        config = config.with_resolve(resolve.clone());
    }

    let result = compile(sources, &config);

    println!("Compiled {} file(s)", result.compiled.len());
    for file in &result.compiled {
        println!("  {}", file.path);
    }
    for error in &result.errors {
        eprintln!("error: {error}");
    }
    if let Some(rendered) = &result.rendered {
        println!("Rendered ({}):", config.display_name);
        println!("{}", format_value(rendered));
    }

    result.cleanup.run();
    if !result.errors.is_empty() {
        process::exit(1);
    }
}

fn format_value(value: &ExportValue) -> String {
    match value.as_json() {
        Some(json) => serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string()),
        None => format!("{value:?}"),
    }
}

/// Read every file under `root` into `(virtual path, content)` pairs,
/// sorted by path for stable ordering.
fn load_sources(root: &Path) -> Result<Vec<(String, String)>, String> {
    let mut sources = Vec::new();
    collect_sources(root, root, &mut sources)?;
    sources.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(sources)
}

fn collect_sources(
    dir: &Path,
    root: &Path,
    out: &mut Vec<(String, String)>,
) -> Result<(), String> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| format!("cannot read '{}': {}", dir.display(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| format!("cannot read '{}': {}", dir.display(), e))?;
        let path = entry.path();
        if path.is_dir() {
            collect_sources(&path, root, out)?;
            continue;
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read '{}': {}", path.display(), e))?;
        let rel = path
            .strip_prefix(root)
            .map_err(|e| format!("cannot relativize '{}': {}", path.display(), e))?;
        let virtual_path = format!(
            "/{}",
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        );
        out.push((virtual_path, content));
    }
    Ok(())
}
