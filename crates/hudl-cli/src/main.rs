//! The `hudl` command-line tool.
//!
//! - `hudl serve <dir>`: run the dev server over a template tree.
//! - `hudl fmt <files>`: canonicalize template source in place.
//! - `hudl check <files>`: parse and transform without writing.
//!
//! Exit codes: 0 on success, 1 on initialization or processing failure,
//! 2 on invalid arguments (clap's default).

use clap::{Parser, Subcommand};
use hudl_devserver::{DevServer, DevServerConfig};
use hudl_syntax::{Diagnostic, LineCol};
use hudl_template::{compile_document, format_source};
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "hudl", version, about = "Type-safe HTML templating")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the development server.
    Serve {
        /// Directory tree holding .hudl documents.
        #[arg(default_value = ".")]
        dir: PathBuf,
        /// Listen address (host:port). Honors HUDL_DEV_ADDR when unset.
        #[arg(long)]
        addr: Option<String>,
    },
    /// Reformat template files in place.
    Fmt {
        files: Vec<PathBuf>,
        /// Only verify formatting; exit nonzero when a file would change.
        #[arg(long)]
        check: bool,
    },
    /// Parse and validate template files.
    Check { files: Vec<PathBuf> },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { dir, addr } => serve(dir, addr),
        Command::Fmt { files, check } => fmt(files, check),
        Command::Check { files } => check_files(files),
    }
}

fn serve(dir: PathBuf, addr: Option<String>) -> ExitCode {
    if !dir.is_dir() {
        error!("'{}' is not a directory", dir.display());
        return ExitCode::FAILURE;
    }

    let addr = addr
        .or_else(|| std::env::var("HUDL_DEV_ADDR").ok())
        .unwrap_or_else(|| "localhost:9999".to_string());
    let config = DevServerConfig::new(dir).with_addr(addr);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(DevServer::new(config).run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("dev server failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn fmt(files: Vec<PathBuf>, check: bool) -> ExitCode {
    let mut failed = false;
    for path in &files {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                error!("{}: {err}", path.display());
                failed = true;
                continue;
            }
        };
        let formatted = match format_source(&source) {
            Ok(formatted) => formatted,
            Err(err) => {
                report(path, &source, err.span.start, &err.message);
                failed = true;
                continue;
            }
        };
        if check {
            if formatted != source {
                println!("{}: needs formatting", path.display());
                failed = true;
            }
        } else if formatted != source {
            if let Err(err) = std::fs::write(path, formatted) {
                error!("{}: {err}", path.display());
                failed = true;
            }
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn check_files(files: Vec<PathBuf>) -> ExitCode {
    let mut failed = false;
    for path in &files {
        let source = match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                error!("{}: {err}", path.display());
                failed = true;
                continue;
            }
        };
        let doc_name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("template");
        match compile_document(&source, doc_name, path.parent(), &HashSet::new()) {
            Ok(doc) => {
                for (span, message) in &doc.warnings {
                    let diag = Diagnostic::at(
                        path.display().to_string(),
                        &source,
                        *span,
                        hudl_syntax::Severity::Warning,
                        message.clone(),
                    );
                    println!("warning: {diag}");
                }
            }
            Err(err) => {
                report(path, &source, err.span().start, err.message());
                failed = true;
            }
        }
    }
    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn report(path: &PathBuf, source: &str, offset: usize, message: &str) {
    let pos = LineCol::of(source, offset);
    println!("{}:{}:{}: {message}", path.display(), pos.line, pos.column);
}
