//! # optmodel CLI
//!
//! Batch driver and interactive REPL for the model front-end.
//!
//! ## Usage
//!
//! ```bash
//! # Compile a model with a data file, print the report
//! optmodel production.mod production.dat
//!
//! # Interactive REPL
//! optmodel
//! ```
//!
//! Exit code is non-zero iff any errors occurred.

use anyhow::Context;
use clap::Parser;
use optmodel::{Config, ModelSession};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

/// Front-end compiler for an OPL-style algebraic modeling language.
#[derive(Debug, Parser)]
#[command(name = "optmodel", version, about)]
struct Cli {
    /// Model file (.mod); omit to open an interactive REPL
    model: Option<PathBuf>,

    /// Optional data file (.dat)
    data: Option<PathBuf>,

    /// Suppress the repository report, print only diagnostics
    #[arg(long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("warning: bad configuration, using defaults: {e}");
        Config::default()
    });
    init_tracing(&config);

    match cli.model {
        Some(model) => match run_batch(&model, cli.data.as_deref(), cli.quiet, config) {
            Ok(clean) => {
                if clean {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }
            Err(e) => {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        },
        None => {
            run_repl(config);
            ExitCode::SUCCESS
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Compile one model (+ optional data file); returns whether the run was
/// error-free.
fn run_batch(
    model: &std::path::Path,
    data: Option<&std::path::Path>,
    quiet: bool,
    config: Config,
) -> anyhow::Result<bool> {
    let model_text = fs::read_to_string(model)
        .with_context(|| format!("cannot read model file {}", model.display()))?;
    let data_text = match data {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("cannot read data file {}", path.display()))?,
        ),
        None => None,
    };

    let mut session = ModelSession::new(config);
    session.compile(&model_text, data_text.as_deref());

    if session.has_errors() {
        if session.diagnostics.is_partial() {
            eprintln!(
                "warning: model compiled partially ({} statement(s) ok, {} error(s))",
                session.diagnostics.success_count(),
                session.diagnostics.errors().len()
            );
        }
        eprint!("{}", session.diagnostics.render());
    }
    if !quiet {
        print!("{}", session.report());
    }
    Ok(!session.has_errors())
}

fn run_repl(config: Config) {
    println!("optmodel interactive session");
    println!("Type model statements, or .help for commands.\n");

    let mut session = ModelSession::new(config);
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("cannot start line editor: {e}");
            return;
        }
    };

    loop {
        match editor.readline("opt> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line);
                if line.starts_with('.') {
                    if !handle_meta(line, &mut session) {
                        break;
                    }
                    continue;
                }
                let before = session.diagnostics.errors().len();
                session.parse_model(line);
                for diag in &session.diagnostics.errors()[before..] {
                    println!("{diag}");
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("read error: {e}");
                break;
            }
        }
    }
    println!("Goodbye.");
}

/// Handle a dot-command; returns false to exit the loop.
fn handle_meta(line: &str, session: &mut ModelSession) -> bool {
    let mut parts = line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let argument = parts.next().unwrap_or("").trim();

    match command {
        ".help" => {
            println!("Commands:");
            println!("  .report        Show the repository report");
            println!("  .data <file>   Bind a data file");
            println!("  .expand        Expand templates into constraints");
            println!("  .clear         Reset the session");
            println!("  .quit          Exit");
        }
        ".report" => print!("{}", session.report()),
        ".data" => {
            if argument.is_empty() {
                println!("Usage: .data <file>");
            } else {
                match fs::read_to_string(argument) {
                    Ok(text) => {
                        let before = session.diagnostics.errors().len();
                        session.bind_data(&text);
                        for diag in &session.diagnostics.errors()[before..] {
                            println!("{diag}");
                        }
                    }
                    Err(e) => println!("cannot read {argument}: {e}"),
                }
            }
        }
        ".expand" => {
            let before = session.diagnostics.errors().len();
            session.expand();
            for diag in &session.diagnostics.errors()[before..] {
                println!("{diag}");
            }
            println!(
                "{} constraint(s) in the repository",
                session.repository.equations().len()
            );
        }
        ".clear" => {
            session.clear();
            println!("Session cleared.");
        }
        ".quit" | ".exit" => return false,
        other => println!("Unknown command: {other}. Type .help for help."),
    }
    true
}
