//! Notebook Validator CLI
//!
//! Checks a notebook (or every notebook under a directory) against the
//! nbformat schema for its declared version.
//!
//! Exit status: 0 when valid, 1 when a notebook fails validation,
//! 2 when a check could not run (unreadable file, bad JSON, unsupported
//! version, configuration problems). In directory mode every notebook is
//! still checked and the worst result decides the status.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use notebook_schemas::{collect_notebooks, NotebookValidator, ValidationOutcome, ValidatorConfig};
use tracing_subscriber::EnvFilter;

const EXIT_INVALID: i32 = 1;
const EXIT_ERROR: i32 = 2;

#[derive(Parser)]
#[command(name = "validate")]
#[command(about = "Validate Jupyter notebooks against the nbformat schema")]
#[command(version)]
struct Cli {
    /// Notebook file, or a directory to search for notebooks
    filename: PathBuf,

    /// Additional configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print every violation, not just the first
    #[arg(long)]
    all_errors: bool,

    /// Reject minor versions newer than any known schema
    #[arg(long)]
    strict_minor: bool,

    /// Report raw schema errors without re-checking cells by type
    #[arg(long)]
    no_refine: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(Checked::AllValid) => {}
        Ok(Checked::SomeInvalid) => std::process::exit(EXIT_INVALID),
        Ok(Checked::SomeFailed) => std::process::exit(EXIT_ERROR),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_ERROR);
        }
    }
}

/// Worst result across every checked notebook
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Checked {
    AllValid,
    SomeInvalid,
    SomeFailed,
}

fn run(cli: Cli) -> anyhow::Result<Checked> {
    let config_path = cli.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let mut config = ValidatorConfig::load_from(config_path.as_deref())
        .context("failed to load configuration")?;

    if cli.all_errors {
        config.validation.report_all = true;
    }
    if cli.strict_minor {
        config.validation.allow_newer_minor = false;
    }
    if cli.no_refine {
        config.validation.refine_errors = false;
    }

    let validator = NotebookValidator::new(&config.validation)?;
    let notebooks = collect_notebooks(&cli.filename, &config.discovery)?;

    // A notebook that cannot be checked does not stop the others
    let mut result = Checked::AllValid;
    for path in &notebooks {
        let outcome = match validator.validate_path(path) {
            Ok(outcome) => outcome,
            Err(e) => {
                eprintln!("Error: {:#}", anyhow::Error::new(e));
                result = result.max(Checked::SomeFailed);
                continue;
            }
        };

        match outcome {
            ValidationOutcome::Valid => println!("{} is valid", path.display()),
            ValidationOutcome::Invalid(failure) => {
                result = result.max(Checked::SomeInvalid);
                println!("{} {}", path.display(), failure);
                if config.validation.report_all {
                    for violation in failure.violations().iter().skip(1) {
                        println!("    {}", violation);
                    }
                }
            }
        }
    }

    Ok(result)
}
