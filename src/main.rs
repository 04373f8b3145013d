use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use nameplan::{commands, diagnostics, error, logging, watch};

#[derive(Parser)]
#[command(
    name = "nameplan",
    version,
    about = "Find naming-convention violations and plan their fix"
)]
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
    /// Log at debug level (overrides NAMEPLAN_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-validate a written plan without rescanning
    Check {
        /// Plan file to read (default: the configured plan file)
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    /// Output comprehensive reference document (usage, config, state)
    Info {
        /// Output as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
    /// Scan, build, validate, and optimize a refactor plan
    Plan {
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
        /// Do not write the plan file
        #[arg(long)]
        no_write: bool,
    },
    /// List every naming violation in the project
    Scan {
        /// Print the scan result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Check env keys, generated reports, and CI configuration
    Validate {
        /// Rename report fields that are present under another name
        #[arg(long)]
        fix: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-run validate whenever its inputs change
    Watch {
        /// Print each report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Map a command result to a process exit code, printing errors.
fn finish(result: Result<ExitCode, error::Error>) -> ExitCode {
    return match result {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(code = e.code(), "command failed");
            diagnostics::print_error(&e);
            ExitCode::from(3)
        },
    };
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    return match cli.command {
        Commands::Check { plan } => finish(commands::check(plan.as_deref())),
        Commands::Info { json } => {
            commands::info(json);
            ExitCode::SUCCESS
        },
        Commands::Plan { json, no_write } => finish(commands::plan(json, !no_write)),
        Commands::Scan { json } => finish(commands::scan(json)),
        Commands::Validate { fix, json } => finish(commands::validate(fix, json)),
        Commands::Watch { json } => finish(watch::run(json)),
    };
}
