//! Check serialized TTCN-3 programs and report diagnostics.
//!
//! Usage: `ttcn-check [-v...|-q] [--runtime load|function-test] [--werror] [--format text|json] <path>...`
//!
//! Each path is a program file or a directory searched for `*.json`
//! program files. Exits with status 1 if any program has errors and 2 if
//! a program could not be loaded.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, warn};
use ttcn_compiler::CheckReport;
use ttcn_resolve::{CheckConfig, RuntimeVariant};
use ttcn_tools::Verbosity;

#[derive(Parser, Debug)]
#[command(name = "ttcn-check")]
#[command(about = "Run the TTCN-3 semantic checks and report diagnostics")]
struct Args {
    /// Program files or directories containing them
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Runtime library the generated code targets
    #[arg(long, value_enum, default_value_t = Runtime::Load)]
    runtime: Runtime,

    /// Treat warnings as errors
    #[arg(long)]
    werror: bool,

    /// Output format for diagnostics
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log more; repeat for checker internals
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log errors only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Runtime {
    Load,
    FunctionTest,
}

impl From<Runtime> for RuntimeVariant {
    fn from(runtime: Runtime) -> Self {
        match runtime {
            Runtime::Load => RuntimeVariant::Load,
            Runtime::FunctionTest => RuntimeVariant::FunctionTest,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    let args = Args::parse();
    ttcn_tools::init_logging(Verbosity::from_flags(args.verbose, args.quiet));

    let config = CheckConfig::new()
        .with_runtime(args.runtime.into())
        .with_warnings_as_errors(args.werror);

    let mut reports = Vec::new();
    for path in &args.paths {
        if !path.exists() {
            error!("'{}' does not exist", path.display());
            process::exit(2);
        }
        match ttcn_compiler::compile_path(path, &config) {
            Ok(mut batch) => reports.append(&mut batch),
            Err(err) => {
                error!("{err}");
                process::exit(2);
            }
        }
    }

    match args.format {
        Format::Text => print_text(&reports),
        Format::Json => match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                error!("failed to serialize reports: {err}");
                process::exit(2);
            }
        },
    }

    if reports.iter().any(CheckReport::has_errors) {
        process::exit(1);
    }
}

fn print_text(reports: &[CheckReport]) {
    for report in reports {
        let errors = report.output.error_count();
        let warnings = report.output.warning_count();
        if !report.diagnostics().is_empty() {
            println!("{}", report.format_diagnostics());
        }
        if errors > 0 {
            error!(
                "{}: {} error(s), {} warning(s)",
                report.path.display(),
                errors,
                warnings
            );
        } else if warnings > 0 {
            warn!("{}: {} warning(s)", report.path.display(), warnings);
        } else {
            info!("{}: no errors found", report.path.display());
        }
    }
}
