use clap::{Parser, Subcommand};
use royalbit_regsheet::cli;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "regsheet")]
#[command(about = "Fit regressions and publish tidy coefficient tables into Excel sheets.")]
#[command(long_about = "Regsheet - OLS regressions published into named Excel sheets
Simulate | Fit | Tidy | Merge without touching your other sheets

COMMANDS:
  run      - Simulate data, fit each model, publish the tables
  inspect  - Show the coefficient tables stored in a workbook
  init     - Write a starter job file

WORKBOOK MERGE:
  Each regression is written to its own sheet with the header
    term | estimate | std.error | statistic | p.value
  Existing sheets with the same name are replaced in place.
  Every other sheet (formatting, formulas, charts) is kept as it was,
  so a hand-made summary like =Regression1!B2 picks up the new values.

EXAMPLES:
  regsheet run                                  # Built-in job → regressions.xlsx
  regsheet run --seed 42 -o report.xlsx         # Reproducible run
  regsheet init job.yaml && regsheet run -c job.yaml
  regsheet inspect report.xlsx --sheet Regression1 --json

LOGGING:
  -v enables debug logs on stderr; RUST_LOG overrides the filter.")]
#[command(version)]
struct Cli {
    /// Show verbose output and debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Simulate data, fit an OLS model per regression, and publish the tidy
coefficient tables into the output workbook.

Without --config the built-in job is used: Regression1 (y ~ x1) and
Regression2 (y ~ x1 + x2), 100 observations each.

The workbook is created if missing. Otherwise only the named sheets are
replaced; the file is written to a temporary path and renamed into place.")]
    /// Fit regressions and publish them into a workbook
    Run {
        /// Job file (YAML); defaults to the built-in job
        #[arg(short, long, env = "REGSHEET_CONFIG")]
        config: Option<PathBuf>,

        /// Output workbook (overrides the job's `output`)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Random seed (overrides the job's `seed`)
        #[arg(short, long)]
        seed: Option<u64>,
    },

    /// Show the coefficient tables stored in a workbook
    Inspect {
        /// Path to the workbook (.xlsx)
        file: PathBuf,

        /// Only read this sheet
        #[arg(short, long)]
        sheet: Option<String>,

        /// Print tables as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the built-in job to a YAML file
    Init {
        /// Path of the job file to create
        file: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "royalbit_regsheet=debug"
    } else {
        "royalbit_regsheet=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            output,
            seed,
        } => cli::run(config, output, seed, cli.verbose),

        Commands::Inspect { file, sheet, json } => cli::inspect(file, sheet, json),

        Commands::Init { file, force } => cli::init(file, force),
    }
}
