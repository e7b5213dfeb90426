use clap::Parser;
use maude_indicators::cli::{self, RunOptions};
use maude_indicators::config::Config;
use maude_indicators::error::MaudeResult;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "maude-indicators")]
#[command(about = "Add binary indicator columns to FDA MAUDE adverse-event exports")]
#[command(long_about = "maude-indicators - binary indicator columns for MAUDE exports

For every distinct value found in the 'Device Problem', 'Patient Problem'
and 'Patient Outcome' columns of the 'Events' sheet, a new column is added:

  Device_<value>    Patient_<value>    Outcome_<value>

Each cell is 1 (green) when the event reports that value, 0 (pink)
otherwise. Original formatting, row heights, column widths, merged cells,
filters, frozen panes and hidden rows or columns are kept. A timestamped
backup (<name>_backup_YYYYMMDD_HHMMSS.xlsx) is written next to each
updated file. Re-running on a processed file adds only what is missing.

DISCOVERY:
  Without a file argument, .xlsx files in --dir whose name contains the
  marker are processed. Subdirectories are not searched. Excel lock files
  (~$...) and backups named <name>_backup_YYYYMMDD_HHMMSS.xlsx are skipped.

EXAMPLES:
  maude-indicators                          # every *MAUDE*.xlsx in this directory
  maude-indicators MAUDE_2024.xlsx          # one file
  maude-indicators --dir exports -n         # preview a directory
  maude-indicators --config maude.yaml      # custom sheet, colors, categories")]
#[command(version)]
struct Cli {
    /// Workbook to process (default: discover files in --dir)
    file: Option<PathBuf>,

    /// Directory searched when no file is given (lock files and backups are skipped)
    #[arg(short, long, default_value = ".")]
    dir: PathBuf,

    /// Case-insensitive file name marker used for discovery
    #[arg(short, long)]
    marker: Option<String>,

    /// Worksheet holding the events
    #[arg(short, long)]
    sheet: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Compute the new columns without writing any file
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// List added columns and enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "maude_indicators=debug"
    } else {
        "maude_indicators=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> MaudeResult<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(marker) = args.marker {
        config.marker = marker;
    }
    if let Some(sheet) = args.sheet {
        config.sheet = sheet;
    }
    config.validate()?;

    let options = RunOptions {
        file: args.file,
        dir: args.dir,
        dry_run: args.dry_run,
        verbose: args.verbose,
        json: args.json,
    };
    cli::run(&config, &options)?;
    Ok(())
}
