use crate::config::Config;
use crate::core::{FileReport, FileStatus, Pipeline};
use crate::error::MaudeResult;
use colored::Colorize;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::discovery::find_candidates;

/// Options taken from the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit file; when absent, `dir` is scanned
    pub file: Option<PathBuf>,
    pub dir: PathBuf,
    pub dry_run: bool,
    pub verbose: bool,
    /// Print a JSON summary instead of the colored report
    pub json: bool,
}

/// Result for one candidate file
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    Processed(FileReport),
    Failed { path: PathBuf, reason: String },
}

impl FileOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FileOutcome::Processed(report) => &report.path,
            FileOutcome::Failed { path, .. } => path,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Processed(_))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub files: Vec<FileOutcome>,
}

impl RunSummary {
    fn record(&mut self, outcome: FileOutcome) {
        self.attempted += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.files.push(outcome);
    }
}

/// The explicit file if one was given, otherwise the marker matches in `dir`
pub fn resolve_candidates(options: &RunOptions, config: &Config) -> MaudeResult<Vec<PathBuf>> {
    match &options.file {
        Some(file) => Ok(vec![file.clone()]),
        None => find_candidates(&options.dir, &config.marker),
    }
}

/// Run the pipeline on one file; every error is turned into a `Failed` outcome
pub fn process_file(pipeline: &Pipeline, path: &Path) -> FileOutcome {
    match pipeline.process(path) {
        Ok(report) => FileOutcome::Processed(report),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "file skipped");
            FileOutcome::Failed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        }
    }
}

/// Process `paths` one after the other. `on_file` sees each outcome before it
/// is recorded in the summary.
pub fn process_files(
    config: &Config,
    paths: &[PathBuf],
    dry_run: bool,
    mut on_file: impl FnMut(&FileOutcome),
) -> RunSummary {
    let pipeline = Pipeline::new(config).dry_run(dry_run);
    let mut summary = RunSummary::default();
    for path in paths {
        let outcome = process_file(&pipeline, path);
        on_file(&outcome);
        summary.record(outcome);
    }
    summary
}

/// Execute a batch run
pub fn run(config: &Config, options: &RunOptions) -> MaudeResult<RunSummary> {
    let report = !options.json;
    let candidates = resolve_candidates(options, config)?;

    if report {
        println!("{}", "🚀 MAUDE Indicator Columns".bold().green());
        println!("   Sheet:  {}", config.sheet);
        match &options.file {
            Some(file) => println!("   File:   {}", file.display()),
            None => println!(
                "   Search: {} (marker '{}')",
                options.dir.display(),
                config.marker
            ),
        }
        if options.dry_run {
            println!("   Mode:   {}", "dry run (no files written)".yellow());
        }
        println!();
    }

    if candidates.is_empty() {
        info!(dir = %options.dir.display(), "no candidate files");
        if report {
            println!(
                "{}",
                format!(
                    "❌ No {} Excel files found in {}",
                    config.marker,
                    options.dir.display()
                )
                .red()
            );
            println!("   File names must contain '{}'", config.marker);
        } else {
            println!("{}", serde_json::to_string_pretty(&RunSummary::default())?);
        }
        return Ok(RunSummary::default());
    }

    if report {
        println!("📁 Found {} file(s) to process:", candidates.len());
        for path in &candidates {
            println!("   • {}", display_name(path));
        }
        println!();
    }

    let summary = process_files(config, &candidates, options.dry_run, |outcome| {
        if report {
            println!("{}", "═".repeat(60));
            println!("{} {}", "📊 Processing:".bold(), display_name(outcome.path()));
            print_outcome(outcome, options.verbose);
        }
    });

    if report {
        print_summary(&summary);
    } else {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(summary)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_outcome(outcome: &FileOutcome, verbose: bool) {
    let report = match outcome {
        FileOutcome::Failed { reason, .. } => {
            println!("   {} {}\n", "❌".red(), reason.red());
            return;
        }
        FileOutcome::Processed(report) => report,
    };

    println!(
        "   Loaded {} rows, {} columns",
        report.rows, report.original_columns
    );
    for count in &report.categories {
        if count.columns > 0 {
            println!(
                "   {}: {} unique values in {} column(s)",
                count.category, count.values, count.columns
            );
        }
    }
    if !report.existing_indicators.is_empty() {
        println!(
            "   Found {} existing indicator column(s)",
            report.existing_indicators.len()
        );
    }
    if verbose {
        for name in &report.added_columns {
            println!("      + {}", name.bright_blue());
        }
    }

    match report.status {
        FileStatus::Updated => {
            println!(
                "   {} Added {} column(s), {} total",
                "✅".green(),
                report.added_columns.len(),
                report.total_columns()
            );
            if let Some(backup) = &report.backup {
                println!("   💾 Backup: {}", display_name(backup));
            }
        }
        FileStatus::UpToDate => {
            println!(
                "   {} All indicator columns already exist, nothing to do",
                "✅".green()
            );
        }
        FileStatus::DryRun => {
            println!(
                "   {} Would add {} column(s), {} total",
                "🔍".yellow(),
                report.added_columns.len(),
                report.total_columns()
            );
        }
    }
    println!();
}

fn print_summary(summary: &RunSummary) {
    println!("{}", "═".repeat(60));
    println!("{}", "📋 Summary".bold().green());
    println!("   Files processed: {}", summary.attempted);
    println!("   Succeeded:       {}", summary.succeeded.to_string().green());
    if summary.failed > 0 {
        println!("   Failed:          {}", summary.failed.to_string().red());
        for outcome in summary.files.iter().filter(|o| !o.is_success()) {
            println!("      ❌ {}", display_name(outcome.path()));
        }
    } else {
        println!("   Failed:          {}", summary.failed);
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
