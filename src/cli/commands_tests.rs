use super::*;
use rust_xlsxwriter::Workbook;
use std::fs;
use tempfile::TempDir;

fn create_events_workbook(dir: &TempDir, name: &str, rows: &[[&str; 2]]) -> PathBuf {
    let path = dir.path().join(name);
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Events").unwrap();
    worksheet.write_string(0, 0, "Report Number").unwrap();
    worksheet.write_string(0, 1, "Device Problem 1").unwrap();
    for (i, row) in rows.iter().enumerate() {
        worksheet.write_string(i as u32 + 1, 0, row[0]).unwrap();
        worksheet.write_string(i as u32 + 1, 1, row[1]).unwrap();
    }
    workbook.save(&path).unwrap();
    path
}

fn quiet(dir: &Path) -> RunOptions {
    RunOptions {
        dir: dir.to_path_buf(),
        json: true,
        ..RunOptions::default()
    }
}

// =========================================================================
// Candidate resolution
// =========================================================================

#[test]
fn test_resolve_explicit_file_skips_discovery() {
    let temp_dir = TempDir::new().unwrap();
    let options = RunOptions {
        file: Some(PathBuf::from("elsewhere.xlsx")),
        ..quiet(temp_dir.path())
    };
    let candidates = resolve_candidates(&options, &Config::default()).unwrap();
    assert_eq!(candidates, vec![PathBuf::from("elsewhere.xlsx")]);
}

#[test]
fn test_resolve_uses_configured_marker() {
    let temp_dir = TempDir::new().unwrap();
    create_events_workbook(&temp_dir, "FDA_export.xlsx", &[["1", "Leak"]]);
    create_events_workbook(&temp_dir, "MAUDE_export.xlsx", &[["1", "Leak"]]);

    let config = Config {
        marker: "fda".to_string(),
        ..Config::default()
    };
    let candidates = resolve_candidates(&quiet(temp_dir.path()), &config).unwrap();
    assert_eq!(candidates, vec![temp_dir.path().join("FDA_export.xlsx")]);
}

// =========================================================================
// Batch runs
// =========================================================================

#[test]
fn test_run_empty_directory_does_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let summary = run(&Config::default(), &quiet(temp_dir.path())).unwrap();

    assert_eq!(summary.attempted, 0);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[test]
fn test_run_counts_failures_and_continues() {
    let temp_dir = TempDir::new().unwrap();
    create_events_workbook(&temp_dir, "A_MAUDE.xlsx", &[["1", "Leak"]]);
    fs::write(temp_dir.path().join("B_MAUDE.xlsx"), b"not a workbook").unwrap();

    let summary = run(&Config::default(), &quiet(temp_dir.path())).unwrap();

    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 1);
    assert!(summary.files[0].is_success());
    assert_eq!(summary.files[1].path(), temp_dir.path().join("B_MAUDE.xlsx"));
}

#[test]
fn test_process_files_reports_up_to_date_on_second_pass() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_events_workbook(&temp_dir, "MAUDE.xlsx", &[["1", "Leak"], ["2", "Crack"]]);
    let config = Config::default();

    let first = process_files(&config, std::slice::from_ref(&path), false, |_| {});
    let second = process_files(&config, std::slice::from_ref(&path), false, |_| {});

    match (&first.files[0], &second.files[0]) {
        (FileOutcome::Processed(a), FileOutcome::Processed(b)) => {
            assert_eq!(a.status, FileStatus::Updated);
            assert_eq!(a.added_columns, vec!["Device_Crack", "Device_Leak"]);
            assert_eq!(b.status, FileStatus::UpToDate);
            assert!(b.added_columns.is_empty());
            assert_eq!(b.existing_indicators.len(), 2);
        }
        other => panic!("unexpected outcomes: {:?}", other),
    }
}

#[test]
fn test_process_files_dry_run_leaves_file_alone() {
    let temp_dir = TempDir::new().unwrap();
    let path = create_events_workbook(&temp_dir, "MAUDE.xlsx", &[["1", "Leak"]]);
    let before = fs::read(&path).unwrap();

    let summary = process_files(&Config::default(), std::slice::from_ref(&path), true, |_| {});

    assert_eq!(summary.succeeded, 1);
    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 1);
}

#[test]
fn test_process_files_reports_each_outcome_in_order() {
    let temp_dir = TempDir::new().unwrap();
    let first = create_events_workbook(&temp_dir, "MAUDE_a.xlsx", &[["1", "Leak"]]);
    let missing = temp_dir.path().join("MAUDE_b.xlsx");
    let last = create_events_workbook(&temp_dir, "MAUDE_c.xlsx", &[["1", "Crack"]]);
    let paths = vec![first.clone(), missing.clone(), last.clone()];

    let mut seen = Vec::new();
    let summary = process_files(&Config::default(), &paths, true, |outcome| {
        seen.push((outcome.path().to_path_buf(), outcome.is_success()));
    });

    assert_eq!(seen, vec![(first, true), (missing, false), (last, true)]);
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
}

#[test]
fn test_missing_explicit_file_is_a_failed_outcome() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("MAUDE_missing.xlsx");

    let summary = process_files(&Config::default(), &[path], false, |_| {});

    match &summary.files[0] {
        FileOutcome::Failed { reason, .. } => assert!(reason.contains("File not found")),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[test]
fn test_summary_serializes_outcome_tag() {
    let mut summary = RunSummary::default();
    summary.record(FileOutcome::Failed {
        path: PathBuf::from("x.xlsx"),
        reason: "boom".to_string(),
    });
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["failed"], 1);
    assert_eq!(json["files"][0]["outcome"], "failed");
    assert_eq!(json["files"][0]["reason"], "boom");
}
