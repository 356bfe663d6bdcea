use anyhow::{bail, Result};
use demo_ledger::hashing::hash_demo_folder;
use demo_ledger::ledger::Ledger;
use demo_ledger::run::{RunRecord, RunType};
use demo_ledger::submit::{submit_run, Outcome};
use std::cell::RefCell;
use std::collections::HashMap;

/// Ledger kept in memory, one row list per sheet.
#[derive(Default)]
struct MemoryLedger {
    sheets: RefCell<HashMap<String, Vec<Vec<String>>>>,
    appends: RefCell<Vec<(String, Vec<String>)>>,
    fail_reads: bool,
}

impl MemoryLedger {
    fn with_rows(sheet: &str, rows: &[&[&str]]) -> Self {
        let ledger = MemoryLedger::default();
        ledger.sheets.borrow_mut().insert(
            sheet.to_string(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        );
        ledger
    }
}

impl Ledger for MemoryLedger {
    fn fetch_rows(&self, sheet: &str) -> Result<Vec<Vec<String>>> {
        if self.fail_reads {
            bail!("503 Service Unavailable");
        }
        Ok(self.sheets.borrow().get(sheet).cloned().unwrap_or_default())
    }

    fn append_row(&self, sheet: &str, row: &[String]) -> Result<()> {
        self.appends.borrow_mut().push((sheet.to_string(), row.to_vec()));
        self.sheets
            .borrow_mut()
            .entry(sheet.to_string())
            .or_default()
            .push(row.to_vec());
        Ok(())
    }
}

fn record(runner: &str, hashes: &[&str]) -> RunRecord {
    RunRecord {
        runner: runner.into(),
        date: "2025-02-03".into(),
        hashes: hashes.iter().map(|h| h.to_string()).collect(),
    }
}

#[test]
fn empty_ledger_is_submitted_without_comparison() {
    let ledger = MemoryLedger::default();
    let outcome = submit_run(&ledger, RunType::WonScriptless, &record("ann", &["h1"]), false).unwrap();
    assert_eq!(outcome, Outcome::FirstSubmission { appended: true });
    let appends = ledger.appends.borrow();
    assert_eq!(appends.len(), 1);
    assert_eq!(appends[0].0, "WON Scriptless");
    assert_eq!(appends[0].1, vec!["ann", "2025-02-03", "h1"]);
}

#[test]
fn clean_run_is_appended() {
    let ledger = MemoryLedger::with_rows("Steam Scripted", &[&["bo", "2024-12-01", "x1", "x2"]]);
    let outcome = submit_run(&ledger, RunType::SteamScripted, &record("ann", &["h1", "h2"]), false).unwrap();
    assert_eq!(outcome, Outcome::Submitted { appended: true });
    assert_eq!(ledger.sheets.borrow()["Steam Scripted"].len(), 2);
}

#[test]
fn duplicate_demo_blocks_the_append() {
    let ledger = MemoryLedger::with_rows("Other", &[&["bo", "2024-12-01", "x1", "x2"]]);
    let outcome = submit_run(&ledger, RunType::Other, &record("ann", &["h1", "x2"]), false).unwrap();
    match outcome {
        Outcome::Conflicts(conflicts) => {
            assert_eq!(conflicts.len(), 1);
            assert_eq!(conflicts[0].demo, 2);
            assert_eq!(conflicts[0].runner, "bo");
            assert_eq!(conflicts[0].date, "2024-12-01");
        }
        other => panic!("expected conflicts, got {:?}", other),
    }
    assert!(ledger.appends.borrow().is_empty());
}

#[test]
fn run_types_use_separate_sheets() {
    let ledger = MemoryLedger::with_rows("WON Scripted", &[&["bo", "2024-12-01", "x1"]]);
    let outcome = submit_run(&ledger, RunType::WonScriptless, &record("ann", &["x1"]), false).unwrap();
    assert_eq!(outcome, Outcome::FirstSubmission { appended: true });
}

#[test]
fn dry_run_never_appends() {
    let ledger = MemoryLedger::default();
    let outcome = submit_run(&ledger, RunType::Other, &record("ann", &["h1"]), true).unwrap();
    assert_eq!(outcome, Outcome::FirstSubmission { appended: false });
    assert!(ledger.appends.borrow().is_empty());
}

#[test]
fn failed_read_does_not_append() {
    let ledger = MemoryLedger {
        fail_reads: true,
        ..MemoryLedger::default()
    };
    let err = submit_run(&ledger, RunType::Other, &record("ann", &["h1"]), false).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read ledger sheet 'Other'"));
    assert!(ledger.appends.borrow().is_empty());
}

#[test]
fn resubmitting_the_same_folder_conflicts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.dem"), b"first demo").unwrap();
    std::fs::write(dir.path().join("b.dem"), b"second demo").unwrap();
    std::fs::write(dir.path().join("c.txt"), b"notes").unwrap();
    let digests: Vec<String> = hash_demo_folder(dir.path())
        .unwrap()
        .into_iter()
        .map(|h| h.digest)
        .collect();
    assert_eq!(digests.len(), 2);

    let ledger = MemoryLedger::default();
    let first = RunRecord { runner: "ann".into(), date: "2025-01-01".into(), hashes: digests.clone() };
    assert!(submit_run(&ledger, RunType::Other, &first, false).unwrap().appended());

    let again = RunRecord { runner: "cy".into(), date: "2025-01-02".into(), hashes: digests };
    match submit_run(&ledger, RunType::Other, &again, false).unwrap() {
        Outcome::Conflicts(conflicts) => {
            assert_eq!(conflicts.len(), 2);
            assert!(conflicts.iter().all(|c| c.runner == "ann" && c.date == "2025-01-01"));
        }
        other => panic!("expected conflicts, got {:?}", other),
    }
    assert_eq!(ledger.appends.borrow().len(), 1);
}
