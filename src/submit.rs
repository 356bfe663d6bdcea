// Submission flow: compare a new run with the ledger and append it when
// none of its demos were submitted before.

use anyhow::{Context, Result};

use crate::check::{find_conflicts, Conflict};
use crate::ledger::Ledger;
use crate::run::{RunRecord, RunType};

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The sheet had no rows; the run was submitted without comparison.
    FirstSubmission { appended: bool },
    /// No demo matched an existing row; the run was submitted.
    Submitted { appended: bool },
    /// At least one demo matched; nothing was written.
    Conflicts(Vec<Conflict>),
}

impl Outcome {
    pub fn appended(&self) -> bool {
        match self {
            Outcome::FirstSubmission { appended } | Outcome::Submitted { appended } => *appended,
            Outcome::Conflicts(_) => false,
        }
    }
}

/// Check `record` against the sheet for `run_type` and append it when
/// clean. With `dry_run` the check runs but nothing is written.
pub fn submit_run<L: Ledger + ?Sized>(
    ledger: &L,
    run_type: RunType,
    record: &RunRecord,
    dry_run: bool,
) -> Result<Outcome> {
    let sheet = run_type.sheet_name();
    let rows = ledger
        .fetch_rows(sheet)
        .with_context(|| format!("Failed to read ledger sheet '{}'", sheet))?;
    log::info!("comparing {} demo(s) against {} ledger row(s)", record.hashes.len(), rows.len());

    let outcome = if rows.is_empty() {
        Outcome::FirstSubmission { appended: !dry_run }
    } else {
        let conflicts = find_conflicts(&record.hashes, &rows);
        if !conflicts.is_empty() {
            for c in &conflicts {
                log::warn!("demo {} ({}) already submitted by {} on {}", c.demo, c.hash, c.runner, c.date);
            }
            return Ok(Outcome::Conflicts(conflicts));
        }
        Outcome::Submitted { appended: !dry_run }
    };

    if outcome.appended() {
        ledger
            .append_row(sheet, &record.to_row())
            .with_context(|| format!("Failed to append run to sheet '{}'", sheet))?;
    }
    Ok(outcome)
}
