// Duplicate detection over the rows already in the ledger.

/// A new demo whose digest is already present in a ledger row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conflict {
    /// 1-based position of the demo in the new run.
    pub demo: usize,
    pub hash: String,
    pub runner: String,
    pub date: String,
}

impl Conflict {
    pub fn message(&self) -> String {
        format!(
            "Submitted demo {} is the same as a demo from {}'s run checked on {}.",
            self.demo, self.runner, self.date
        )
    }
}

fn cell(row: &[String], idx: usize) -> String {
    row.get(idx).cloned().unwrap_or_default()
}

/// For each new hash, report the first ledger row that contains it in any
/// cell. Every duplicated demo yields exactly one conflict.
pub fn find_conflicts(new_hashes: &[String], rows: &[Vec<String>]) -> Vec<Conflict> {
    let mut conflicts = Vec::new();
    for (i, hash) in new_hashes.iter().enumerate() {
        if let Some(row) = rows.iter().find(|row| row.iter().any(|c| c == hash)) {
            conflicts.push(Conflict {
                demo: i + 1,
                hash: hash.clone(),
                runner: cell(row, 0),
                date: cell(row, 1),
            });
        }
    }
    conflicts
}
