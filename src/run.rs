// Run data model: the run types the ledger knows about, the row we append
// for a new run, and the checks performed on user input before any work.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Category of a run. The label doubles as the ledger sheet name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunType {
    #[default]
    WonScriptless,
    WonScripted,
    SteamScriptless,
    SteamScripted,
    Other,
}

impl RunType {
    pub const ALL: [RunType; 5] = [
        RunType::WonScriptless,
        RunType::WonScripted,
        RunType::SteamScriptless,
        RunType::SteamScripted,
        RunType::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RunType::WonScriptless => "WON Scriptless",
            RunType::WonScripted => "WON Scripted",
            RunType::SteamScriptless => "Steam Scriptless",
            RunType::SteamScripted => "Steam Scripted",
            RunType::Other => "Other",
        }
    }

    /// Name of the sheet holding rows of this run type.
    pub fn sheet_name(self) -> &'static str {
        self.label()
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RunType {
    type Err = String;

    /// Accepts the label in any case, with either spaces or dashes
    /// (`"won scriptless"`, `"WON-Scriptless"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', '_'], " ");
        RunType::ALL
            .into_iter()
            .find(|rt| rt.label().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| {
                let known: Vec<&str> = RunType::ALL.iter().map(|rt| rt.label()).collect();
                format!("unknown run type '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

/// A new run as it is written to the ledger: `[runner, date, hash_1, ..]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunRecord {
    pub runner: String,
    pub date: String,
    pub hashes: Vec<String>,
}

impl RunRecord {
    /// Build a record dated today (local time, `YYYY-MM-DD`).
    pub fn today(runner: &str, hashes: Vec<String>) -> Self {
        RunRecord {
            runner: runner.trim().to_string(),
            date: chrono::Local::now().format("%Y-%m-%d").to_string(),
            hashes,
        }
    }

    pub fn to_row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(self.hashes.len() + 2);
        row.push(self.runner.clone());
        row.push(self.date.clone());
        row.extend(self.hashes.iter().cloned());
        row
    }
}

/// Values collected by the run information form.
#[derive(Clone, Debug, Default)]
pub struct RunInfo {
    pub runner: String,
    pub run_type: RunType,
    pub dir: PathBuf,
}

/// Input rejected before any hashing or network work starts.
#[derive(Debug, PartialEq, Eq)]
pub enum ValidationError {
    MissingFields,
    InvalidDirectory(PathBuf),
    NoDemoFiles(PathBuf),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingFields => {
                f.write_str("Please enter a name, time, and directory.")
            }
            ValidationError::InvalidDirectory(_) => {
                f.write_str("Directory to demo files is invalid.")
            }
            ValidationError::NoDemoFiles(dir) => {
                write!(f, "No demo files (.dem) found in {}.", dir.display())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl RunInfo {
    /// Reject an empty runner name or a directory that does not exist.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.runner.trim().is_empty() || self.dir.as_os_str().is_empty() {
            return Err(ValidationError::MissingFields);
        }
        if !self.dir.is_dir() {
            return Err(ValidationError::InvalidDirectory(self.dir.clone()));
        }
        Ok(())
    }
}

/// Directory to pre-fill from a path given on the command line. A file
/// resolves to its parent so a demo can be dropped onto the executable.
pub fn default_dir_from_arg(arg: &Path) -> Option<PathBuf> {
    if arg.is_file() {
        arg.parent().map(Path::to_path_buf)
    } else if arg.is_dir() {
        Some(arg.to_path_buf())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_type_parses_labels_case_insensitively() {
        assert_eq!("won scriptless".parse::<RunType>(), Ok(RunType::WonScriptless));
        assert_eq!("Steam-Scripted".parse::<RunType>(), Ok(RunType::SteamScripted));
        assert_eq!("OTHER".parse::<RunType>(), Ok(RunType::Other));
        assert!("speedrun".parse::<RunType>().is_err());
    }

    #[test]
    fn default_run_type_is_first_choice() {
        assert_eq!(RunType::default(), RunType::ALL[0]);
        assert_eq!(RunType::default().sheet_name(), "WON Scriptless");
    }

    #[test]
    fn row_starts_with_runner_and_date() {
        let record = RunRecord {
            runner: "alice".into(),
            date: "2024-05-01".into(),
            hashes: vec!["aa".into(), "bb".into()],
        };
        assert_eq!(record.to_row(), vec!["alice", "2024-05-01", "aa", "bb"]);
    }

    #[test]
    fn today_uses_iso_date() {
        let record = RunRecord::today("  bob ", vec![]);
        assert_eq!(record.runner, "bob");
        assert!(chrono::NaiveDate::parse_from_str(&record.date, "%Y-%m-%d").is_ok());
    }

    #[test]
    fn empty_runner_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let info = RunInfo {
            runner: "   ".into(),
            run_type: RunType::Other,
            dir: dir.path().to_path_buf(),
        };
        assert_eq!(info.validate(), Err(ValidationError::MissingFields));
    }

    #[test]
    fn missing_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        let info = RunInfo {
            runner: "carol".into(),
            run_type: RunType::Other,
            dir: gone.clone(),
        };
        assert_eq!(info.validate(), Err(ValidationError::InvalidDirectory(gone)));
    }

    #[test]
    fn file_argument_resolves_to_parent() {
        let dir = tempfile::tempdir().unwrap();
        let demo = dir.path().join("run.dem");
        std::fs::write(&demo, b"demo").unwrap();
        assert_eq!(default_dir_from_arg(&demo), Some(dir.path().to_path_buf()));
        assert_eq!(default_dir_from_arg(dir.path()), Some(dir.path().to_path_buf()));
        assert_eq!(default_dir_from_arg(&dir.path().join("missing")), None);
    }
}
