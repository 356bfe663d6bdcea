// UI layer: the run information form (dialoguer prompts plus a native
// folder picker), progress feedback, and outcome notifications shown as
// native message boxes or plain console lines.

use crate::auth::Authenticator;
use crate::config::Config;
use crate::hashing::{hash_demo_folder_with, DemoHash};
use crate::ledger::SheetsClient;
use crate::run::{RunInfo, RunRecord, RunType, ValidationError};
use crate::submit::{submit_run, Outcome};
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use dialoguer::{Confirm, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use rfd::{FileDialog, MessageButtons, MessageDialog, MessageLevel};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where outcome and validation messages are shown.
pub trait Notifier {
    fn info(&self, title: &str, message: &str);
    fn warning(&self, title: &str, message: &str);
}

/// Native modal message boxes.
pub struct DialogNotifier;

impl Notifier for DialogNotifier {
    fn info(&self, title: &str, message: &str) {
        let _ = MessageDialog::new()
            .set_level(MessageLevel::Info)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }

    fn warning(&self, title: &str, message: &str) {
        let _ = MessageDialog::new()
            .set_level(MessageLevel::Warning)
            .set_title(title)
            .set_description(message)
            .set_buttons(MessageButtons::Ok)
            .show();
    }
}

/// Coloured lines on the terminal, for `--no-gui`.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn info(&self, _title: &str, message: &str) {
        println!("{} {}", "info:".green().bold(), message);
    }

    fn warning(&self, _title: &str, message: &str) {
        println!("{} {}", "warning:".yellow().bold(), message);
    }
}

/// How a run of the tool ended, short of a runtime error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finish {
    /// Submitted, or clean in a dry run.
    Clean,
    Conflicts,
    /// Input failed validation or the form was cancelled.
    Rejected,
}

impl Finish {
    pub fn exit_code(self) -> i32 {
        match self {
            Finish::Clean => 0,
            Finish::Conflicts => 1,
            Finish::Rejected => 2,
        }
    }
}

/// Values supplied on the command line; anything missing is prompted for.
#[derive(Clone, Debug, Default)]
pub struct SubmitOptions {
    pub runner: Option<String>,
    pub run_type: Option<RunType>,
    pub dir: Option<PathBuf>,
    /// Pre-filled directory when `dir` is not given.
    pub default_dir: Option<PathBuf>,
    pub dry_run: bool,
    pub gui: bool,
}

impl SubmitOptions {
    fn is_complete(&self) -> bool {
        self.runner.is_some() && self.run_type.is_some() && self.dir.is_some()
    }
}

fn spinner(msg: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(msg);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn pick_folder(start: Option<&Path>) -> Option<PathBuf> {
    let mut dialog = FileDialog::new().set_title("Choose a directory");
    if let Some(dir) = start.filter(|d| d.is_dir()) {
        dialog = dialog.set_directory(dir);
    }
    dialog.pick_folder()
}

fn prompt_dir(default_dir: Option<&Path>, gui: bool) -> Result<PathBuf> {
    if gui {
        let items = ["Enter path", "Browse..."];
        let choice = Select::new()
            .with_prompt("Demo files directory")
            .items(&items)
            .default(0)
            .interact()?;
        if choice == 1 {
            if let Some(dir) = pick_folder(default_dir) {
                println!("Demo files directory: {}", dir.display());
                return Ok(dir);
            }
        }
    }
    let initial = default_dir
        .map(|d| d.display().to_string())
        .unwrap_or_default();
    let path: String = Input::new()
        .with_prompt("Demo files directory")
        .with_initial_text(initial)
        .allow_empty(true)
        .interact_text()?;
    Ok(PathBuf::from(path.trim()))
}

/// Run information form. Returns `None` when the user cancels.
pub fn prompt_run_info(opts: &SubmitOptions) -> Result<Option<RunInfo>> {
    let runner = match &opts.runner {
        Some(r) => r.clone(),
        None => Input::new()
            .with_prompt("Runner")
            .allow_empty(true)
            .interact_text()?,
    };
    let run_type = match opts.run_type {
        Some(rt) => rt,
        None => {
            let labels: Vec<&str> = RunType::ALL.iter().map(|rt| rt.label()).collect();
            let idx = Select::new()
                .with_prompt("Run type")
                .items(&labels)
                .default(0)
                .interact()?;
            RunType::ALL[idx]
        }
    };
    let dir = match &opts.dir {
        Some(d) => d.clone(),
        None => prompt_dir(opts.default_dir.as_deref(), opts.gui)?,
    };
    if !Confirm::new()
        .with_prompt("Check these demos against the ledger?")
        .default(true)
        .interact()?
    {
        return Ok(None);
    }
    Ok(Some(RunInfo {
        runner,
        run_type,
        dir,
    }))
}

/// Hash the demo folder with a progress bar.
pub fn hash_with_progress(dir: &Path) -> Result<Vec<DemoHash>> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    let hashes = hash_demo_folder_with(dir, |path, done, total| {
        bar.set_length(total as u64);
        bar.set_position(done as u64);
        if let Some(name) = path.file_name() {
            bar.set_message(name.to_string_lossy().into_owned());
        }
    })?;
    bar.finish_and_clear();
    Ok(hashes)
}

/// Show the result of a submission and map it to a `Finish`.
pub fn report_outcome(outcome: &Outcome, dry_run: bool, notifier: &dyn Notifier) -> Finish {
    let suffix = if dry_run { " (dry run: nothing was written)" } else { "" };
    match outcome {
        Outcome::FirstSubmission { .. } => {
            notifier.info(
                "Info",
                &format!("No runs to compare against. Submitting hashes to sheet.{}", suffix),
            );
            Finish::Clean
        }
        Outcome::Submitted { .. } => {
            notifier.info("Info", &format!("No conflicts.{}", suffix));
            Finish::Clean
        }
        Outcome::Conflicts(conflicts) => {
            for c in conflicts {
                notifier.warning("Warning", &c.message());
            }
            Finish::Conflicts
        }
    }
}

fn reject(notifier: &dyn Notifier, err: ValidationError) -> Finish {
    log::info!("run rejected: {:?}", err);
    notifier.warning("Warning", &err.to_string());
    Finish::Rejected
}

/// The whole tool: collect and validate input, hash the demos, then check
/// them against the ledger and submit.
pub fn check_and_submit(config: &Config, opts: SubmitOptions) -> Result<Finish> {
    let notifier: Box<dyn Notifier> = if opts.gui {
        Box::new(DialogNotifier)
    } else {
        Box::new(ConsoleNotifier)
    };

    let info = if opts.is_complete() {
        RunInfo {
            runner: opts.runner.clone().unwrap_or_default(),
            run_type: opts.run_type.unwrap_or_default(),
            dir: opts.dir.clone().unwrap_or_default(),
        }
    } else {
        match prompt_run_info(&opts)? {
            Some(info) => info,
            None => return Ok(Finish::Rejected),
        }
    };

    if let Err(e) = info.validate() {
        return Ok(reject(notifier.as_ref(), e));
    }

    let hashes = hash_with_progress(&info.dir)?;
    if hashes.is_empty() {
        return Ok(reject(notifier.as_ref(), ValidationError::NoDemoFiles(info.dir)));
    }
    for (i, h) in hashes.iter().enumerate() {
        println!("{:>3}  {}  {}", i + 1, h.digest, h.path.display());
    }
    let record = RunRecord::today(&info.runner, hashes.into_iter().map(|h| h.digest).collect());

    let client = reqwest::blocking::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;
    let auth = Authenticator::new(
        client.clone(),
        config.credentials_path.clone(),
        config.token_path.clone(),
    );
    let token = auth.access_token()?;
    let mut sheets = SheetsClient::new(client, config);
    sheets.set_token(&token);

    let progress = spinner("Checking ledger...");
    let outcome = submit_run(&sheets, info.run_type, &record, opts.dry_run);
    progress.finish_and_clear();
    let outcome = outcome?;

    Ok(report_outcome(&outcome, opts.dry_run, notifier.as_ref()))
}
