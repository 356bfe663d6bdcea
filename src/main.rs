// Entrypoint for the CLI application.
// - Keeps `main` small: parse flags, set up logging, and hand over to the
//   check-and-submit flow in `ui`.

use clap::Parser;
use demo_ledger::config::{self, Config};
use demo_ledger::run::{default_dir_from_arg, RunType};
use demo_ledger::ui::{check_and_submit, SubmitOptions};
use std::path::PathBuf;

/// Check recorded demos against the shared run ledger and submit the run.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// A demo file or folder used to pre-fill the directory prompt
    path: Option<PathBuf>,

    /// Runner name (prompted for when omitted)
    #[arg(short, long, env = "DEMO_LEDGER_RUNNER")]
    runner: Option<String>,

    /// Run type, e.g. "WON Scriptless" (prompted for when omitted)
    #[arg(short = 't', long, env = "DEMO_LEDGER_RUN_TYPE")]
    run_type: Option<RunType>,

    /// Directory holding the demo files (prompted for when omitted)
    #[arg(short, long, env = "DEMO_LEDGER_DIR")]
    dir: Option<PathBuf>,

    /// Spreadsheet holding the ledger
    #[arg(long, default_value = config::DEFAULT_SPREADSHEET_ID, env = "DEMO_LEDGER_SPREADSHEET_ID")]
    spreadsheet_id: String,

    /// Cell range read and appended to on each run type's sheet
    #[arg(long, default_value = config::DEFAULT_RANGE, env = "DEMO_LEDGER_RANGE")]
    range: String,

    /// Base URL of the Sheets API
    #[arg(long, default_value = config::DEFAULT_API_BASE, env = "DEMO_LEDGER_API_BASE")]
    api_base: String,

    /// OAuth client secrets file [default: <config dir>/demo-ledger/credentials.json]
    #[arg(long, env = "DEMO_LEDGER_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Token cache file [default: <config dir>/demo-ledger/token.json]
    #[arg(long, env = "DEMO_LEDGER_TOKEN")]
    token: Option<PathBuf>,

    /// Check against the ledger without appending
    #[arg(long, env = "DEMO_LEDGER_DRY_RUN")]
    dry_run: bool,

    /// Print results to the terminal instead of showing dialogs
    #[arg(long, env = "DEMO_LEDGER_NO_GUI")]
    no_gui: bool,

    /// Show additional output (-vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

const RUNTIME_ERROR: i32 = 3;

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let defaults = Config::default();
    let config = Config {
        spreadsheet_id: cli.spreadsheet_id,
        range: cli.range,
        api_base: cli.api_base,
        credentials_path: cli.credentials.unwrap_or(defaults.credentials_path),
        token_path: cli.token.unwrap_or(defaults.token_path),
    };
    log::debug!("{:?}", config);

    let opts = SubmitOptions {
        runner: cli.runner,
        run_type: cli.run_type,
        dir: cli.dir,
        default_dir: cli.path.as_deref().and_then(default_dir_from_arg),
        dry_run: cli.dry_run,
        gui: !cli.no_gui,
    };

    let code = match check_and_submit(&config, opts) {
        Ok(finish) => finish.exit_code(),
        Err(e) => {
            eprintln!("error: {:#}", e);
            RUNTIME_ERROR
        }
    };
    std::process::exit(code);
}
