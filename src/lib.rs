// Library root
// -----------
// The binary (`main.rs`) parses flags and hands over to `ui`, which runs
// the check-and-submit flow using the modules below.
//
// Module responsibilities:
// - `run`: run types, the ledger row for a new run, input validation.
// - `hashing`: finding `.dem` files and hashing their contents.
// - `auth`: OAuth token cache, refresh and first-run browser consent.
// - `ledger`: the `Ledger` trait and the Sheets API client behind it.
// - `check`: duplicate detection against existing ledger rows.
// - `submit`: fetch, check and conditionally append a run.
// - `ui`: prompts, folder picker, progress and outcome messages.
// - `config`: spreadsheet id, range and credential file locations.
pub mod auth;
pub mod check;
pub mod config;
pub mod hashing;
pub mod ledger;
pub mod run;
pub mod submit;
pub mod ui;
