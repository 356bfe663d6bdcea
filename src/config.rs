// Runtime configuration: which spreadsheet to talk to and where the OAuth
// files live. The binary fills this from command-line flags and
// `DEMO_LEDGER_*` environment variables.

use std::path::PathBuf;

pub const DEFAULT_SPREADSHEET_ID: &str = "1aHA6yjXxiYmiJkPLHyKPt8Hv2V0auiqO9vgSg9JEuZg";
pub const DEFAULT_RANGE: &str = "A2:ZZZ100000";
pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

const APP_DIR: &str = "demo-ledger";

#[derive(Clone, Debug)]
pub struct Config {
    pub spreadsheet_id: String,
    /// Cell range read and appended to on each run type's sheet.
    pub range: String,
    pub api_base: String,
    /// OAuth client secrets downloaded from the Google Cloud console.
    pub credentials_path: PathBuf,
    /// Cached access/refresh tokens, written after consent or refresh.
    pub token_path: PathBuf,
}

/// `<user config dir>/demo-ledger`, or the current directory when the
/// platform has no config dir.
pub fn app_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for Config {
    fn default() -> Self {
        let dir = app_dir();
        Config {
            spreadsheet_id: DEFAULT_SPREADSHEET_ID.into(),
            range: DEFAULT_RANGE.into(),
            api_base: DEFAULT_API_BASE.into(),
            credentials_path: dir.join("credentials.json"),
            token_path: dir.join("token.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_shared_ledger() {
        let cfg = Config::default();
        assert_eq!(cfg.spreadsheet_id, DEFAULT_SPREADSHEET_ID);
        assert_eq!(cfg.range, "A2:ZZZ100000");
        assert!(cfg.token_path.ends_with("token.json"));
        assert_eq!(cfg.credentials_path.parent(), cfg.token_path.parent());
    }
}
