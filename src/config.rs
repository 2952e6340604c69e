//! Operator configuration.
//!
//! File config lives at `~/.chattertracker/config.json`; CLI flags take
//! precedence over file values. The resolved result is immutable and
//! passed by reference into the engine.

use std::path::PathBuf;

use serde::Deserialize;

/// Characters of body text kept per email.
pub const DEFAULT_BODY_CHAR_LIMIT: usize = 200;
pub const DEFAULT_LOG_SHEET: &str = "Email Summary";
pub const DEFAULT_ROSTER_SHEET: &str = "Student Info";

/// On-disk configuration. Every field is optional so CLI flags can fill
/// the gaps.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    pub spreadsheet_id: Option<String>,
    pub log_sheet: Option<String>,
    pub roster_sheet: Option<String>,
    pub teacher_email: Option<String>,
    pub body_char_limit: Option<usize>,
}

/// CLI flag values layered on top of the file config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub spreadsheet_id: Option<String>,
    pub log_sheet: Option<String>,
    pub roster_sheet: Option<String>,
    pub teacher_email: Option<String>,
}

/// Fully-resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct Config {
    /// Google Sheet ID (the token between /d/ and /edit in the sheet URL).
    pub spreadsheet_id: String,
    /// Sheet holding the email log.
    pub log_sheet: String,
    /// Sheet holding the student roster in column A.
    pub roster_sheet: String,
    /// Teacher identity used for direction classification.
    pub teacher_email: String,
    pub body_char_limit: usize,
}

pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".chattertracker")
        .join("config.json")
}

/// Load the config file. A missing file is fine (flags may cover
/// everything); a malformed one is an error so typos don't silently drop
/// settings.
pub fn load_file_config() -> Result<FileConfig, String> {
    let path = config_path();
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

/// Merge file config and CLI overrides into a complete [`Config`].
pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Config, String> {
    let spreadsheet_id = overrides
        .spreadsheet_id
        .or(file.spreadsheet_id)
        .ok_or_else(|| missing("spreadsheetId", "--spreadsheet-id"))?;
    let teacher_email = overrides
        .teacher_email
        .or(file.teacher_email)
        .ok_or_else(|| missing("teacherEmail", "--teacher-email"))?;

    Ok(Config {
        spreadsheet_id,
        log_sheet: overrides
            .log_sheet
            .or(file.log_sheet)
            .unwrap_or_else(|| DEFAULT_LOG_SHEET.to_string()),
        roster_sheet: overrides
            .roster_sheet
            .or(file.roster_sheet)
            .unwrap_or_else(|| DEFAULT_ROSTER_SHEET.to_string()),
        teacher_email,
        body_char_limit: file.body_char_limit.unwrap_or(DEFAULT_BODY_CHAR_LIMIT),
    })
}

fn missing(key: &str, flag: &str) -> String {
    format!(
        "Missing {}. Set it in {} or pass {}.",
        key,
        config_path().display(),
        flag
    )
}
