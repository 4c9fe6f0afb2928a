// src/config/preferences.rs
//! Preference directory: the interest profile and category list written by
//! the onboarding flow (`interests_summary.json`, `user_preferences.json`,
//! `categories.json`).

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::InterestProfile;

pub const ENV_PREFERENCE_PATH: &str = "PREFERENCE_PATH";
pub const INTERESTS_SUMMARY_FILE: &str = "interests_summary.json";
pub const USER_PREFERENCES_FILE: &str = "user_preferences.json";
pub const CATEGORIES_FILE: &str = "categories.json";
pub const SEEN_FILE: &str = "seen.json";

/// `$PREFERENCE_PATH`, else `~/.cache/arxiveroo`.
pub fn default_preference_dir() -> PathBuf {
    if let Ok(p) = std::env::var(ENV_PREFERENCE_PATH) {
        if !p.trim().is_empty() {
            return PathBuf::from(p);
        }
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".cache").join("arxiveroo")
}

/// A JSON string is used verbatim; any other value is pretty-printed.
pub fn profile_text_from_json(raw: &str) -> Option<String> {
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => serde_json::to_string_pretty(&other).ok(),
    }
}

/// Read a profile file. `.json` files go through `profile_text_from_json`,
/// anything else is plain text.
pub fn read_profile_file(path: &Path) -> Result<InterestProfile, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let text = if is_json {
        profile_text_from_json(&raw).ok_or_else(|| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: "expected a JSON document describing the user's interests".into(),
        })?
    } else {
        raw
    };
    InterestProfile::new(text)
}

/// The summary written after onboarding wins over the raw preference chat.
pub fn load_profile_from_dir(dir: &Path) -> Result<InterestProfile, ConfigError> {
    for name in [INTERESTS_SUMMARY_FILE, USER_PREFERENCES_FILE] {
        let p = dir.join(name);
        if p.is_file() {
            return read_profile_file(&p);
        }
    }
    Err(ConfigError::Io {
        path: dir.join(USER_PREFERENCES_FILE),
        source: std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no interest profile found; set [profile] in the config or create the file",
        ),
    })
}

/// `categories.json` as a trimmed, de-duplicated list. Missing file = empty.
pub fn load_categories(dir: &Path) -> Result<Vec<String>, ConfigError> {
    let p = dir.join(CATEGORIES_FILE);
    if !p.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(&p).map_err(|source| ConfigError::Io {
        path: p.clone(),
        source,
    })?;
    let list: Vec<String> = serde_json::from_str(&raw).map_err(|e| ConfigError::Invalid {
        path: p.clone(),
        reason: e.to_string(),
    })?;
    let mut out: Vec<String> = Vec::new();
    for c in list {
        let c = c.trim();
        if !c.is_empty() && !out.iter().any(|x| x == c) {
            out.push(c.to_string());
        }
    }
    Ok(out)
}
