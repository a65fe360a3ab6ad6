use crate::config::LogLevel;
use crate::encoding::{DEFAULT_PRIORITY, TextEncoding};
use std::path::PathBuf;

pub(crate) fn default_storage_root() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home).join(".wordbook"),
        _ => PathBuf::from("wordbook-data"),
    }
}

pub(crate) fn default_book() -> String {
    "Default".to_string()
}

pub(crate) fn default_preferences_path() -> PathBuf {
    PathBuf::from("conf/preferences.toml")
}

pub(crate) fn default_encodings() -> Vec<TextEncoding> {
    DEFAULT_PRIORITY.to_vec()
}

pub(crate) fn default_encoding_labels() -> Vec<String> {
    DEFAULT_PRIORITY
        .iter()
        .map(|encoding| encoding.label().to_string())
        .collect()
}

pub(crate) fn default_log_level() -> LogLevel {
    LogLevel::Info
}
