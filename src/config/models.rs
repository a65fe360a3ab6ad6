use crate::encoding::TextEncoding;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// High-level library configuration; deserializable from TOML tables.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Directory holding one folder per book.
    pub storage_root: PathBuf,
    /// Reserved book that can never be deleted and is the fallback on load.
    pub default_book: String,
    pub preferences_path: PathBuf,
    /// Decode attempts for imported files, in priority order.
    pub encodings: Vec<TextEncoding>,
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            storage_root: crate::config::defaults::default_storage_root(),
            default_book: crate::config::defaults::default_book(),
            preferences_path: crate::config::defaults::default_preferences_path(),
            encodings: crate::config::defaults::default_encodings(),
            log_level: crate::config::defaults::default_log_level(),
        }
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
