use super::defaults;
use super::models::{AppConfig, LogLevel};
use crate::encoding::TextEncoding;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    import: ImportConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        let mut encodings = Vec::new();
        for label in &tables.import.encodings {
            match TextEncoding::from_label(label) {
                Some(encoding) if !encodings.contains(&encoding) => encodings.push(encoding),
                Some(_) => {}
                None => warn!(%label, "Ignoring unknown encoding in config"),
            }
        }
        if encodings.is_empty() {
            encodings = defaults::default_encodings();
        }

        let default_book = tables.storage.default_book.trim().to_string();
        AppConfig {
            storage_root: tables.storage.root,
            default_book: if default_book.is_empty() {
                defaults::default_book()
            } else {
                default_book
            },
            preferences_path: tables.storage.preferences_path,
            encodings,
            log_level: tables.logging.log_level,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            storage: StorageConfig {
                root: config.storage_root.clone(),
                default_book: config.default_book.clone(),
                preferences_path: config.preferences_path.clone(),
            },
            import: ImportConfig {
                encodings: config
                    .encodings
                    .iter()
                    .map(|encoding| encoding.label().to_string())
                    .collect(),
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_storage_root")]
    root: PathBuf,
    #[serde(default = "defaults::default_book")]
    default_book: String,
    #[serde(default = "defaults::default_preferences_path")]
    preferences_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            root: defaults::default_storage_root(),
            default_book: defaults::default_book(),
            preferences_path: defaults::default_preferences_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct ImportConfig {
    #[serde(default = "defaults::default_encoding_labels")]
    encodings: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            encodings: defaults::default_encoding_labels(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
