//! Persistent preference state: the last opened book and a custom storage
//! root.
//!
//! The store receives a [`Preferences`] implementation at construction time
//! instead of reaching for global state. [`FilePreferences`] keeps the values
//! in a tiny TOML file; writes are best-effort and only logged on failure.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub trait Preferences {
    fn last_book(&self) -> Option<String>;
    fn set_last_book(&mut self, name: &str);
    fn storage_root(&self) -> Option<PathBuf>;
    fn set_storage_root(&mut self, root: &Path);
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct PreferenceState {
    #[serde(default)]
    last_book: Option<String>,
    #[serde(default)]
    storage_root: Option<PathBuf>,
}

/// Preferences that live only for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferences {
    state: PreferenceState,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Preferences for MemoryPreferences {
    fn last_book(&self) -> Option<String> {
        self.state.last_book.clone()
    }

    fn set_last_book(&mut self, name: &str) {
        self.state.last_book = Some(name.to_string());
    }

    fn storage_root(&self) -> Option<PathBuf> {
        self.state.storage_root.clone()
    }

    fn set_storage_root(&mut self, root: &Path) {
        self.state.storage_root = Some(root.to_path_buf());
    }
}

/// Preferences persisted to a TOML file on every change.
#[derive(Debug, Clone)]
pub struct FilePreferences {
    path: PathBuf,
    state: PreferenceState,
}

impl FilePreferences {
    /// Read preferences from `path`; a missing or invalid file starts empty.
    pub fn load(path: &Path) -> Self {
        let state = match fs::read_to_string(path) {
            Ok(data) => toml::from_str(&data).unwrap_or_else(|err| {
                warn!(path = %path.display(), "Invalid preferences TOML: {err}");
                PreferenceState::default()
            }),
            Err(_) => PreferenceState::default(),
        };
        debug!(path = %path.display(), last_book = ?state.last_book, "Loaded preferences");
        FilePreferences {
            path: path.to_path_buf(),
            state,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), "Failed to create preferences folder: {err}");
            }
        }
        match toml::to_string(&self.state) {
            Ok(contents) => {
                if let Err(err) = fs::write(&self.path, contents) {
                    warn!(path = %self.path.display(), "Failed to save preferences: {err}");
                }
            }
            Err(err) => warn!("Failed to serialize preferences: {err}"),
        }
    }
}

impl Preferences for FilePreferences {
    fn last_book(&self) -> Option<String> {
        self.state.last_book.clone()
    }

    fn set_last_book(&mut self, name: &str) {
        if self.state.last_book.as_deref() == Some(name) {
            return;
        }
        self.state.last_book = Some(name.to_string());
        self.persist();
    }

    fn storage_root(&self) -> Option<PathBuf> {
        self.state.storage_root.clone()
    }

    fn set_storage_root(&mut self, root: &Path) {
        self.state.storage_root = Some(root.to_path_buf());
        self.persist();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_file(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("wordbook_prefs_{name}_{nanos}/preferences.toml"))
    }

    #[test]
    fn file_preferences_survive_reload() {
        let path = unique_temp_file("reload");
        let mut prefs = FilePreferences::load(&path);
        assert_eq!(prefs.last_book(), None);

        prefs.set_last_book("Travel");
        prefs.set_storage_root(Path::new("/srv/words"));

        let reloaded = FilePreferences::load(&path);
        assert_eq!(reloaded.last_book().as_deref(), Some("Travel"));
        assert_eq!(reloaded.storage_root(), Some(PathBuf::from("/srv/words")));

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn invalid_file_starts_empty() {
        let path = unique_temp_file("invalid");
        fs::create_dir_all(path.parent().expect("parent dir")).expect("create dir");
        fs::write(&path, "last_book = [unclosed").expect("write junk");

        let prefs = FilePreferences::load(&path);
        assert_eq!(prefs.last_book(), None);

        if let Some(dir) = path.parent() {
            let _ = fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn unwritable_location_keeps_values_in_memory() {
        let path = unique_temp_file("blocked");
        let dir = path.parent().expect("parent dir");
        fs::create_dir_all(dir.parent().expect("grandparent dir")).expect("create grandparent");
        fs::write(dir, "a file where the folder should be").expect("write blocker");

        let mut prefs = FilePreferences::load(&path);
        prefs.set_last_book("Travel");
        assert_eq!(prefs.last_book().as_deref(), Some("Travel"));
        assert!(!path.exists());

        let _ = fs::remove_file(dir);
    }

    #[test]
    fn memory_preferences_hold_values() {
        let mut prefs = MemoryPreferences::new();
        prefs.set_last_book("Default");
        assert_eq!(prefs.last_book().as_deref(), Some("Default"));
        assert_eq!(prefs.storage_root(), None);
    }
}
