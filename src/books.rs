//! Startup wiring and book-level operations.

use crate::config::AppConfig;
use crate::error::{LibraryError, Result};
use crate::migration::{MigrationReport, MigrationRunner};
use crate::prefs::Preferences;
use crate::store::CollectionStore;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub struct BookManager {
    store: CollectionStore,
    migration: MigrationReport,
}

impl BookManager {
    /// Resolve the storage root, migrate it, then open the last book.
    ///
    /// The root saved in preferences wins over the configured one. Migration
    /// runs before the store touches anything.
    pub fn bootstrap(config: &AppConfig, prefs: Box<dyn Preferences>) -> Result<Self> {
        let root = prefs
            .storage_root()
            .unwrap_or_else(|| config.storage_root.clone());
        fs::create_dir_all(&root).map_err(|err| LibraryError::persistence(&root, err))?;

        let migration = MigrationRunner::new(&root).run().unwrap_or_else(|err| {
            warn!(root = %root.display(), "Migration skipped: {err}");
            MigrationReport::default()
        });

        let last_book = prefs.last_book();
        let mut store = CollectionStore::new(&root, &config.default_book, prefs);
        store.refresh_books();
        let wanted = last_book.unwrap_or_else(|| config.default_book.clone());
        if let Err(err) = store.load(&wanted) {
            warn!(book = %wanted, "Could not open last book: {err}");
            store.load(&config.default_book)?;
        }
        info!(
            root = %root.display(),
            book = %store.current_book_name(),
            books = store.available_books().len(),
            "Library ready"
        );
        Ok(BookManager { store, migration })
    }

    pub fn switch_to(&mut self, name: &str) -> Result<()> {
        self.store.load(name)
    }

    pub fn create_book(&mut self, name: &str) -> Result<()> {
        self.store.create(name)
    }

    pub fn delete_book(&mut self, name: &str) -> Result<()> {
        self.store.delete(name)
    }

    pub fn available_books(&self) -> &[String] {
        self.store.available_books()
    }

    pub fn current_book_name(&self) -> &str {
        self.store.current_book_name()
    }

    pub fn data_file_path(&self) -> PathBuf {
        self.store.data_file_path()
    }

    pub fn storage_root(&self) -> &Path {
        self.store.storage_root()
    }

    pub fn migration_report(&self) -> &MigrationReport {
        &self.migration
    }

    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut CollectionStore {
        &mut self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::entry::Entry;
    use crate::prefs::MemoryPreferences;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn test_config(name: &str) -> AppConfig {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after epoch")
            .as_nanos();
        AppConfig {
            storage_root: std::env::temp_dir().join(format!("wordbook_books_{name}_{nanos}")),
            ..AppConfig::default()
        }
    }

    #[test]
    fn fresh_root_opens_reserved_book() {
        let config = test_config("fresh");
        let manager = BookManager::bootstrap(&config, Box::new(MemoryPreferences::new()))
            .expect("bootstrap should succeed");

        assert_eq!(manager.current_book_name(), "Default");
        assert_eq!(manager.available_books(), ["Default".to_string()]);
        assert!(manager.data_file_path().is_file());
        assert!(manager.migration_report().is_noop());

        let _ = fs::remove_dir_all(&config.storage_root);
    }

    #[test]
    fn migrates_before_opening_last_book() {
        let config = test_config("migrate");
        fs::create_dir_all(&config.storage_root).expect("root");
        fs::write(
            config.storage_root.join("Travel.csv"),
            encode(&[Entry::new("passport", "travel document")]).expect("encodes"),
        )
        .expect("flat book");
        let mut prefs = MemoryPreferences::new();
        prefs.set_last_book("Travel");

        let manager =
            BookManager::bootstrap(&config, Box::new(prefs)).expect("bootstrap should succeed");

        assert_eq!(manager.migration_report().foldered, 1);
        assert_eq!(manager.current_book_name(), "Travel");
        assert_eq!(manager.store().entries()[0].word, "passport");

        let _ = fs::remove_dir_all(&config.storage_root);
    }

    #[test]
    fn unusable_last_book_falls_back() {
        let config = test_config("fallback");
        let mut prefs = MemoryPreferences::new();
        prefs.set_last_book("../escape");

        let manager =
            BookManager::bootstrap(&config, Box::new(prefs)).expect("bootstrap should succeed");
        assert_eq!(manager.current_book_name(), "Default");

        let _ = fs::remove_dir_all(&config.storage_root);
    }

    #[test]
    fn book_operations_delegate_to_store() {
        let config = test_config("ops");
        let mut manager = BookManager::bootstrap(&config, Box::new(MemoryPreferences::new()))
            .expect("bootstrap should succeed");

        manager.create_book("Verbs").expect("create should succeed");
        assert_eq!(manager.current_book_name(), "Verbs");
        manager.switch_to("Default").expect("switch should succeed");
        manager.delete_book("Verbs").expect("delete should succeed");
        assert_eq!(manager.available_books(), ["Default".to_string()]);
        assert!(matches!(
            manager.delete_book("Default"),
            Err(LibraryError::ReservedBook(_))
        ));

        let _ = fs::remove_dir_all(&config.storage_root);
    }
}
