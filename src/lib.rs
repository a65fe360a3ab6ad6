//! Word-library persistence and import.
//!
//! A storage root holds one folder per book (`<Book>/<Book>.csv` plus a
//! `media/` folder). [`CollectionStore`] owns the active book,
//! [`LibraryImporter`] turns foreign libraries into entries,
//! [`MigrationRunner`] upgrades older layouts at startup and [`BookManager`]
//! wires them together.

pub mod archive;
pub mod books;
pub mod codec;
pub mod config;
pub mod encoding;
pub mod enrich;
pub mod entry;
pub mod error;
pub mod importer;
pub mod layout;
pub mod migration;
pub mod prefs;
pub mod store;

pub use books::BookManager;
pub use entry::{AudioPaths, Entry, TextFields};
pub use error::{LibraryError, Result};
pub use importer::{ImportReport, LibraryImporter, parse_word_list};
pub use migration::{MigrationReport, MigrationRunner};
pub use store::{CollectionStore, FoundEntry, StoreEvent};
