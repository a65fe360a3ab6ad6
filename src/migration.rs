//! Startup upgrade of older storage layouts.
//!
//! Two passes over the files sitting directly in the storage root:
//!
//! 1. `name.json` (entry array) becomes `name.csv` next to it.
//! 2. `name.csv` becomes `name/name.csv` with a `name/media/` folder, and
//!    bare media names that live in the root are moved into that folder.
//!
//! Each file is migrated on its own. The new file is written before the old
//! one is deleted, and an existing target is merged rather than replaced, so
//! an interrupted run is finished by the next one. With nothing left to
//! convert both passes are no-ops.

use crate::codec::{decode, encode};
use crate::entry::Entry;
use crate::error::{LibraryError, Result};
use crate::layout::{
    BookLayout, DATA_EXTENSION, has_separator, is_absolute_like, media_relative,
    validate_book_name,
};
use crate::store::{move_item, read_book_text, write_atomically};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const LEGACY_EXTENSION: &str = "json";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub converted_legacy: usize,
    pub foldered: usize,
    pub media_moved: usize,
    pub failures: usize,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        *self == MigrationReport::default()
    }
}

pub struct MigrationRunner {
    layout: BookLayout,
}

impl MigrationRunner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        MigrationRunner {
            layout: BookLayout::new(root),
        }
    }

    pub fn run(&self) -> Result<MigrationReport> {
        let mut report = MigrationReport::default();
        let root = self.layout.root();
        if !root.is_dir() {
            debug!(root = %root.display(), "No storage root to migrate");
            return Ok(report);
        }

        for legacy in self.root_files(LEGACY_EXTENSION)? {
            match self.convert_legacy(&legacy) {
                Ok(()) => report.converted_legacy += 1,
                Err(err) => {
                    report.failures += 1;
                    warn!(path = %legacy.display(), "Legacy file not converted: {err}");
                }
            }
        }

        for flat in self.root_files(DATA_EXTENSION)? {
            match self.move_into_folder(&flat) {
                Ok(moved) => {
                    report.foldered += 1;
                    report.media_moved += moved;
                }
                Err(err) => {
                    report.failures += 1;
                    warn!(path = %flat.display(), "Flat book not migrated: {err}");
                }
            }
        }

        if report.is_noop() {
            debug!(root = %root.display(), "Storage layout is current");
        } else {
            info!(
                root = %root.display(),
                converted = report.converted_legacy,
                foldered = report.foldered,
                media_moved = report.media_moved,
                failures = report.failures,
                "Migrated storage layout"
            );
        }
        Ok(report)
    }

    fn root_files(&self, extension: &str) -> Result<Vec<PathBuf>> {
        let root = self.layout.root();
        let entries = fs::read_dir(root).map_err(|err| LibraryError::from_read(root, err))?;
        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn convert_legacy(&self, legacy: &Path) -> Result<()> {
        let bytes = fs::read(legacy).map_err(|err| LibraryError::from_read(legacy, err))?;
        let entries: Vec<Entry> = if bytes.iter().all(u8::is_ascii_whitespace) {
            Vec::new()
        } else {
            serde_json::from_slice(&bytes).map_err(|err| {
                debug!(path = %legacy.display(), "Legacy decode failed: {err}");
                LibraryError::EmptyOrInvalid
            })?
        };

        let target = legacy.with_extension(DATA_EXTENSION);
        let merged = merge_into_existing(&target, entries)?;
        write_atomically(&target, encode(&merged)?.as_bytes())
            .map_err(|err| LibraryError::persistence(&target, err))?;
        remove_old(legacy)?;
        info!(
            from = %legacy.display(),
            to = %target.display(),
            count = merged.len(),
            "Converted legacy book"
        );
        Ok(())
    }

    /// Returns the number of media files moved.
    fn move_into_folder(&self, flat: &Path) -> Result<usize> {
        let stem = flat
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or(LibraryError::EmptyOrInvalid)?;
        let name = validate_book_name(stem)?;
        let media_dir = self.layout.media_dir(&name);
        fs::create_dir_all(&media_dir)
            .map_err(|err| LibraryError::persistence(&media_dir, err))?;

        let mut entries = match read_book_text(flat)? {
            Some(text) => decode(&text),
            None => Vec::new(),
        };

        let mut moved = 0;
        for entry in &mut entries {
            for path in entry.media_paths_mut() {
                let Some(value) = path.as_mut() else {
                    continue;
                };
                if has_separator(value) || is_absolute_like(value) {
                    continue;
                }
                let source = self.layout.root().join(value.as_str());
                let dest = media_dir.join(value.as_str());
                if source.is_file() {
                    move_item(&source, &dest)?;
                    debug!(from = %source.display(), to = %dest.display(), "Moved media file");
                    moved += 1;
                } else if !dest.is_file() {
                    continue;
                }
                *value = media_relative(value);
            }
        }

        let target = self.layout.data_file(&name);
        let merged = merge_into_existing(&target, entries)?;
        write_atomically(&target, encode(&merged)?.as_bytes())
            .map_err(|err| LibraryError::persistence(&target, err))?;
        remove_old(flat)?;
        info!(
            book = %name,
            path = %target.display(),
            count = merged.len(),
            "Moved book into its folder"
        );
        Ok(moved)
    }
}

/// Entries already in `target` win; new words are appended in order.
fn merge_into_existing(target: &Path, incoming: Vec<Entry>) -> Result<Vec<Entry>> {
    let mut merged = match read_book_text(target)? {
        Some(text) => decode(&text),
        None => return Ok(incoming),
    };
    let mut seen: HashSet<String> = merged.iter().map(Entry::key).collect();
    for entry in incoming {
        if seen.insert(entry.key()) {
            merged.push(entry);
        }
    }
    Ok(merged)
}

fn remove_old(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|err| LibraryError::persistence(path, err))
}
