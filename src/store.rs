//! The active book: its entries, its data file and its media folder.
//!
//! Every mutation is applied to the in-memory list first and then the whole
//! data file is rewritten. A failed write is logged and returned as
//! [`LibraryError::Persistence`]; the in-memory list stays authoritative for
//! the session either way.
//!
//! The store is not synchronized. Callers must route every mutating call for
//! a book through a single owner.

use crate::codec::{decode, encode};
use crate::entry::{AudioPaths, Entry, TextFields, word_key};
use crate::error::{LibraryError, Result};
use crate::layout::{
    BookLayout, has_separator, is_absolute_like, media_relative, sanitize_file_stem,
    validate_book_name,
};
use crate::prefs::Preferences;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Change notifications for whoever renders the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    BookLoaded(String),
    EntriesChanged,
    BooksChanged,
}

pub type Listener = Box<dyn FnMut(&StoreEvent)>;

/// An entry located by [`CollectionStore::find_across_all_collections`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundEntry {
    pub book: String,
    pub entry: Entry,
}

pub struct CollectionStore {
    layout: BookLayout,
    default_book: String,
    current_book: String,
    entries: Vec<Entry>,
    books: Vec<String>,
    prefs: Box<dyn Preferences>,
    listeners: Vec<Listener>,
}

impl CollectionStore {
    /// Build a store over `root`. Nothing is loaded until [`load`](Self::load).
    pub fn new(
        root: impl Into<PathBuf>,
        default_book: &str,
        prefs: Box<dyn Preferences>,
    ) -> Self {
        let layout = BookLayout::new(root);
        let books = layout.scan_books();
        CollectionStore {
            layout,
            default_book: default_book.to_string(),
            current_book: default_book.to_string(),
            entries: Vec::new(),
            books,
            prefs,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entry(&self, word: &str) -> Option<&Entry> {
        self.position(word).map(|idx| &self.entries[idx])
    }

    pub fn current_book_name(&self) -> &str {
        &self.current_book
    }

    pub fn default_book(&self) -> &str {
        &self.default_book
    }

    pub fn available_books(&self) -> &[String] {
        &self.books
    }

    pub fn storage_root(&self) -> &Path {
        self.layout.root()
    }

    pub fn book_dir(&self) -> PathBuf {
        self.layout.book_dir(&self.current_book)
    }

    pub fn media_dir(&self) -> PathBuf {
        self.layout.media_dir(&self.current_book)
    }

    pub fn data_file_path(&self) -> PathBuf {
        self.layout.data_file(&self.current_book)
    }

    pub fn preferences(&self) -> &dyn Preferences {
        self.prefs.as_ref()
    }

    /// Make `name` the active book.
    ///
    /// A missing or empty data file falls back to the reserved book, which is
    /// created on demand.
    pub fn load(&mut self, name: &str) -> Result<()> {
        let name = validate_book_name(name)?;
        let path = self.layout.data_file(&name);
        match read_book_text(&path)? {
            Some(text) => {
                let entries = decode(&text);
                info!(book = %name, count = entries.len(), "Loaded book");
                self.activate(name, entries);
                Ok(())
            }
            None if name == self.default_book => {
                warn!(book = %name, "Reserved book missing or empty; recreating it");
                self.ensure_book_files(&name)?;
                self.activate(name, Vec::new());
                self.refresh_books();
                Ok(())
            }
            None => {
                warn!(
                    book = %name,
                    fallback = %self.default_book,
                    "Book missing or empty; falling back to reserved book"
                );
                let fallback = self.default_book.clone();
                self.load(&fallback)
            }
        }
    }

    /// Create a book folder with an empty data file and open it.
    pub fn create(&mut self, name: &str) -> Result<()> {
        let name = validate_book_name(name)?;
        self.ensure_book_files(&name)?;
        self.load(&name)?;
        self.refresh_books();
        Ok(())
    }

    /// Remove a book folder. Deleting the active book reopens the reserved one.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let name = validate_book_name(name)?;
        if name == self.default_book {
            return Err(LibraryError::ReservedBook(name));
        }
        let dir = self.layout.book_dir(&name);
        if !dir.exists() {
            return Err(LibraryError::NotFound(dir));
        }
        fs::remove_dir_all(&dir).map_err(|err| LibraryError::persistence(&dir, err))?;
        info!(book = %name, "Deleted book");

        if self.current_book == name {
            let fallback = self.default_book.clone();
            self.load(&fallback)?;
        }
        self.refresh_books();
        Ok(())
    }

    /// Rescan the storage root for books.
    pub fn refresh_books(&mut self) {
        self.books = self.layout.scan_books();
        debug!(count = self.books.len(), "Refreshed book list");
        self.emit(StoreEvent::BooksChanged);
    }

    /// Insert `entry`, replacing any entry with the same word.
    pub fn add_or_update(&mut self, entry: Entry) -> Result<()> {
        check_word(&entry)?;
        self.upsert(entry);
        self.commit()
    }

    /// Merge importer output in one rewrite. Bare media file names are turned
    /// into book-relative `media/` references.
    /// A batch holding an entry without a word is rejected whole.
    pub fn import_entries(&mut self, entries: Vec<Entry>) -> Result<usize> {
        entries.iter().try_for_each(check_word)?;
        let count = entries.len();
        for mut entry in entries {
            for path in entry.media_paths_mut() {
                if let Some(value) = path.as_mut() {
                    if !has_separator(value) && !is_absolute_like(value) {
                        *value = media_relative(value);
                    }
                }
            }
            self.upsert(entry);
        }
        info!(book = %self.current_book, count, "Merged imported entries");
        self.commit()?;
        Ok(count)
    }

    /// Store an entry produced by generation, saving its image if present.
    pub fn save_imported_entry(&mut self, mut entry: Entry, image: Option<&[u8]>) -> Result<()> {
        check_word(&entry)?;
        if let Some(bytes) = image {
            let path = self.write_media_image(&entry.word, bytes)?;
            entry.local_image_path = Some(path);
        }
        self.add_or_update(entry)
    }

    /// Replace the local image of `word`.
    pub fn update_image(&mut self, word: &str, image: &[u8]) -> Result<()> {
        let idx = self.require(word)?;
        if let Some(old) = self.entries[idx].local_image_path.clone() {
            self.remove_media_file(&old);
        }
        let path = self.write_media_image(&self.entries[idx].word.clone(), image)?;
        self.entries[idx].local_image_path = Some(path);
        self.commit()
    }

    /// Overwrite the textual fields of `word` and optionally its audio paths.
    pub fn update_text_fields(
        &mut self,
        word: &str,
        fields: TextFields,
        audio: Option<AudioPaths>,
    ) -> Result<()> {
        let idx = self.require(word)?;
        let entry = &mut self.entries[idx];
        entry.apply_text_fields(fields);
        if let Some(audio) = audio {
            entry.apply_audio_paths(audio);
        }
        self.commit()
    }

    /// Flip the favorite flag; returns the new value.
    pub fn toggle_favorite(&mut self, word: &str) -> Result<bool> {
        let idx = self.require(word)?;
        let entry = &mut self.entries[idx];
        entry.is_favorite = !entry.is_favorite;
        let value = entry.is_favorite;
        self.commit()?;
        Ok(value)
    }

    /// Add to the mistake counter; returns the new count.
    pub fn record_mistake(&mut self, word: &str, increment_by: u32) -> Result<u32> {
        let idx = self.require(word)?;
        let entry = &mut self.entries[idx];
        entry.mistake_count = entry.mistake_count.saturating_add(increment_by);
        let value = entry.mistake_count;
        self.commit()?;
        Ok(value)
    }

    /// Remove entries by position, deleting their local images.
    /// Out-of-range indices are ignored. Returns how many were removed.
    pub fn delete_entries(&mut self, indices: &[usize]) -> Result<usize> {
        let mut indices: Vec<usize> = indices
            .iter()
            .copied()
            .filter(|&idx| idx < self.entries.len())
            .collect();
        indices.sort_unstable();
        indices.dedup();

        for &idx in indices.iter().rev() {
            let removed = self.entries.remove(idx);
            if let Some(image) = removed.local_image_path.as_deref() {
                self.remove_media_file(image);
            }
            debug!(word = %removed.word, "Deleted entry");
        }
        if indices.is_empty() {
            return Ok(0);
        }
        self.commit()?;
        Ok(indices.len())
    }

    /// Resolve a stored path value. Absolute values are legacy and returned
    /// unchanged; everything else is relative to the active book folder.
    pub fn resolve_path(&self, value: &str) -> PathBuf {
        if is_absolute_like(value) {
            PathBuf::from(value)
        } else {
            self.book_dir().join(value)
        }
    }

    /// Look for `word` in the active book, then in every other book on disk.
    /// Other books are read without being activated.
    pub fn find_across_all_collections(&self, word: &str) -> Option<FoundEntry> {
        if let Some(entry) = self.entry(word) {
            return Some(FoundEntry {
                book: self.current_book.clone(),
                entry: entry.clone(),
            });
        }
        let key = word_key(word);
        for book in self.books.iter().filter(|b| **b != self.current_book) {
            let entries = match self.read_book(book) {
                Ok(entries) => entries,
                Err(err) => {
                    debug!(book = %book, "Skipping unreadable book during search: {err}");
                    continue;
                }
            };
            if let Some(entry) = entries.into_iter().find(|e| e.key() == key) {
                return Some(FoundEntry {
                    book: book.clone(),
                    entry,
                });
            }
        }
        None
    }

    /// Decode another book's data file without activating it.
    pub fn read_book(&self, name: &str) -> Result<Vec<Entry>> {
        let name = validate_book_name(name)?;
        let path = self.layout.data_file(&name);
        match read_book_text(&path)? {
            Some(text) => Ok(decode(&text)),
            None => Err(LibraryError::NotFound(path)),
        }
    }

    /// Copy an entry found in another book into the active one, bringing its
    /// media files along so no reference points outside this book.
    pub fn adopt_entry(&mut self, found: FoundEntry) -> Result<()> {
        let FoundEntry { book, mut entry } = found;
        if book != self.current_book {
            let source_dir = self.layout.book_dir(&book);
            let media_dir = self.media_dir();
            fs::create_dir_all(&media_dir)
                .map_err(|err| LibraryError::persistence(&media_dir, err))?;
            for path in entry.media_paths_mut() {
                let Some(value) = path.take() else {
                    continue;
                };
                let source = if is_absolute_like(&value) {
                    PathBuf::from(&value)
                } else {
                    source_dir.join(&value)
                };
                let Some(file_name) = source.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let dest = media_dir.join(file_name);
                if !dest.exists() {
                    if let Err(err) = fs::copy(&source, &dest) {
                        warn!(path = %source.display(), "Media for adopted entry missing: {err}");
                        continue;
                    }
                }
                *path = Some(media_relative(file_name));
            }
            info!(
                word = %entry.word,
                from = %book,
                to = %self.current_book,
                "Adopted entry"
            );
        }
        self.add_or_update(entry)
    }

    /// Move every item of the storage root into `new_root` and reopen the
    /// active book there.
    ///
    /// Roots are compared after canonicalization, so another spelling of the
    /// current root is a no-op. Items are moved one at a time in name order.
    /// If one fails the store still switches to `new_root`, where the items
    /// already moved now live, each item left behind is logged, and the
    /// error is returned. Nothing is rolled back.
    pub fn change_storage_root(&mut self, new_root: &Path) -> Result<()> {
        let old_root = self.layout.root().to_path_buf();
        fs::create_dir_all(new_root).map_err(|err| LibraryError::persistence(new_root, err))?;
        let new_canonical =
            fs::canonicalize(new_root).map_err(|err| LibraryError::from_read(new_root, err))?;
        let old_canonical = fs::canonicalize(&old_root).ok();
        if old_canonical.as_deref() == Some(new_canonical.as_path()) {
            debug!(root = %new_root.display(), "Storage root unchanged");
            return Ok(());
        }

        let moved = match &old_canonical {
            Some(old) if old.is_dir() => move_root_items(old, &new_canonical),
            _ => Ok(()),
        };

        self.layout = BookLayout::new(new_root);
        self.prefs.set_storage_root(new_root);
        self.refresh_books();
        let current = self.current_book.clone();
        match moved {
            Ok(()) => {
                info!(
                    from = %old_root.display(),
                    to = %new_root.display(),
                    "Changed storage root"
                );
                self.load(&current)
            }
            Err(err) => {
                error!(
                    from = %old_root.display(),
                    to = %new_root.display(),
                    "Storage root move stopped part way: {err}"
                );
                if let Err(load_err) = self.load(&current) {
                    warn!(book = %current, "Could not reopen book after partial move: {load_err}");
                }
                Err(err)
            }
        }
    }

    fn activate(&mut self, name: String, entries: Vec<Entry>) {
        self.entries = entries;
        self.prefs.set_last_book(&name);
        self.current_book = name.clone();
        self.emit(StoreEvent::BookLoaded(name));
    }

    fn ensure_book_files(&self, name: &str) -> Result<()> {
        let media = self.layout.media_dir(name);
        fs::create_dir_all(&media).map_err(|err| LibraryError::persistence(&media, err))?;
        let data = self.layout.data_file(name);
        if read_book_text(&data)?.is_none() {
            fs::write(&data, encode(&[])?)
                .map_err(|err| LibraryError::persistence(&data, err))?;
            info!(book = %name, path = %data.display(), "Created book");
        }
        Ok(())
    }

    fn position(&self, word: &str) -> Option<usize> {
        let key = word_key(word);
        self.entries.iter().position(|e| e.key() == key)
    }

    fn require(&self, word: &str) -> Result<usize> {
        self.position(word)
            .ok_or_else(|| LibraryError::UnknownWord(word.to_string()))
    }

    fn upsert(&mut self, entry: Entry) {
        match self.position(&entry.word) {
            Some(idx) => self.entries[idx] = entry,
            None => self.entries.push(entry),
        }
    }

    fn commit(&mut self) -> Result<()> {
        let result = self.save();
        self.emit(StoreEvent::EntriesChanged);
        result
    }

    fn save(&self) -> Result<()> {
        let path = self.data_file_path();
        let contents = encode(&self.entries)?;
        match write_atomically(&path, contents.as_bytes()) {
            Ok(()) => {
                debug!(path = %path.display(), count = self.entries.len(), "Saved book");
                Ok(())
            }
            Err(err) => {
                error!(path = %path.display(), "Failed to save book: {err}");
                Err(LibraryError::persistence(path, err))
            }
        }
    }

    fn write_media_image(&self, word: &str, bytes: &[u8]) -> Result<String> {
        let media = self.media_dir();
        fs::create_dir_all(&media).map_err(|err| LibraryError::persistence(&media, err))?;
        let stem = format!("{}_{}", sanitize_file_stem(word), unix_secs());
        let mut file_name = format!("{stem}.png");
        let mut n = 1;
        while media.join(&file_name).exists() {
            file_name = format!("{stem}_{n}.png");
            n += 1;
        }
        let path = media.join(&file_name);
        fs::write(&path, bytes).map_err(|err| LibraryError::persistence(&path, err))?;
        debug!(path = %path.display(), bytes = bytes.len(), "Wrote media image");
        Ok(media_relative(&file_name))
    }

    fn remove_media_file(&self, value: &str) {
        let path = self.resolve_path(value);
        if let Err(err) = fs::remove_file(&path) {
            warn!(path = %path.display(), "Could not delete media file: {err}");
        }
    }

    fn emit(&mut self, event: StoreEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

fn check_word(entry: &Entry) -> Result<()> {
    if entry.key().is_empty() {
        return Err(LibraryError::InvalidWord(entry.word.clone()));
    }
    Ok(())
}

/// Move the top-level items of `old_root` into `new_root` in name order.
/// Both roots are canonical. On failure the remaining items are logged.
fn move_root_items(old_root: &Path, new_root: &Path) -> Result<()> {
    let mut items: Vec<PathBuf> = fs::read_dir(old_root)
        .map_err(|err| LibraryError::from_read(old_root, err))?
        .flatten()
        .map(|item| item.path())
        .collect();
    items.sort();

    for (idx, source) in items.iter().enumerate() {
        if new_root.starts_with(source) {
            continue;
        }
        let Some(name) = source.file_name() else {
            continue;
        };
        let dest = new_root.join(name);
        if fs::canonicalize(&dest).is_ok_and(|dest| dest == *source) {
            continue;
        }
        if let Err(err) = move_item(source, &dest) {
            for left in &items[idx..] {
                warn!(path = %left.display(), "Left behind in old storage root");
            }
            return Err(err);
        }
        debug!(from = %source.display(), to = %dest.display(), "Moved storage item");
    }
    Ok(())
}

/// `None` when the file is missing or empty.
pub(crate) fn read_book_text(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Ok(None),
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(LibraryError::from_read(path, err)),
    }
}

/// Write through a temporary sibling so a crash never leaves a half file.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// Move a file or folder, replacing whatever sits at `dest`.
pub(crate) fn move_item(source: &Path, dest: &Path) -> Result<()> {
    if dest.is_dir() {
        fs::remove_dir_all(dest).map_err(|err| LibraryError::persistence(dest, err))?;
    } else if dest.exists() {
        fs::remove_file(dest).map_err(|err| LibraryError::persistence(dest, err))?;
    }
    if fs::rename(source, dest).is_ok() {
        return Ok(());
    }
    // Different filesystems: copy, then remove the original.
    copy_recursive(source, dest).map_err(|err| LibraryError::persistence(dest, err))?;
    if source.is_dir() {
        fs::remove_dir_all(source)?;
    } else {
        fs::remove_file(source)?;
    }
    Ok(())
}

fn copy_recursive(source: &Path, dest: &Path) -> io::Result<()> {
    if source.is_file() {
        fs::copy(source, dest)?;
        return Ok(());
    }
    for item in WalkDir::new(source) {
        let item = item.map_err(io::Error::other)?;
        let relative = item
            .path()
            .strip_prefix(source)
            .map_err(io::Error::other)?;
        let target = dest.join(relative);
        if item.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(item.path(), &target)?;
        }
    }
    Ok(())
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
