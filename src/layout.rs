//! On-disk layout of the storage root.
//!
//! ```text
//! <root>/
//!   <Book>/
//!     <Book>.csv
//!     media/
//! ```

use crate::error::{LibraryError, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const DATA_EXTENSION: &str = "csv";
pub const MEDIA_DIR: &str = "media";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookLayout {
    root: PathBuf,
}

impl BookLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        BookLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn book_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        self.book_dir(name).join(format!("{name}.{DATA_EXTENSION}"))
    }

    pub fn media_dir(&self, name: &str) -> PathBuf {
        self.book_dir(name).join(MEDIA_DIR)
    }

    /// Names of every folder under the root that holds its own data file,
    /// sorted case-insensitively.
    pub fn scan_books(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut books: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| self.data_file(name).is_file())
            .collect();
        books.sort_by(|a, b| {
            a.to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b))
        });
        books
    }
}

/// Trim and check a book name; it doubles as a folder name.
pub fn validate_book_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains(['/', '\\'])
        || trimmed.chars().any(char::is_control)
    {
        return Err(LibraryError::InvalidBookName(name.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Stored path values that should be used as-is rather than resolved
/// against the book folder.
pub fn is_absolute_like(value: &str) -> bool {
    Path::new(value).is_absolute()
        || value.starts_with('/')
        || value.starts_with('\\')
        || value.as_bytes().get(1) == Some(&b':')
}

pub fn has_separator(value: &str) -> bool {
    value.contains(['/', '\\'])
}

/// Book-relative reference for a file in the media folder.
pub fn media_relative(file_name: &str) -> String {
    format!("{MEDIA_DIR}/{file_name}")
}

/// Replace characters that cannot appear in a file name.
pub fn sanitize_file_stem(word: &str) -> String {
    let cleaned: String = word
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        "image".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn paths_follow_book_name() {
        let layout = BookLayout::new("/data");
        assert_eq!(layout.data_file("Travel"), PathBuf::from("/data/Travel/Travel.csv"));
        assert_eq!(layout.media_dir("Travel"), PathBuf::from("/data/Travel/media"));
    }

    #[test]
    fn book_names_reject_path_tricks() {
        assert_eq!(validate_book_name("  Core ").expect("valid"), "Core");
        for bad in ["", "   ", ".", "..", "a/b", "a\\b", "tab\tname"] {
            assert!(validate_book_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn absolute_detection_covers_unix_and_windows() {
        assert!(is_absolute_like("/Users/me/pic.png"));
        assert!(is_absolute_like("C:\\pics\\a.png"));
        assert!(!is_absolute_like("media/a.png"));
        assert!(!is_absolute_like("a.png"));
    }

    #[test]
    fn file_stems_are_sanitized() {
        assert_eq!(sanitize_file_stem("and/or"), "and_or");
        assert_eq!(sanitize_file_stem("what?"), "what_");
        assert_eq!(sanitize_file_stem(".."), "image");
        assert_eq!(sanitize_file_stem("ice cream"), "ice cream");
    }

    #[test]
    fn scan_only_lists_folders_with_data_files() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after epoch")
            .as_nanos();
        let root = std::env::temp_dir().join(format!("wordbook_layout_scan_{nanos}"));
        let layout = BookLayout::new(&root);
        for name in ["beta", "Alpha"] {
            fs::create_dir_all(layout.book_dir(name)).expect("book dir");
            fs::write(layout.data_file(name), "word\n").expect("data file");
        }
        fs::create_dir_all(root.join("stray")).expect("stray dir");
        fs::write(root.join("loose.csv"), "word\n").expect("loose file");

        assert_eq!(layout.scan_books(), vec!["Alpha", "beta"]);

        let _ = fs::remove_dir_all(root);
    }
}
