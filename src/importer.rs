//! Import of foreign word libraries.
//!
//! A library is a folder, a `.zip` archive, or a single delimited file
//! exported by some spreadsheet tool. Headers and encodings vary, so the
//! importer maps header synonyms onto entry fields and decodes with an
//! ordered list of encodings. Referenced media files are copied into the
//! destination media folder.

use crate::archive::{ArchiveExtractor, ZipExtractor, is_archive};
use crate::codec::parse_delimited_with;
use crate::encoding::{TextEncoding, decode_bytes};
use crate::entry::{Entry, non_empty, word_key};
use crate::error::{LibraryError, Result};
use crate::layout::MEDIA_DIR;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const TABULAR_EXTENSIONS: [&str; 2] = ["csv", "tsv"];

static WORD_LIST_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\r\n,;\t]+").expect("word list separator regex is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Column {
    Word,
    Phonetic,
    Translation,
    Meaning,
    MeaningTranslation,
    Example,
    ExampleTranslation,
    Image,
    WordAudio,
    MeaningAudio,
    ExampleAudio,
    Favorite,
    Mistakes,
}

/// Accepted header names per field, lowercase, most specific first.
const SYNONYMS: &[(Column, &[&str])] = &[
    (Column::Word, &["word", "单词", "term", "vocabulary"]),
    (Column::Phonetic, &["phonetic", "音标", "pronunciation"]),
    (Column::Translation, &["translation", "翻译", "释义"]),
    (Column::Meaning, &["meaning", "definition", "英文释义"]),
    (
        Column::MeaningTranslation,
        &["meaningtranslation", "meaning translation", "释义翻译"],
    ),
    (Column::Example, &["example", "例句", "sentence"]),
    (
        Column::ExampleTranslation,
        &["exampletranslation", "example translation", "例句翻译"],
    ),
    (Column::Image, &["localimagepath", "image", "imagename", "图片"]),
    (Column::WordAudio, &["soundpath", "audio", "sound", "单词音频"]),
    (Column::MeaningAudio, &["soundmeaningpath", "meaning audio"]),
    (Column::ExampleAudio, &["soundexamplepath", "example audio"]),
    (Column::Favorite, &["isfavorite", "favorite"]),
    (Column::Mistakes, &["mistakecount", "mistakes"]),
];

/// Outcome of an import with per-file and per-media counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub entries: Vec<Entry>,
    pub files_scanned: usize,
    pub files_failed: usize,
    pub media_copied: usize,
    pub media_missing: usize,
}

pub struct LibraryImporter<E: ArchiveExtractor = ZipExtractor> {
    encodings: Vec<TextEncoding>,
    extractor: E,
}

impl LibraryImporter<ZipExtractor> {
    pub fn new(encodings: Vec<TextEncoding>) -> Self {
        Self::with_extractor(encodings, ZipExtractor)
    }
}

impl<E: ArchiveExtractor> LibraryImporter<E> {
    pub fn with_extractor(encodings: Vec<TextEncoding>, extractor: E) -> Self {
        LibraryImporter {
            encodings,
            extractor,
        }
    }

    /// Import `source` and return the normalized entries. Media references in
    /// the result are bare file names inside `media_dest`.
    pub fn import_library(&self, source: &Path, media_dest: &Path) -> Result<Vec<Entry>> {
        self.import_library_report(source, media_dest)
            .map(|report| report.entries)
    }

    pub fn import_library_report(&self, source: &Path, media_dest: &Path) -> Result<ImportReport> {
        let meta = fs::metadata(source).map_err(|err| LibraryError::from_read(source, err))?;
        info!(source = %source.display(), "Importing library");

        if meta.is_file() && is_archive(source) {
            let temp = tempfile::Builder::new()
                .prefix("wordbook-import-")
                .tempdir()?;
            let result = self
                .extractor
                .extract(source, temp.path())
                .and_then(|()| self.import_tree(temp.path(), temp.path(), media_dest));
            if let Err(err) = temp.close() {
                warn!("Failed to remove extraction directory: {err}");
            }
            return result;
        }

        let collection_root = if meta.is_dir() {
            source
        } else {
            source.parent().unwrap_or(source)
        };
        self.import_tree(source, collection_root, media_dest)
    }

    fn import_tree(
        &self,
        source: &Path,
        collection_root: &Path,
        media_dest: &Path,
    ) -> Result<ImportReport> {
        let files = find_tabular_files(source);
        if files.is_empty() {
            return Err(LibraryError::NoTabularDataFound(source.to_path_buf()));
        }

        let mut report = ImportReport::default();
        for file in files {
            report.files_scanned += 1;
            match self.import_file(&file, collection_root, media_dest, &mut report) {
                Ok(count) => info!(path = %file.display(), count, "Imported file"),
                Err(err) => {
                    report.files_failed += 1;
                    warn!(path = %file.display(), "Skipping unreadable file: {err}");
                }
            }
        }

        if report.entries.is_empty() {
            return Err(LibraryError::EmptyOrInvalid);
        }
        info!(
            entries = report.entries.len(),
            files = report.files_scanned,
            failed = report.files_failed,
            media_copied = report.media_copied,
            media_missing = report.media_missing,
            "Finished import"
        );
        Ok(report)
    }

    fn import_file(
        &self,
        file: &Path,
        collection_root: &Path,
        media_dest: &Path,
        report: &mut ImportReport,
    ) -> Result<usize> {
        let bytes = fs::read(file).map_err(|err| LibraryError::from_read(file, err))?;
        let (text, encoding) =
            decode_bytes(&bytes, &self.encodings).ok_or(LibraryError::EmptyOrInvalid)?;
        debug!(path = %file.display(), %encoding, "Decoded file");

        let separator = if has_extension(file, "tsv") { b'\t' } else { b',' };
        let mut rows = parse_delimited_with(&text, separator).into_iter();
        let header = rows.next().ok_or(LibraryError::EmptyOrInvalid)?;
        let columns = map_columns(&header);
        if !columns.contains_key(&Column::Word) {
            return Err(LibraryError::EmptyOrInvalid);
        }

        let search_dirs = media_search_dirs(collection_root, file);
        let mut count = 0;
        for row in rows {
            let cell = |column: Column| -> String {
                columns
                    .get(&column)
                    .and_then(|&idx| row.get(idx))
                    .map(|value| value.trim().to_string())
                    .unwrap_or_default()
            };
            let word = cell(Column::Word);
            if word.is_empty() {
                continue;
            }

            let translation = non_empty(&cell(Column::Translation));
            let mut meaning = cell(Column::Meaning);
            if meaning.is_empty() {
                meaning = translation.clone().unwrap_or_default();
            }

            let mut media = |column: Column| -> Option<String> {
                let reference = cell(column);
                if reference.is_empty() {
                    return None;
                }
                copy_media(&reference, &search_dirs, media_dest, report)
            };
            let local_image_path = media(Column::Image);
            let sound_path = media(Column::WordAudio);
            let sound_meaning_path = media(Column::MeaningAudio);
            let sound_example_path = media(Column::ExampleAudio);

            report.entries.push(Entry {
                phonetic: non_empty(&cell(Column::Phonetic)),
                translation,
                meaning,
                meaning_translation: non_empty(&cell(Column::MeaningTranslation)),
                example: non_empty(&cell(Column::Example)),
                example_translation: non_empty(&cell(Column::ExampleTranslation)),
                image_name: None,
                local_image_path,
                sound_path,
                sound_meaning_path,
                sound_example_path,
                is_favorite: parse_flag(&cell(Column::Favorite)),
                mistake_count: cell(Column::Mistakes).parse().unwrap_or(0),
                word,
            });
            count += 1;
        }
        Ok(count)
    }
}

/// Split a pasted word list on line breaks, commas, semicolons and tabs.
/// Duplicates (case-insensitive) keep their first occurrence.
pub fn parse_word_list(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    WORD_LIST_SEPARATORS
        .split(text)
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .filter(|word| seen.insert(word_key(word)))
        .map(str::to_string)
        .collect()
}

fn find_tabular_files(source: &Path) -> Vec<PathBuf> {
    if source.is_file() {
        return if is_tabular(source) {
            vec![source.to_path_buf()]
        } else {
            Vec::new()
        };
    }
    let mut files: Vec<PathBuf> = WalkDir::new(source)
        .into_iter()
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            entry.depth() == 0 || !(name.starts_with('.') || name == "__MACOSX")
        })
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_tabular(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

fn is_tabular(path: &Path) -> bool {
    TABULAR_EXTENSIONS
        .iter()
        .any(|ext| has_extension(path, ext))
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

fn normalize_header(name: &str) -> String {
    name.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .to_lowercase()
}

fn map_columns(header: &[String]) -> HashMap<Column, usize> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (idx, name) in header.iter().enumerate() {
        positions.entry(normalize_header(name)).or_insert(idx);
    }
    let mut columns = HashMap::new();
    for (column, names) in SYNONYMS {
        if let Some(&idx) = names.iter().find_map(|name| positions.get(*name)) {
            columns.insert(*column, idx);
        }
    }
    columns
}

fn media_search_dirs(collection_root: &Path, file: &Path) -> Vec<PathBuf> {
    let file_dir = file.parent().unwrap_or(collection_root);
    let mut dirs = Vec::new();
    for dir in [
        collection_root.join(MEDIA_DIR),
        file_dir.join(MEDIA_DIR),
        file_dir.to_path_buf(),
    ] {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    dirs
}

/// Copy a referenced media file into `media_dest`; returns its file name.
fn copy_media(
    reference: &str,
    search_dirs: &[PathBuf],
    media_dest: &Path,
    report: &mut ImportReport,
) -> Option<String> {
    let normalized = reference.replace('\\', "/");
    let file_name = Path::new(&normalized).file_name()?.to_str()?.to_string();

    let Some(source) = search_dirs
        .iter()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
    else {
        debug!(file = %file_name, "Referenced media not found");
        report.media_missing += 1;
        return None;
    };

    let dest = media_dest.join(&file_name);
    if !dest.exists() {
        let copied = fs::create_dir_all(media_dest).and_then(|()| fs::copy(&source, &dest));
        if let Err(err) = copied {
            warn!(path = %source.display(), "Failed to copy media: {err}");
            report.media_missing += 1;
            return None;
        }
        report.media_copied += 1;
    }
    Some(file_name)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}
