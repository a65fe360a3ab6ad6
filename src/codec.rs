//! Delimited-text codec for book files.
//!
//! A book file is one header row naming every column in [`HEADER`] order,
//! then one comma-separated row per entry. Fields containing the separator,
//! a double quote, or a line break are quote-wrapped with inner quotes
//! doubled. Reading is tolerant: an unterminated quote consumes the rest of
//! the input instead of failing.

use crate::entry::{Entry, non_empty};
use crate::error::Result;
use csv::{QuoteStyle, ReaderBuilder, Terminator, WriterBuilder};
use std::collections::HashMap;
use std::io;
use tracing::debug;

pub const HEADER: [&str; 14] = [
    "word",
    "phonetic",
    "translation",
    "meaning",
    "meaningTranslation",
    "example",
    "exampleTranslation",
    "imageName",
    "localImagePath",
    "soundPath",
    "soundMeaningPath",
    "soundExamplePath",
    "isFavorite",
    "mistakeCount",
];

/// Serialize entries into book-file text, header first.
pub fn encode(entries: &[Entry]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(HEADER)?;
    for entry in entries {
        let mistakes = entry.mistake_count.to_string();
        writer.write_record([
            entry.word.as_str(),
            opt(&entry.phonetic),
            opt(&entry.translation),
            entry.meaning.as_str(),
            opt(&entry.meaning_translation),
            opt(&entry.example),
            opt(&entry.example_translation),
            opt(&entry.image_name),
            opt(&entry.local_image_path),
            opt(&entry.sound_path),
            opt(&entry.sound_meaning_path),
            opt(&entry.sound_example_path),
            if entry.is_favorite { "true" } else { "false" },
            mistakes.as_str(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| io::Error::other(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err).into())
}

/// Deserialize book-file text. Rows without a word are skipped.
pub fn decode(text: &str) -> Vec<Entry> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut rows = parse_delimited(text).into_iter();
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let columns: HashMap<&str, usize> = header
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();

    let mut entries = Vec::new();
    for row in rows {
        if row.iter().all(|field| field.is_empty()) {
            continue;
        }
        let field = |name: &str| column(&row, &columns, name).to_string();
        let word = field("word");
        if word.is_empty() {
            continue;
        }
        entries.push(Entry {
            word,
            phonetic: non_empty(&field("phonetic")),
            translation: non_empty(&field("translation")),
            meaning: field("meaning"),
            meaning_translation: non_empty(&field("meaningTranslation")),
            example: non_empty(&field("example")),
            example_translation: non_empty(&field("exampleTranslation")),
            image_name: non_empty(&field("imageName")),
            local_image_path: non_empty(&field("localImagePath")),
            sound_path: non_empty(&field("soundPath")),
            sound_meaning_path: non_empty(&field("soundMeaningPath")),
            sound_example_path: non_empty(&field("soundExamplePath")),
            is_favorite: field("isFavorite") == "true",
            mistake_count: field("mistakeCount").trim().parse().unwrap_or(0),
        });
    }
    entries
}

/// Split comma-separated text into rows of fields.
pub fn parse_delimited(text: &str) -> Vec<Vec<String>> {
    parse_delimited_with(text, b',')
}

/// Split delimited text into rows of fields using `separator`.
///
/// LF, CR and CRLF all terminate a row outside quotes and blank lines yield
/// no row. A quote only opens a quoted field at the start of the field;
/// elsewhere it is kept as a literal character.
pub fn parse_delimited_with(text: &str, separator: u8) -> Vec<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(separator)
        .from_reader(text.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        match record {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            Err(err) => {
                debug!("Stopping at unreadable row: {err}");
                break;
            }
        }
    }
    rows
}

fn column<'a>(row: &'a [String], columns: &HashMap<&str, usize>, name: &str) -> &'a str {
    columns
        .get(name)
        .and_then(|&idx| row.get(idx))
        .map(String::as_str)
        .unwrap_or("")
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}
