//! The vocabulary entry model.
//!
//! An [`Entry`] is identified by its word alone: two entries whose words
//! match after [`word_key`] normalization are the same entry.

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// One vocabulary item plus its media references.
///
/// Path-valued fields hold paths relative to the owning book folder once the
/// store has normalized them (e.g. `media/run_1700000000.png`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Entry {
    pub word: String,
    pub phonetic: Option<String>,
    pub translation: Option<String>,
    pub meaning: String,
    pub meaning_translation: Option<String>,
    pub example: Option<String>,
    pub example_translation: Option<String>,
    /// Reference to an image bundled with the application.
    pub image_name: Option<String>,
    pub local_image_path: Option<String>,
    pub sound_path: Option<String>,
    pub sound_meaning_path: Option<String>,
    pub sound_example_path: Option<String>,
    pub is_favorite: bool,
    pub mistake_count: u32,
}

/// Replacement values for the textual fields of an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextFields {
    pub phonetic: Option<String>,
    pub translation: Option<String>,
    pub meaning: String,
    pub meaning_translation: Option<String>,
    pub example: Option<String>,
    pub example_translation: Option<String>,
}

/// Replacement audio references; `None` leaves the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioPaths {
    pub word: Option<String>,
    pub meaning: Option<String>,
    pub example: Option<String>,
}

impl Entry {
    pub fn new(word: impl Into<String>, meaning: impl Into<String>) -> Self {
        Entry {
            word: word.into(),
            meaning: meaning.into(),
            ..Entry::default()
        }
    }

    /// Normalized identity of this entry.
    pub fn key(&self) -> String {
        word_key(&self.word)
    }

    pub fn matches(&self, word: &str) -> bool {
        self.key() == word_key(word)
    }

    /// The four fields that reference files inside the book folder.
    pub fn media_paths_mut(&mut self) -> [&mut Option<String>; 4] {
        [
            &mut self.local_image_path,
            &mut self.sound_path,
            &mut self.sound_meaning_path,
            &mut self.sound_example_path,
        ]
    }

    pub fn apply_text_fields(&mut self, fields: TextFields) {
        self.phonetic = fields.phonetic;
        self.translation = fields.translation;
        self.meaning = fields.meaning;
        self.meaning_translation = fields.meaning_translation;
        self.example = fields.example;
        self.example_translation = fields.example_translation;
    }

    pub fn apply_audio_paths(&mut self, audio: AudioPaths) {
        if audio.word.is_some() {
            self.sound_path = audio.word;
        }
        if audio.meaning.is_some() {
            self.sound_meaning_path = audio.meaning;
        }
        if audio.example.is_some() {
            self.sound_example_path = audio.example;
        }
    }
}

/// Case-insensitive identity for a word: trimmed, NFC-composed, lowercased.
pub fn word_key(word: &str) -> String {
    word.trim().nfc().collect::<String>().to_lowercase()
}

/// Treat empty strings as unset.
pub(crate) fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
