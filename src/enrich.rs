//! Turning a raw word list into full entries.
//!
//! Words already present in some book are reused. Everything else is sent to
//! a [`TextProvider`] and, optionally, an [`ImageProvider`].

use crate::entry::{Entry, TextFields, non_empty};
use crate::error::Result;
use crate::store::CollectionStore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("rate limited by provider")]
    RateLimited,
    #[error("provider rejected credentials")]
    Auth,
    #[error("provider error: {0}")]
    Api(String),
}

/// Structured text returned for one word.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratedText {
    pub phonetic: String,
    pub translation: String,
    pub meaning: String,
    pub meaning_translation: String,
    pub example: String,
    pub example_translation: String,
}

impl From<GeneratedText> for TextFields {
    fn from(text: GeneratedText) -> Self {
        TextFields {
            phonetic: non_empty(&text.phonetic),
            translation: non_empty(&text.translation),
            meaning: text.meaning,
            meaning_translation: non_empty(&text.meaning_translation),
            example: non_empty(&text.example),
            example_translation: non_empty(&text.example_translation),
        }
    }
}

pub trait TextProvider {
    fn generate(&self, word: &str) -> std::result::Result<GeneratedText, ProviderError>;
}

pub trait ImageProvider {
    /// Raw image bytes for `context`, or `None` when nothing was produced.
    fn generate(&self, context: &str) -> std::result::Result<Option<Vec<u8>>, ProviderError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichReport {
    pub added: usize,
    pub reused: usize,
    pub failed: usize,
}

/// Add every word in `words` to the active book.
///
/// Provider failures are counted per word. A rate limit stops the batch and
/// keeps what was already saved. Store errors are returned.
pub fn enrich_words(
    store: &mut CollectionStore,
    words: &[String],
    text: &dyn TextProvider,
    image: Option<&dyn ImageProvider>,
) -> Result<EnrichReport> {
    let mut report = EnrichReport::default();
    for word in words {
        if store.entry(word).is_some() {
            report.reused += 1;
            continue;
        }
        if let Some(found) = store.find_across_all_collections(word) {
            store.adopt_entry(found)?;
            report.reused += 1;
            continue;
        }

        let generated = match text.generate(word) {
            Ok(generated) => generated,
            Err(ProviderError::RateLimited) => {
                warn!(word = %word, "Rate limited; stopping enrichment");
                report.failed += 1;
                break;
            }
            Err(err) => {
                warn!(word = %word, "Text generation failed: {err}");
                report.failed += 1;
                continue;
            }
        };

        let mut entry = Entry::new(word.as_str(), "");
        entry.apply_text_fields(generated.into());

        let bytes = match image {
            Some(provider) => {
                let context = entry.example.clone().unwrap_or_else(|| entry.meaning.clone());
                match provider.generate(&format!("{word}: {context}")) {
                    Ok(bytes) => bytes,
                    Err(err) => {
                        warn!(word = %word, "Image generation failed: {err}");
                        None
                    }
                }
            }
            None => None,
        };

        store.save_imported_entry(entry, bytes.as_deref())?;
        report.added += 1;
    }
    info!(
        book = %store.current_book_name(),
        added = report.added,
        reused = report.reused,
        failed = report.failed,
        "Enriched word list"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::MemoryPreferences;
    use std::cell::Cell;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_root(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("wordbook_enrich_{name}_{nanos}"))
    }

    struct ScriptedText {
        calls: Cell<usize>,
        rate_limit_after: Option<usize>,
    }

    impl TextProvider for ScriptedText {
        fn generate(&self, word: &str) -> std::result::Result<GeneratedText, ProviderError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            if self.rate_limit_after == Some(call) {
                return Err(ProviderError::RateLimited);
            }
            if word == "broken" {
                return Err(ProviderError::Api("bad word".to_string()));
            }
            Ok(GeneratedText {
                meaning: format!("meaning of {word}"),
                example: format!("I like {word}."),
                ..GeneratedText::default()
            })
        }
    }

    struct FixedImage;

    impl ImageProvider for FixedImage {
        fn generate(&self, _context: &str) -> std::result::Result<Option<Vec<u8>>, ProviderError> {
            Ok(Some(b"png-bytes".to_vec()))
        }
    }

    fn open_store(root: &Path) -> CollectionStore {
        let mut store = CollectionStore::new(root, "Default", Box::new(MemoryPreferences::new()));
        store.load("Default").expect("default book should open");
        store
    }

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn new_words_are_generated_with_images() {
        let root = unique_temp_root("generate");
        let mut store = open_store(&root);
        let text = ScriptedText {
            calls: Cell::new(0),
            rate_limit_after: None,
        };

        let image: &dyn ImageProvider = &FixedImage;
        let report = enrich_words(&mut store, &words(&["tea", "broken"]), &text, Some(image))
            .expect("enrichment should succeed");

        assert_eq!(report, EnrichReport { added: 1, reused: 0, failed: 1 });
        let entry = store.entry("tea").expect("tea was added");
        assert_eq!(entry.meaning, "meaning of tea");
        assert_eq!(entry.example.as_deref(), Some("I like tea."));
        assert_eq!(entry.translation, None);
        let image = entry.local_image_path.clone().expect("image saved");
        assert_eq!(fs::read(store.resolve_path(&image)).expect("image file"), b"png-bytes");

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn known_words_are_reused_from_any_book() {
        let root = unique_temp_root("reuse");
        let mut store = open_store(&root);
        store.create("Other").expect("create other book");
        store.add_or_update(Entry::new("coffee", "a drink")).expect("add coffee");
        store.load("Default").expect("back to default");
        store.add_or_update(Entry::new("milk", "white")).expect("add milk");

        let text = ScriptedText {
            calls: Cell::new(0),
            rate_limit_after: None,
        };
        let report = enrich_words(&mut store, &words(&["Coffee", "milk"]), &text, None)
            .expect("enrichment should succeed");

        assert_eq!(report.reused, 2);
        assert_eq!(text.calls.get(), 0);
        assert_eq!(store.entry("coffee").expect("adopted").meaning, "a drink");

        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn rate_limit_stops_the_batch() {
        let root = unique_temp_root("rate_limit");
        let mut store = open_store(&root);
        let text = ScriptedText {
            calls: Cell::new(0),
            rate_limit_after: Some(1),
        };

        let report = enrich_words(&mut store, &words(&["one", "two", "three"]), &text, None)
            .expect("enrichment should succeed");

        assert_eq!(report, EnrichReport { added: 1, reused: 0, failed: 1 });
        assert!(store.entry("three").is_none());

        let _ = fs::remove_dir_all(root);
    }
}
