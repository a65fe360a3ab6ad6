use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use wordbook::codec::{decode, encode};
use wordbook::config::AppConfig;
use wordbook::encoding::DEFAULT_PRIORITY;
use wordbook::prefs::MemoryPreferences;
use wordbook::{BookManager, CollectionStore, Entry, LibraryImporter, MigrationRunner};
use zip::write::SimpleFileOptions;

fn unique_temp_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock should be after epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("wordbook_it_{name}_{nanos}"));
    fs::create_dir_all(&dir).expect("temp dir should be created");
    dir
}

fn open_store(root: &Path) -> CollectionStore {
    let mut store = CollectionStore::new(root, "Default", Box::new(MemoryPreferences::new()));
    store.load("Default").expect("default book should open");
    store
}

#[test]
fn tricky_fields_survive_a_save_and_reload() {
    let root = unique_temp_dir("roundtrip");
    let mut store = open_store(&root);
    let mut entry = Entry::new("quote", "say \"hi\", then\nleave");
    entry.example = Some("a,b\r\nc".to_string());
    entry.is_favorite = true;
    entry.mistake_count = 3;
    store.add_or_update(entry.clone()).expect("add should persist");

    let reopened = open_store(&root);
    assert_eq!(reopened.entries(), [entry]);

    let _ = fs::remove_dir_all(root);
}

#[test]
fn created_book_reloads_empty_with_header_only_file() {
    let root = unique_temp_dir("create_default");
    let mut store = CollectionStore::new(&root, "Default", Box::new(MemoryPreferences::new()));
    store.create("Default").expect("create should succeed");
    store.load("Default").expect("load should succeed");

    assert!(store.entries().is_empty());
    let text = fs::read_to_string(store.data_file_path()).expect("data file");
    assert_eq!(text.lines().count(), 1);
    assert_eq!(text, encode(&[]).expect("header encodes"));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn directory_import_lands_in_the_active_book() {
    let dir = unique_temp_dir("dir_import");
    let source = dir.join("library");
    fs::create_dir_all(&source).expect("library dir");
    fs::write(source.join("words.csv"), "Word,Meaning\nhello,a greeting\n").expect("csv");

    let mut store = open_store(&dir.join("root"));
    let entries = LibraryImporter::new(DEFAULT_PRIORITY.to_vec())
        .import_library(&source, &store.media_dir())
        .expect("import should succeed");
    assert_eq!(entries, vec![Entry::new("hello", "a greeting")]);

    store.import_entries(entries).expect("merge should persist");
    let on_disk = decode(&fs::read_to_string(store.data_file_path()).expect("data file"));
    assert_eq!(on_disk, vec![Entry::new("hello", "a greeting")]);

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn zip_import_copies_media_and_merges_case_insensitively() {
    let dir = unique_temp_dir("zip_import");
    let archive = dir.join("library.zip");
    {
        let file = fs::File::create(&archive).expect("zip file");
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        zip.start_file("deck/cards.csv", options).expect("start csv");
        zip.write_all("单词,释义,图片\nRun,跑,run.png\n".as_bytes())
            .expect("write csv");
        zip.start_file("deck/media/run.png", options).expect("start image");
        zip.write_all(b"image-bytes").expect("write image");
        zip.finish().expect("finish zip");
    }

    let mut store = open_store(&dir.join("root"));
    store
        .add_or_update(Entry::new("run", "old meaning"))
        .expect("seed entry");

    let entries = LibraryImporter::new(DEFAULT_PRIORITY.to_vec())
        .import_library(&archive, &store.media_dir())
        .expect("zip import should succeed");
    store.import_entries(entries).expect("merge should persist");

    assert_eq!(store.entries().len(), 1);
    let entry = &store.entries()[0];
    assert_eq!(entry.word, "Run");
    assert_eq!(entry.meaning, "跑");
    assert_eq!(entry.local_image_path.as_deref(), Some("media/run.png"));
    let image = store.resolve_path("media/run.png");
    assert_eq!(fs::read(image).expect("image copied"), b"image-bytes");

    let _ = fs::remove_dir_all(dir);
}

#[test]
fn flat_layout_is_migrated_once_and_opened() {
    let dir = unique_temp_dir("migrate");
    let root = dir.join("root");
    fs::create_dir_all(&root).expect("root");
    fs::write(root.join("foo.png"), b"foo").expect("media");
    let mut entry = Entry::new("foo", "a thing");
    entry.local_image_path = Some("foo.png".to_string());
    fs::write(root.join("Things.csv"), encode(&[entry]).expect("encodes")).expect("flat book");

    let config = AppConfig {
        storage_root: root.clone(),
        ..AppConfig::default()
    };
    let mut prefs = MemoryPreferences::new();
    wordbook::prefs::Preferences::set_last_book(&mut prefs, "Things");
    let manager = BookManager::bootstrap(&config, Box::new(prefs)).expect("bootstrap");

    assert_eq!(manager.current_book_name(), "Things");
    let opened = &manager.store().entries()[0];
    assert_eq!(opened.local_image_path.as_deref(), Some("media/foo.png"));
    assert!(root.join("Things/media/foo.png").is_file());
    assert!(!root.join("foo.png").exists());

    let before = fs::read_to_string(root.join("Things/Things.csv")).expect("book");
    let again = MigrationRunner::new(&root).run().expect("second run");
    assert!(again.is_noop());
    let after = fs::read_to_string(root.join("Things/Things.csv")).expect("book");
    assert_eq!(before, after);

    let _ = fs::remove_dir_all(dir);
}
