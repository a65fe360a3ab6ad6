//! Command-line front end for the word library.
//!
//! Kept thin: parse arguments, load `conf/config.toml`, bootstrap the library
//! and run one command.

use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};
use wordbook::config::{AppConfig, DEFAULT_CONFIG_PATH, load_config};
use wordbook::prefs::{FilePreferences, Preferences};
use wordbook::{BookManager, Entry, LibraryImporter, MigrationRunner};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

const USAGE: &str = "Usage: wordbook <books | show [book] | create <book> | delete <book> | import <path> | find <word> | migrate>";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Books,
    Show(Option<String>),
    Create(String),
    Delete(String),
    Import(PathBuf),
    Find(String),
    Migrate,
}

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let command = parse_args(env::args().skip(1))?;
    let config = load_config(Path::new(DEFAULT_CONFIG_PATH));
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        root = %config.storage_root.display(),
        level = %config.log_level,
        "Starting wordbook"
    );

    let prefs = FilePreferences::load(&config.preferences_path);
    if command == Command::Migrate {
        let root = prefs
            .storage_root()
            .unwrap_or_else(|| config.storage_root.clone());
        return migrate(&config, root);
    }

    let mut manager = BookManager::bootstrap(&config, Box::new(prefs))
        .context("Failed to open the word library")?;

    match command {
        Command::Books => {
            for book in manager.available_books() {
                let marker = if book == manager.current_book_name() { "*" } else { " " };
                println!("{marker} {book}");
            }
        }
        Command::Show(book) => {
            if let Some(book) = book {
                manager
                    .switch_to(&book)
                    .with_context(|| format!("Failed to open book {book}"))?;
            }
            println!("# {}", manager.data_file_path().display());
            for entry in manager.store().entries() {
                print_entry(entry);
            }
        }
        Command::Create(book) => {
            manager
                .create_book(&book)
                .with_context(|| format!("Failed to create book {book}"))?;
            println!("Created {}", manager.current_book_name());
        }
        Command::Delete(book) => {
            manager
                .delete_book(&book)
                .with_context(|| format!("Failed to delete book {book}"))?;
            println!("Deleted {book}");
        }
        Command::Import(path) => {
            let importer = LibraryImporter::new(config.encodings.clone());
            let store = manager.store_mut();
            let report = importer
                .import_library_report(&path, &store.media_dir())
                .with_context(|| format!("Failed to import {}", path.display()))?;
            if report.files_failed > 0 || report.media_missing > 0 {
                warn!(
                    files_failed = report.files_failed,
                    media_missing = report.media_missing,
                    "Import finished with skipped items"
                );
            }
            let count = store
                .import_entries(report.entries)
                .context("Failed to save imported entries")?;
            println!("Imported {count} entries into {}", store.current_book_name());
        }
        Command::Find(word) => match manager.store().find_across_all_collections(&word) {
            Some(found) => {
                println!("[{}]", found.book);
                print_entry(&found.entry);
            }
            None => println!("{word}: not found"),
        },
        Command::Migrate => {}
    }
    Ok(())
}

fn migrate(config: &AppConfig, root: PathBuf) -> Result<()> {
    let report = MigrationRunner::new(&root)
        .run()
        .with_context(|| format!("Failed to migrate {}", root.display()))?;
    if config.storage_root != root {
        info!(root = %root.display(), "Using storage root from preferences");
    }
    println!(
        "converted {} legacy, foldered {}, moved {} media, {} failures",
        report.converted_legacy, report.foldered, report.media_moved, report.failures
    );
    Ok(())
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Command> {
    let name = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let command = match name.as_str() {
        "books" => Command::Books,
        "show" => Command::Show(args.next()),
        "create" => Command::Create(required(&mut args, "book name")?),
        "delete" => Command::Delete(required(&mut args, "book name")?),
        "import" => {
            let path = PathBuf::from(required(&mut args, "import path")?);
            if !path.exists() {
                return Err(anyhow!("File not found: {}", path.display()));
            }
            Command::Import(path)
        }
        "find" => Command::Find(required(&mut args, "word")?),
        "migrate" => Command::Migrate,
        other => return Err(anyhow!("Unknown command {other:?}\n{USAGE}")),
    };
    Ok(command)
}

fn required(args: &mut impl Iterator<Item = String>, what: &str) -> Result<String> {
    args.next()
        .ok_or_else(|| anyhow!("Missing {what}\n{USAGE}"))
}

fn print_entry(entry: &Entry) {
    let phonetic = entry.phonetic.as_deref().unwrap_or("");
    let star = if entry.is_favorite { " *" } else { "" };
    println!("{} {phonetic}{star}\t{}", entry.word, entry.meaning);
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.reload(parsed) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_args(args(&["books"])).expect("books"), Command::Books);
        assert_eq!(parse_args(args(&["show"])).expect("show"), Command::Show(None));
        assert_eq!(
            parse_args(args(&["create", "Verbs"])).expect("create"),
            Command::Create("Verbs".to_string())
        );
        assert_eq!(
            parse_args(args(&["find", "hello"])).expect("find"),
            Command::Find("hello".to_string())
        );
    }

    #[test]
    fn rejects_missing_and_unknown_arguments() {
        assert!(parse_args(args(&[])).is_err());
        assert!(parse_args(args(&["delete"])).is_err());
        assert!(parse_args(args(&["frobnicate"])).is_err());
        assert!(parse_args(args(&["import", "/definitely/not/here.zip"])).is_err());
    }
}
