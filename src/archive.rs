//! Archive extraction for imported libraries.

use crate::error::{LibraryError, Result};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Unpacks an archive into a destination directory.
pub trait ArchiveExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// In-process zip extraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let file = fs::File::open(archive).map_err(|err| LibraryError::from_read(archive, err))?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|err| LibraryError::ExternalTool(format!("{}: {err}", archive.display())))?;

        let mut written = 0usize;
        for i in 0..zip.len() {
            let mut item = zip
                .by_index(i)
                .map_err(|err| LibraryError::ExternalTool(err.to_string()))?;
            let Some(relative) = item.enclosed_name() else {
                continue;
            };
            if relative.starts_with("__MACOSX") {
                continue;
            }
            let out_path = dest.join(relative);
            if item.is_dir() {
                fs::create_dir_all(&out_path)?;
                continue;
            }
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = fs::File::create(&out_path)?;
            io::copy(&mut item, &mut out)
                .map_err(|err| LibraryError::ExternalTool(err.to_string()))?;
            written += 1;
        }
        debug!(archive = %archive.display(), files = written, "Extracted archive");
        Ok(())
    }
}

pub fn is_archive(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase()),
        Some(ext) if ext == "zip"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::{SystemTime, UNIX_EPOCH};
    use zip::write::SimpleFileOptions;

    fn unique_temp_dir(name: &str) -> std::path::PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("wordbook_archive_{name}_{nanos}"))
    }

    #[test]
    fn extracts_nested_files_and_skips_mac_metadata() {
        let dir = unique_temp_dir("extract");
        fs::create_dir_all(&dir).expect("temp dir should be created");
        let archive = dir.join("lib.zip");
        {
            let file = fs::File::create(&archive).expect("zip file should be created");
            let mut zip = zip::ZipWriter::new(file);
            let options = SimpleFileOptions::default();
            zip.start_file("lib/words.csv", options).expect("start csv");
            zip.write_all(b"Word,Meaning\nhello,a greeting\n")
                .expect("write csv");
            zip.start_file("__MACOSX/lib/._words.csv", options)
                .expect("start metadata");
            zip.write_all(b"junk").expect("write metadata");
            zip.finish().expect("finish zip");
        }

        let dest = dir.join("out");
        ZipExtractor
            .extract(&archive, &dest)
            .expect("extraction should succeed");

        let csv = fs::read_to_string(dest.join("lib/words.csv")).expect("csv extracted");
        assert!(csv.starts_with("Word,Meaning"));
        assert!(!dest.join("__MACOSX").exists());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn corrupt_archive_is_an_external_tool_error() {
        let dir = unique_temp_dir("corrupt");
        fs::create_dir_all(&dir).expect("temp dir should be created");
        let archive = dir.join("bad.zip");
        fs::write(&archive, b"definitely not a zip").expect("write bad zip");

        let err = ZipExtractor
            .extract(&archive, &dir.join("out"))
            .expect_err("corrupt archive should fail");
        assert!(matches!(err, LibraryError::ExternalTool(_)));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn archive_detection_is_case_insensitive() {
        assert!(is_archive(Path::new("/tmp/Library.ZIP")));
        assert!(!is_archive(Path::new("/tmp/words.csv")));
    }
}
