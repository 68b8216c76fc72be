//! Archive ingestion: a directory tree or a `.zip` of front-end sources.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use tra_core::code::model::SkippedFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Source file extensions the parser looks at.
const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// One loaded source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Archive-relative path with forward slashes.
    pub path: String,
    pub content: String,
}

fn is_source_path(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| SOURCE_EXTENSIONS.contains(&e))
        .unwrap_or(false)
}

/// Load all source files from a directory or zip archive.
///
/// A missing or malformed archive yields an empty file list; unreadable
/// entries are skipped with a reason. Files come back sorted by path so the
/// parse output is deterministic.
pub fn load_archive(path: &Path) -> (Vec<SourceFile>, Vec<SkippedFile>) {
    let mut skipped = Vec::new();

    if !path.exists() {
        warn!(path = %path.display(), "code archive path does not exist; producing empty model");
        return (Vec::new(), skipped);
    }

    let mut files = if path.is_dir() {
        load_dir(path, &mut skipped)
    } else {
        load_zip(path, &mut skipped)
    };

    files.sort_by(|a, b| a.path.cmp(&b.path));
    debug!(files = files.len(), skipped = skipped.len(), "archive loaded");
    (files, skipped)
}

fn load_dir(root: &Path, skipped: &mut Vec<SkippedFile>) -> Vec<SourceFile> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        if !is_source_path(&rel) {
            continue;
        }
        match std::fs::read_to_string(entry.path()) {
            Ok(content) => files.push(SourceFile { path: rel, content }),
            Err(e) => skipped.push(SkippedFile {
                file: rel,
                reason: format!("unreadable: {}", e),
            }),
        }
    }
    files
}

fn load_zip(path: &Path, skipped: &mut Vec<SkippedFile>) -> Vec<SourceFile> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open archive");
            return Vec::new();
        }
    };
    let mut zip = match zip::ZipArchive::new(file) {
        Ok(zip) => zip,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "malformed zip archive; producing empty model");
            return Vec::new();
        }
    };

    let mut files = Vec::new();
    for index in 0..zip.len() {
        let mut entry = match zip.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                skipped.push(SkippedFile {
                    file: format!("entry #{}", index),
                    reason: format!("unreadable zip entry: {}", e),
                });
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().replace('\\', "/");
        if !is_source_path(&name) {
            continue;
        }
        let mut content = String::new();
        match entry.read_to_string(&mut content) {
            Ok(_) => files.push(SourceFile { path: name, content }),
            Err(e) => skipped.push(SkippedFile {
                file: name,
                reason: format!("not valid UTF-8: {}", e),
            }),
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_path_is_empty_not_fatal() {
        let (files, skipped) = load_archive(Path::new("/nonexistent/archive.zip"));
        assert!(files.is_empty());
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_directory_load_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/b.tsx"), "export const B = 1;").unwrap();
        std::fs::write(dir.path().join("src/a.ts"), "export const A = 1;").unwrap();
        std::fs::write(dir.path().join("README.md"), "# readme").unwrap();

        let (files, skipped) = load_archive(dir.path());
        assert!(skipped.is_empty());
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/a.ts", "src/b.tsx"]);
    }

    #[test]
    fn test_zip_load() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("code.zip");
        let file = File::create(&zip_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("app/App.tsx", options).unwrap();
        writer.write_all(b"export default function App() {}").unwrap();
        writer.start_file("notes.txt", options).unwrap();
        writer.write_all(b"not source").unwrap();
        writer.finish().unwrap();

        let (files, _skipped) = load_archive(&zip_path);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "app/App.tsx");
    }

    #[test]
    fn test_malformed_zip_is_empty_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("broken.zip");
        std::fs::write(&zip_path, b"this is not a zip").unwrap();
        let (files, _) = load_archive(&zip_path);
        assert!(files.is_empty());
    }
}
