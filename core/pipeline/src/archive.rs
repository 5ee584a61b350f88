//! Output-directory archiving.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Component, Path};

use tracing::info;
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use simsync_common::{Error, Result};

/// Fixed archive name, derived from the solver's output directory name.
pub const ARCHIVE_NAME: &str = "navier_stokes_output.zip";

fn zip_failure(err: ZipError) -> Error {
    match err {
        ZipError::Io(e) => Error::Io(e),
        other => Error::Archive(other.to_string()),
    }
}

/// Build the archive-internal entry name for a path relative to the source
/// directory. Entry names always use '/' separators.
fn entry_name(rel: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    Error::Config(format!(
                        "Non-UTF-8 name in source directory: {}",
                        rel.display()
                    ))
                })?;
                parts.push(part);
            }
            _ => {
                return Err(Error::Config(format!(
                    "Unexpected path component in source directory: {}",
                    rel.display()
                )))
            }
        }
    }
    Ok(parts.join("/"))
}

/// Package `source_dir` into a single archive at `dest_archive`.
///
/// The archive holds the directory's *contents*: entry paths are relative to
/// `source_dir`, so re-extraction reproduces the files without nesting an
/// extra directory level. Subdirectories are stored as directory entries so
/// empty ones survive the round trip. An existing `dest_archive` is
/// overwritten; no versioning.
///
/// # Preconditions
/// - `source_dir` exists and contains at least one file
///
/// # Errors
/// - `Config` if the source directory is missing or empty
/// - `Io`/`Archive` on write failure; a failed run may leave a truncated
///   archive, which callers must re-create rather than reuse
pub fn create_archive(source_dir: &Path, dest_archive: &Path) -> Result<()> {
    if !source_dir.is_dir() {
        return Err(Error::Config(format!(
            "Source directory not found: {}",
            source_dir.display()
        )));
    }

    let has_files = WalkDir::new(source_dir)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.file_type().is_file());
    if !has_files {
        return Err(Error::Config(format!(
            "Source directory is empty: {}",
            source_dir.display()
        )));
    }

    let dest = File::create(dest_archive)?;
    let mut writer = ZipWriter::new(BufWriter::new(dest));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut file_count = 0usize;
    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let rel = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|e| Error::Config(format!("Failed to relativize path: {}", e)))?;
        let name = entry_name(rel)?;

        if entry.file_type().is_dir() {
            writer
                .add_directory(name.as_str(), options)
                .map_err(zip_failure)?;
        } else if entry.file_type().is_file() {
            writer
                .start_file(name.as_str(), options)
                .map_err(zip_failure)?;
            let mut reader = BufReader::new(File::open(entry.path())?);
            io::copy(&mut reader, &mut writer)?;
            file_count += 1;
        }
        // Symlinks are not expected in solver output and are skipped
    }

    let mut inner = writer.finish().map_err(zip_failure)?;
    inner.flush()?;

    info!(
        archive = %dest_archive.display(),
        files = file_count,
        "archive created"
    );

    Ok(())
}

/// Caller-side postcondition check: the archive must exist and be non-empty
/// before it can be trusted. Returns its size in bytes.
pub fn verify_archive(archive_path: &Path) -> Result<u64> {
    let meta = std::fs::metadata(archive_path).map_err(|_| {
        Error::Verification(format!("Archive not found: {}", archive_path.display()))
    })?;

    if meta.len() == 0 {
        return Err(Error::Verification(format!(
            "Archive is empty: {}",
            archive_path.display()
        )));
    }

    Ok(meta.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::fs;

    fn write_file(path: &Path, content: &[u8]) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Extract an archive and collect relative path -> content for files.
    fn extract_all(archive: &Path, dest: &Path) -> BTreeMap<String, Vec<u8>> {
        let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
        zip.extract(dest).unwrap();

        let mut contents = BTreeMap::new();
        for entry in WalkDir::new(dest).min_depth(1) {
            let entry = entry.unwrap();
            if entry.file_type().is_file() {
                let rel = entry.path().strip_prefix(dest).unwrap();
                contents.insert(
                    rel.to_string_lossy().replace('\\', "/"),
                    fs::read(entry.path()).unwrap(),
                );
            }
        }
        contents
    }

    #[test]
    fn test_archive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("navier_stokes_output");
        write_file(&source.join("step_0000_snapshot.json"), b"{\"t\": 0.0}");
        write_file(&source.join("step_0001_snapshot.json"), b"{\"t\": 0.1}");
        write_file(&source.join("metrics/divergence.csv"), b"step,value\n0,1e-9\n");

        let archive = dir.path().join(ARCHIVE_NAME);
        create_archive(&source, &archive).unwrap();

        let extracted = dir.path().join("extracted");
        let contents = extract_all(&archive, &extracted);

        assert_eq!(contents.len(), 3);
        assert_eq!(
            contents.get("step_0000_snapshot.json").unwrap(),
            b"{\"t\": 0.0}"
        );
        assert_eq!(
            contents.get("metrics/divergence.csv").unwrap(),
            b"step,value\n0,1e-9\n"
        );
    }

    #[test]
    fn test_archive_does_not_nest_source_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("navier_stokes_output");
        write_file(&source.join("result.json"), b"{}");

        let archive = dir.path().join(ARCHIVE_NAME);
        create_archive(&source, &archive).unwrap();

        let extracted = dir.path().join("extracted");
        let contents = extract_all(&archive, &extracted);

        assert!(contents.contains_key("result.json"));
        assert!(!contents.contains_key("navier_stokes_output/result.json"));
    }

    #[test]
    fn test_archive_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = create_archive(
            &dir.path().join("does_not_exist"),
            &dir.path().join(ARCHIVE_NAME),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_archive_empty_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("empty");
        fs::create_dir_all(&source).unwrap();

        let archive = dir.path().join(ARCHIVE_NAME);
        let err = create_archive(&source, &archive).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        // Precondition failure happens before the destination is touched
        assert!(!archive.exists());
    }

    #[test]
    fn test_archive_overwrites_previous() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("out");
        write_file(&source.join("first.json"), b"1");

        let archive = dir.path().join(ARCHIVE_NAME);
        create_archive(&source, &archive).unwrap();

        fs::remove_file(source.join("first.json")).unwrap();
        write_file(&source.join("second.json"), b"2");
        create_archive(&source, &archive).unwrap();

        let contents = extract_all(&archive, &dir.path().join("extracted"));
        assert_eq!(contents.len(), 1);
        assert!(contents.contains_key("second.json"));
    }

    #[test]
    fn test_verify_archive_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = verify_archive(&dir.path().join("absent.zip")).unwrap_err();
        assert!(matches!(err, Error::Verification(_)));
    }

    #[test]
    fn test_verify_archive_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("truncated.zip");
        fs::write(&path, b"").unwrap();
        let err = verify_archive(&path).unwrap_err();
        assert!(matches!(err, Error::Verification(_)));
    }

    #[test]
    fn test_verify_archive_reports_size() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("out");
        write_file(&source.join("data.json"), b"{\"k\": 1}");

        let archive = dir.path().join(ARCHIVE_NAME);
        create_archive(&source, &archive).unwrap();

        let size = verify_archive(&archive).unwrap();
        assert_eq!(size, fs::metadata(&archive).unwrap().len());
        assert!(size > 0);
    }
}
