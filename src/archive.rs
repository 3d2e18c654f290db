//! Bundling retrieved attachments into a single zip.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::models::ArchiveManifest;

/// Errors that can occur while writing the archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Nothing to archive")]
    NoInputs,

    #[error("Input has no file name: {0}")]
    MissingFileName(PathBuf),

    #[error("Two inputs share the entry name {0}")]
    DuplicateEntry(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Write `file_paths` into a deflate zip at `destination`.
///
/// Each input is stored under its base name only, in input order. On failure
/// the partial archive is removed. Inputs are left in place.
pub fn archive(file_paths: &[PathBuf], destination: &Path) -> Result<ArchiveManifest, ArchiveError> {
    if file_paths.is_empty() {
        return Err(ArchiveError::NoInputs);
    }

    let entries = entry_names(file_paths)?;

    match write_archive(file_paths, &entries, destination) {
        Ok(()) => {
            info!(
                "Archived {} file(s) into {}",
                entries.len(),
                destination.display()
            );
            Ok(ArchiveManifest {
                path: destination.to_path_buf(),
                entries,
            })
        }
        Err(e) => {
            if let Err(remove_err) = std::fs::remove_file(destination) {
                if remove_err.kind() != io::ErrorKind::NotFound {
                    warn!(
                        "Failed to remove partial archive {}: {}",
                        destination.display(),
                        remove_err
                    );
                }
            }
            Err(e)
        }
    }
}

/// Base names for every input, rejecting duplicates.
fn entry_names(file_paths: &[PathBuf]) -> Result<Vec<String>, ArchiveError> {
    let mut seen = HashSet::new();
    let mut names = Vec::with_capacity(file_paths.len());

    for path in file_paths {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ArchiveError::MissingFileName(path.clone()))?;
        if !seen.insert(name.clone()) {
            return Err(ArchiveError::DuplicateEntry(name));
        }
        names.push(name);
    }

    Ok(names)
}

fn write_archive(
    file_paths: &[PathBuf],
    entries: &[String],
    destination: &Path,
) -> Result<(), ArchiveError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(BufWriter::new(File::create(destination)?));

    for (path, name) in file_paths.iter().zip(entries) {
        let mut input = BufReader::new(File::open(path)?);
        zip.start_file(name.as_str(), options)?;
        io::copy(&mut input, &mut zip)?;
    }

    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn write(dir: &Path, rel: &str, contents: &[u8]) -> PathBuf {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_archive_flat_entries_in_order() {
        let dir = tempdir().unwrap();
        let second = write(dir.path(), "nested/deeper/Anexo_II.pdf", b"%PDF-II");
        let first = write(dir.path(), "Anexo_I.pdf", b"%PDF-I");
        let dest = dir.path().join("anexos.zip");

        let manifest = archive(&[second, first], &dest).unwrap();

        assert_eq!(manifest.path, dest);
        assert_eq!(manifest.entries, vec!["Anexo_II.pdf", "Anexo_I.pdf"]);

        let mut zip = ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        assert_eq!(zip.len(), 2);
        assert_eq!(zip.by_index(0).unwrap().name(), "Anexo_II.pdf");

        let mut contents = Vec::new();
        zip.by_name("Anexo_I.pdf")
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        assert_eq!(contents, b"%PDF-I");
    }

    #[test]
    fn test_archive_keeps_inputs() {
        let dir = tempdir().unwrap();
        let input = write(dir.path(), "Anexo_I.pdf", b"%PDF");
        archive(&[input.clone()], &dir.path().join("out.zip")).unwrap();
        assert!(input.exists());
    }

    #[test]
    fn test_archive_empty_input_fails() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("anexos.zip");

        let err = archive(&[], &dest).unwrap_err();
        assert!(matches!(err, ArchiveError::NoInputs));
        assert!(!dest.exists());
    }

    #[test]
    fn test_archive_duplicate_base_names_fail() {
        let dir = tempdir().unwrap();
        let a = write(dir.path(), "a/Anexo_I.pdf", b"a");
        let b = write(dir.path(), "b/Anexo_I.pdf", b"b");
        let dest = dir.path().join("anexos.zip");

        let err = archive(&[a, b], &dest).unwrap_err();
        assert!(matches!(err, ArchiveError::DuplicateEntry(ref n) if n == "Anexo_I.pdf"));
        assert!(!dest.exists());
    }

    #[test]
    fn test_archive_missing_input_removes_partial() {
        let dir = tempdir().unwrap();
        let present = write(dir.path(), "Anexo_I.pdf", b"%PDF");
        let missing = dir.path().join("Anexo_II.pdf");
        let dest = dir.path().join("anexos.zip");

        let err = archive(&[present, missing], &dest).unwrap_err();
        assert!(matches!(err, ArchiveError::Io(_)));
        assert!(!dest.exists());
    }
}
