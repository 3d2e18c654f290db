//! Files produced by retrieval and archiving.

use std::path::PathBuf;

use super::AnexoIdentity;

/// A successfully downloaded, non-empty attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedFile {
    pub source_identity: AnexoIdentity,
    pub path: PathBuf,
    /// Always greater than zero.
    pub size_bytes: u64,
}

impl RetrievedFile {
    /// Base name of the file on disk.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

/// What the archiver wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveManifest {
    pub path: PathBuf,
    /// Entry names in write order. Flat, no directory components.
    pub entries: Vec<String>,
}
