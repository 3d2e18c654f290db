//! Data models for discovered links and retrieved files.

mod file;
mod link;

pub use file::{ArchiveManifest, RetrievedFile};
pub use link::{AnexoIdentity, CandidateLink, DiscoveredLink, DiscoverySet, InsertOutcome};
