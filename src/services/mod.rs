//! Service layer: discovery orchestration and retrieval.
//!
//! Separated from UI concerns. The CLI drives these through [`crate::pipeline`].

pub mod discovery;
pub mod download;

pub use discovery::{DiscoveryOrchestrator, DiscoveryReport};
pub use download::{DownloadError, DownloadEvent, Retriever};
