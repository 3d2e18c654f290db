//! Attachment retrieval.
//!
//! Streams each discovered link to a collision-free file in the output
//! directory. A download that fails, is cancelled or comes back empty leaves
//! nothing behind. Emits events for progress tracking.

mod naming;
mod types;

pub use naming::{disambiguate, resolve_collision_free_path, COLLISION_MARKER};
pub use types::{DownloadError, DownloadEvent};

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};
use url::Url;

use crate::cancel::CancelSignal;
use crate::models::{AnexoIdentity, DiscoveredLink, RetrievedFile};
use crate::scrapers::HttpClient;

/// Downloads discovered links into one directory.
pub struct Retriever {
    client: HttpClient,
    output_dir: PathBuf,
    extension: String,
    workers: usize,
    events: Option<mpsc::Sender<DownloadEvent>>,
    /// Serializes name choice across concurrent downloads.
    naming: Mutex<()>,
}

impl Retriever {
    /// `client` should be built with the download timeout.
    pub fn new(client: HttpClient, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            output_dir: output_dir.into(),
            extension: "pdf".to_string(),
            workers: 1,
            events: None,
            naming: Mutex::new(()),
        }
    }

    /// Extension for the canonical file names.
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Concurrent downloads in [`Retriever::retrieve_all`]. 1 means sequential.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_events(mut self, events: mpsc::Sender<DownloadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory if needed.
    pub async fn prepare_output_dir(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await
    }

    /// Download one link under `suggested_name`, or a disambiguated variant
    /// when that name is taken.
    pub async fn retrieve(
        &self,
        link: &DiscoveredLink,
        suggested_name: &str,
        cancel: &CancelSignal,
    ) -> Result<RetrievedFile, DownloadError> {
        if cancel.is_cancelled() {
            return Err(DownloadError::Cancelled);
        }

        let (path, file) =
            resolve_collision_free_path(&self.naming, &self.output_dir, suggested_name).await?;

        self.emit(DownloadEvent::Started {
            identity: link.identity,
            url: link.url.to_string(),
            path: path.clone(),
        })
        .await;
        info!("Downloading {} from {} to {}", link.identity, link.url, path.display());

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DownloadError::Cancelled),
            result = self.stream_to_file(&link.url, file) => result,
        };

        let result = match result {
            Ok(0) => Err(DownloadError::EmptyPayload),
            Ok(size_bytes) => Ok(RetrievedFile {
                source_identity: link.identity,
                path: path.clone(),
                size_bytes,
            }),
            Err(e) => Err(e),
        };

        match &result {
            Ok(file) => {
                info!("Saved {} ({} bytes)", path.display(), file.size_bytes);
                self.emit(DownloadEvent::Completed {
                    identity: link.identity,
                    path,
                    bytes: file.size_bytes,
                })
                .await;
            }
            Err(e) => {
                remove_partial(&path).await;
                self.emit(DownloadEvent::Failed {
                    identity: link.identity,
                    url: link.url.to_string(),
                    error: e.to_string(),
                })
                .await;
            }
        }

        result
    }

    /// Download every link under its canonical name.
    ///
    /// At most `workers` downloads run at once. Results keep the order of
    /// `links`. Failures are logged and returned, never raised.
    pub async fn retrieve_all(
        &self,
        links: &[DiscoveredLink],
        cancel: &CancelSignal,
    ) -> Vec<(AnexoIdentity, Result<RetrievedFile, DownloadError>)> {
        futures::stream::iter(links)
            .map(|link| async move {
                let name = link.identity.file_name(&self.extension);
                let result = self.retrieve(link, &name, cancel).await;
                if let Err(ref e) = result {
                    warn!("Failed to download {} from {}: {}", link.identity, link.url, e);
                }
                (link.identity, result)
            })
            .buffered(self.workers)
            .collect()
            .await
    }

    /// Stream the response body into `file`. Returns the bytes written.
    async fn stream_to_file(&self, url: &Url, file: File) -> Result<u64, DownloadError> {
        let mut response = self.client.get_document(url).await?;
        let mut writer = BufWriter::new(file);
        let mut written: u64 = 0;

        while let Some(chunk) = response.chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;

        Ok(written)
    }

    async fn emit(&self, event: DownloadEvent) {
        if let Some(ref tx) = self.events {
            let _ = tx.send(event).await;
        }
    }
}

/// Best-effort removal of an unfinished download.
async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial file {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial file {}: {}", path.display(), e),
    }
}
