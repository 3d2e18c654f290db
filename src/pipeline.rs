//! Discovery, retrieval and archiving as one run.

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::archive::{archive, ArchiveError};
use crate::cancel::CancelSignal;
use crate::config::Config;
use crate::models::{AnexoIdentity, ArchiveManifest, RetrievedFile};
use crate::scrapers::{Classifier, DynamicExtractor, HttpClient, StaticExtractor};
use crate::services::{DiscoveryOrchestrator, DiscoveryReport, DownloadEvent, Retriever};

/// Why a run produced no archive.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid page URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Failed to create HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("No attachment links found")]
    NoLinksFound,

    #[error("None of the attachments could be downloaded")]
    NothingRetrieved,

    #[error("Archive failed: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What a successful run did.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub discovery: DiscoveryReport,
    pub retrieved: Vec<RetrievedFile>,
    /// Identities whose download failed, with the reason.
    pub failures: Vec<(AnexoIdentity, String)>,
    pub manifest: ArchiveManifest,
}

impl PipelineOutcome {
    /// Fewer files than required made it into the archive.
    pub fn is_partial(&self, required_count: usize) -> bool {
        self.retrieved.len() < required_count
    }
}

/// A configured run.
pub struct Pipeline {
    config: Config,
    events: Option<mpsc::Sender<DownloadEvent>>,
}

impl Pipeline {
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            events: None,
        }
    }

    /// Forward download events to `events`.
    pub fn with_events(mut self, events: mpsc::Sender<DownloadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn orchestrator(&self, cancel: &CancelSignal) -> Result<DiscoveryOrchestrator, PipelineError> {
        let classifier = Classifier::new(&self.config.document_extension);
        let client = HttpClient::new(self.config.request_timeout(), Some(&self.config.user_agent))?;
        let user_agent = client.user_agent().to_string();

        let mut orchestrator =
            DiscoveryOrchestrator::new(Box::new(StaticExtractor::new(client, classifier.clone())));

        if self.config.browser.enabled {
            let dynamic = DynamicExtractor::new(self.config.browser.clone(), classifier, user_agent)
                .with_positional_fallback(self.config.discovery.positional_fallback)
                .with_cancel(cancel.clone());
            orchestrator = orchestrator.with_fallback(Box::new(dynamic));
        } else {
            info!("Browser fallback disabled");
        }

        Ok(orchestrator)
    }

    /// Run discovery only.
    pub async fn discover(&self, cancel: &CancelSignal) -> Result<DiscoveryReport, PipelineError> {
        let page_url = self.config.page_url()?;
        let orchestrator = self.orchestrator(cancel)?;

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(PipelineError::Cancelled),
            report = orchestrator.discover(&page_url, self.config.required_count) => Ok(report),
        }
    }

    /// Discover, download and archive.
    ///
    /// Succeeds when at least one attachment was downloaded and archived.
    pub async fn run(&self, cancel: &CancelSignal) -> Result<PipelineOutcome, PipelineError> {
        let output_dir = self.config.output_dir();
        tokio::fs::create_dir_all(&output_dir).await?;
        info!("Output directory: {}", output_dir.display());

        let discovery = self.discover(cancel).await?;
        if discovery.set.is_empty() {
            return Err(PipelineError::NoLinksFound);
        }
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let client = HttpClient::new(self.config.download_timeout(), Some(&self.config.user_agent))?;
        let mut retriever = Retriever::new(client, output_dir)
            .with_extension(&self.config.document_extension)
            .with_workers(self.config.download_workers);
        if let Some(ref events) = self.events {
            retriever = retriever.with_events(events.clone());
        }

        let results = retriever.retrieve_all(discovery.set.links(), cancel).await;
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let mut retrieved = Vec::new();
        let mut failures = Vec::new();
        for (identity, result) in results {
            match result {
                Ok(file) => retrieved.push(file),
                Err(e) => failures.push((identity, e.to_string())),
            }
        }

        if retrieved.is_empty() {
            return Err(PipelineError::NothingRetrieved);
        }
        if retrieved.len() < self.config.required_count {
            warn!(
                "Only {} of {} attachments were downloaded",
                retrieved.len(),
                self.config.required_count
            );
        }

        let paths: Vec<PathBuf> = retrieved.iter().map(|f| f.path.clone()).collect();
        let destination = self.config.archive_path();
        let manifest = tokio::task::spawn_blocking(move || archive(&paths, &destination)).await??;

        if self.config.remove_after_archive {
            remove_sources(&retrieved).await;
        }

        Ok(PipelineOutcome {
            discovery,
            retrieved,
            failures,
            manifest,
        })
    }
}

async fn remove_sources(files: &[RetrievedFile]) {
    for file in files {
        match tokio::fs::remove_file(&file.path).await {
            Ok(()) => info!("Removed {}", file.path.display()),
            Err(e) => warn!("Failed to remove {}: {}", file.path.display(), e),
        }
    }
}
