//! Link extractors for the attachment page.
//!
//! Two strategies share one capability trait: a cheap static parse and a
//! headless-browser render. Both classify anchors the same way.

pub mod browser;
pub mod classify;
pub mod extract;
mod http_client;
pub mod static_page;

pub use browser::{BrowserEngineConfig, BrowserError, DynamicExtractor};
pub use classify::{Classification, Classifier, MatchTier};
pub use extract::{ExtractionPass, RenderedAnchor};
pub use http_client::{resolve_user_agent, HttpClient, DOCUMENT_ACCEPT, USER_AGENT};
pub use static_page::StaticExtractor;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

use crate::models::DiscoveredLink;

/// Errors fetching a page or document over HTTP.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status: {0}")]
    Status(StatusCode),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// A strategy that finds attachment links on a page.
///
/// Implementations never fail outward: problems are logged and an empty
/// list is returned.
#[async_trait]
pub trait LinkExtractor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Links found on `page_url`, at most one per identity and per URL.
    async fn extract_links(&self, page_url: &Url) -> Vec<DiscoveredLink>;
}
