//! HTTP client shared by the static extractor and the retriever.

mod user_agent;

pub use user_agent::{resolve_user_agent, USER_AGENT};

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use tracing::debug;
use url::Url;

use super::ScrapeError;

/// Accept header sent when fetching documents.
pub const DOCUMENT_ACCEPT: &str = "application/pdf";

/// Thin wrapper over a configured [`reqwest::Client`].
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    user_agent: String,
}

impl HttpClient {
    /// Create a client.
    ///
    /// `timeout` bounds each whole request, body included. See
    /// [`resolve_user_agent`] for `user_agent_config`.
    pub fn new(timeout: Duration, user_agent_config: Option<&str>) -> Result<Self, reqwest::Error> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client, user_agent })
    }

    /// The user agent this client sends.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// GET a page and return its body as text. Non-success status is an error.
    pub async fn get_text(&self, url: &Url) -> Result<String, ScrapeError> {
        debug!("GET {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status));
        }
        Ok(response.text().await?)
    }

    /// GET a document. The body is left unread for the caller to stream.
    pub async fn get_document(&self, url: &Url) -> Result<Response, ScrapeError> {
        debug!("GET {} (document)", url);
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, DOCUMENT_ACCEPT)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status(status));
        }
        Ok(response)
    }
}
