//! Static extraction: fetch the page over HTTP and parse the markup.

use async_trait::async_trait;
use tracing::{info, warn};
use url::Url;

use super::classify::Classifier;
use super::extract::{anchors_from_html, select_targets, ExtractionPass};
use super::{HttpClient, LinkExtractor, ScrapeError};
use crate::models::DiscoveredLink;

/// Extractor that never runs scripts.
pub struct StaticExtractor {
    client: HttpClient,
    classifier: Classifier,
}

impl StaticExtractor {
    pub fn new(client: HttpClient, classifier: Classifier) -> Self {
        Self { client, classifier }
    }

    /// Fetch and classify, surfacing transport errors.
    pub async fn try_extract(&self, page_url: &Url) -> Result<ExtractionPass, ScrapeError> {
        info!("Static pass: fetching {}", page_url);
        let html = self.client.get_text(page_url).await?;

        // Parse synchronously; `scraper::Html` is not Send.
        let candidates = anchors_from_html(&html, page_url);
        Ok(select_targets(candidates, &self.classifier, false))
    }
}

#[async_trait]
impl LinkExtractor for StaticExtractor {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn extract_links(&self, page_url: &Url) -> Vec<DiscoveredLink> {
        match self.try_extract(page_url).await {
            Ok(pass) => {
                pass.log_summary(self.name());
                pass.into_links()
            }
            Err(e) => {
                warn!("Static pass failed for {}: {}", page_url, e);
                Vec::new()
            }
        }
    }
}
