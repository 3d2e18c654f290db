//! Dynamic extraction: render the page in headless Chromium and read the DOM.
//!
//! Used only when the static pass comes up short. Anchors are read from the
//! rendered DOM, so links injected by scripts are visible, and the
//! positional fallback is allowed here.

mod config;
#[cfg(feature = "browser")]
mod session;
#[cfg(feature = "browser")]
mod stealth;

pub use config::BrowserEngineConfig;
#[cfg(feature = "browser")]
pub use session::BrowserSession;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;
use url::Url;

use super::classify::Classifier;
use super::LinkExtractor;
use crate::cancel::CancelSignal;
use crate::models::DiscoveredLink;

#[cfg(feature = "browser")]
use std::time::Duration;

#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
#[cfg(feature = "browser")]
use chromiumoxide::Page;
#[cfg(feature = "browser")]
use tracing::{debug, info};

#[cfg(feature = "browser")]
use super::extract::{anchors_from_rendered, select_targets, ExtractionPass, RenderedAnchor};
#[cfg(feature = "browser")]
use crate::models::CandidateLink;

/// Errors rendering the page.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to start browser: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Browser unavailable: {0}")]
    Unavailable(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Scrolls to the bottom so lazy content loads.
#[cfg(feature = "browser")]
const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight); true";

/// `a.href` is already resolved by the browser.
#[cfg(feature = "browser")]
const COLLECT_ANCHORS_SCRIPT: &str = r#"
    Array.from(document.querySelectorAll('a[href]')).map(a => ({
        href: a.href,
        text: (a.innerText || a.getAttribute('title') || '').trim()
    }))
"#;

#[cfg(feature = "browser")]
const BODY_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Extractor backed by a headless browser.
pub struct DynamicExtractor {
    config: BrowserEngineConfig,
    classifier: Classifier,
    user_agent: String,
    positional: bool,
    cancel: CancelSignal,
}

impl DynamicExtractor {
    pub fn new(config: BrowserEngineConfig, classifier: Classifier, user_agent: String) -> Self {
        Self {
            config,
            classifier,
            user_agent,
            positional: true,
            cancel: CancelSignal::never(),
        }
    }

    /// Enable or disable the DOM-order fallback.
    pub fn with_positional_fallback(mut self, enabled: bool) -> Self {
        self.positional = enabled;
        self
    }

    /// Abort rendering when `cancel` fires.
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }
}

#[cfg(feature = "browser")]
impl DynamicExtractor {
    /// Render and classify, surfacing errors.
    ///
    /// The browser session is torn down on every path: explicitly on
    /// return, by its drop guard if this future is dropped.
    pub async fn try_extract(&self, page_url: &Url) -> Result<ExtractionPass, BrowserError> {
        if self.cancel.is_cancelled() {
            return Err(BrowserError::Cancelled);
        }

        let render = async {
            let session = BrowserSession::open(&self.config).await?;
            let result = match session.new_page().await {
                Ok(page) => {
                    let anchors = self.collect_anchors(&page, page_url).await;
                    if let Err(e) = page.close().await {
                        debug!("Failed to close page: {}", e);
                    }
                    anchors
                }
                Err(e) => Err(e),
            };
            session.close().await;
            result
        };

        let candidates = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(BrowserError::Cancelled),
            result = render => result?,
        };

        Ok(select_targets(candidates, &self.classifier, self.positional))
    }

    async fn collect_anchors(
        &self,
        page: &Page,
        page_url: &Url,
    ) -> Result<Vec<CandidateLink>, BrowserError> {
        page.execute(SetUserAgentOverrideParams::new(self.user_agent.clone()))
            .await
            .map_err(|e| BrowserError::Navigation(e.to_string()))?;

        info!("Dynamic pass: rendering {}", page_url);
        let nav_params = NavigateParams::builder()
            .url(page_url.as_str())
            .build()
            .map_err(BrowserError::Navigation)?;

        match tokio::time::timeout(self.config.navigation_timeout(), page.execute(nav_params)).await
        {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(BrowserError::Navigation(e.to_string())),
            Err(_) => return Err(BrowserError::Timeout("navigation")),
        }

        wait_for_body(page, self.config.body_timeout()).await?;
        stealth::apply(page).await;

        if let Err(e) = page.evaluate(SCROLL_SCRIPT.to_string()).await {
            debug!("Scroll failed: {}", e);
        }
        tokio::time::sleep(self.config.settle_delay()).await;

        let anchors: Vec<RenderedAnchor> = page
            .evaluate(COLLECT_ANCHORS_SCRIPT.to_string())
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?
            .into_value()
            .map_err(|e| BrowserError::Script(e.to_string()))?;

        // Redirects change the base for anything the browser left relative.
        let base = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| page_url.clone());

        Ok(anchors_from_rendered(anchors, &base))
    }
}

#[cfg(feature = "browser")]
async fn wait_for_body(page: &Page, timeout: Duration) -> Result<(), BrowserError> {
    let poll = async {
        loop {
            if page.find_element("body").await.is_ok() {
                return;
            }
            tokio::time::sleep(BODY_POLL_INTERVAL).await;
        }
    };
    tokio::time::timeout(timeout, poll)
        .await
        .map_err(|_| BrowserError::Timeout("page body"))
}

#[cfg(not(feature = "browser"))]
impl DynamicExtractor {
    pub async fn try_extract(
        &self,
        _page_url: &Url,
    ) -> Result<super::extract::ExtractionPass, BrowserError> {
        Err(BrowserError::Unavailable(
            "browser support not compiled. Rebuild with: cargo build --features browser"
                .to_string(),
        ))
    }
}

#[async_trait]
impl LinkExtractor for DynamicExtractor {
    fn name(&self) -> &'static str {
        "dynamic"
    }

    async fn extract_links(&self, page_url: &Url) -> Vec<DiscoveredLink> {
        match self.try_extract(page_url).await {
            Ok(pass) => {
                pass.log_summary(self.name());
                pass.into_links()
            }
            Err(e) => {
                warn!("Dynamic pass failed for {}: {}", page_url, e);
                Vec::new()
            }
        }
    }
}
