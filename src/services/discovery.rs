//! Layered discovery: static first, rendered page only when needed.

use tracing::{debug, info};
use url::Url;

use crate::models::{DiscoverySet, InsertOutcome};
use crate::scrapers::LinkExtractor;

/// Outcome of a discovery run.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    pub set: DiscoverySet,
    /// Whether the fallback extractor ran.
    pub escalated: bool,
}

/// Runs the primary extractor and escalates to the fallback on a shortfall.
pub struct DiscoveryOrchestrator {
    primary: Box<dyn LinkExtractor>,
    fallback: Option<Box<dyn LinkExtractor>>,
}

impl DiscoveryOrchestrator {
    pub fn new(primary: Box<dyn LinkExtractor>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Box<dyn LinkExtractor>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Find up to `required_count` identities on `page_url`.
    ///
    /// The merged set is returned even when short. Fallback links only add
    /// identities and URLs the primary pass did not already produce.
    pub async fn discover(&self, page_url: &Url, required_count: usize) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();

        for link in self.primary.extract_links(page_url).await {
            report.set.insert(link);
        }
        info!(
            "{} extractor found {} of {} attachments",
            self.primary.name(),
            report.set.identity_count(),
            required_count
        );

        if report.set.identity_count() >= required_count {
            return report;
        }

        let Some(fallback) = self.fallback.as_ref() else {
            info!("No fallback extractor configured; continuing with what was found");
            return report;
        };

        info!("Escalating to {} extractor", fallback.name());
        report.escalated = true;

        for link in fallback.extract_links(page_url).await {
            let (identity, url) = (link.identity, link.url.clone());
            match report.set.insert(link) {
                InsertOutcome::Added => {
                    info!("{} extractor added {}: {}", fallback.name(), identity, url)
                }
                outcome => debug!("Ignored {} from {}: {:?}", url, fallback.name(), outcome),
            }
        }

        info!(
            "Discovery finished with {} of {} attachments",
            report.set.identity_count(),
            required_count
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::models::{AnexoIdentity, DiscoveredLink};

    struct FixedExtractor {
        links: Vec<DiscoveredLink>,
        calls: Arc<AtomicUsize>,
    }

    impl FixedExtractor {
        fn boxed(links: Vec<DiscoveredLink>) -> (Box<dyn LinkExtractor>, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let extractor = Self {
                links,
                calls: calls.clone(),
            };
            (Box::new(extractor), calls)
        }
    }

    #[async_trait]
    impl LinkExtractor for FixedExtractor {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn extract_links(&self, _page_url: &Url) -> Vec<DiscoveredLink> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.links.clone()
        }
    }

    fn link(identity: AnexoIdentity, url: &str) -> DiscoveredLink {
        DiscoveredLink::new(identity, Url::parse(url).unwrap())
    }

    fn page() -> Url {
        Url::parse("https://www.gov.br/ans/rol").unwrap()
    }

    #[tokio::test]
    async fn test_complete_primary_skips_fallback() {
        let (primary, _) = FixedExtractor::boxed(vec![
            link(AnexoIdentity::AnexoI, "https://a.test/1.pdf"),
            link(AnexoIdentity::AnexoII, "https://a.test/2.pdf"),
        ]);
        let (fallback, fallback_calls) = FixedExtractor::boxed(vec![]);

        let report = DiscoveryOrchestrator::new(primary)
            .with_fallback(fallback)
            .discover(&page(), 2)
            .await;

        assert!(!report.escalated);
        assert_eq!(report.set.identity_count(), 2);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_primary_uses_fallback() {
        let (primary, primary_calls) = FixedExtractor::boxed(vec![]);
        let (fallback, fallback_calls) = FixedExtractor::boxed(vec![
            link(AnexoIdentity::AnexoI, "https://a.test/1.pdf"),
            link(AnexoIdentity::AnexoII, "https://a.test/2.pdf"),
        ]);

        let report = DiscoveryOrchestrator::new(primary)
            .with_fallback(fallback)
            .discover(&page(), 2)
            .await;

        assert!(report.escalated);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.set.identity_count(), 2);
    }

    #[tokio::test]
    async fn test_partial_primary_merge_has_no_duplicates() {
        let (primary, _) =
            FixedExtractor::boxed(vec![link(AnexoIdentity::AnexoI, "https://a.test/1.pdf")]);
        let (fallback, _) = FixedExtractor::boxed(vec![
            // same identity, different URL
            link(AnexoIdentity::AnexoI, "https://a.test/other.pdf"),
            // new identity, URL already claimed
            link(AnexoIdentity::AnexoII, "https://a.test/1.pdf"),
            link(AnexoIdentity::AnexoII, "https://a.test/2.pdf"),
        ]);

        let report = DiscoveryOrchestrator::new(primary)
            .with_fallback(fallback)
            .discover(&page(), 2)
            .await;

        let links = report.set.links();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url.as_str(), "https://a.test/1.pdf");
        assert_eq!(links[0].identity, AnexoIdentity::AnexoI);
        assert_eq!(links[1].url.as_str(), "https://a.test/2.pdf");
        assert_eq!(links[1].identity, AnexoIdentity::AnexoII);
    }

    #[tokio::test]
    async fn test_short_result_without_fallback() {
        let (primary, _) =
            FixedExtractor::boxed(vec![link(AnexoIdentity::AnexoII, "https://a.test/2.pdf")]);

        let report = DiscoveryOrchestrator::new(primary)
            .discover(&page(), 2)
            .await;

        assert!(!report.escalated);
        assert_eq!(report.set.identity_count(), 1);
    }
}
