//! Anchor extraction and per-pass target selection.
//!
//! Shared by the static and dynamic extractors: both turn a page into a list
//! of [`CandidateLink`]s and hand it to [`select_targets`].

use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use super::classify::{positional_fallback, Classification, Classifier};
use crate::models::{CandidateLink, DiscoveredLink, DiscoverySet, InsertOutcome};

/// Anchor as reported by a rendered DOM.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderedAnchor {
    pub href: String,
    #[serde(default)]
    pub text: String,
}

/// Collect every `a[href]` in a document, resolved against `base_url`.
///
/// The anchor's text is the label; when it has none, the `title` attribute
/// is used instead.
pub fn anchors_from_html(html: &str, base_url: &Url) -> Vec<CandidateLink> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let text = element.text().collect::<Vec<_>>().join(" ");
            let label = if text.trim().is_empty() {
                element.value().attr("title").unwrap_or_default().to_string()
            } else {
                text
            };
            CandidateLink::resolve(&label, href, base_url)
        })
        .collect()
}

/// Convert anchors read from a rendered page into candidates.
pub fn anchors_from_rendered(anchors: Vec<RenderedAnchor>, base_url: &Url) -> Vec<CandidateLink> {
    anchors
        .into_iter()
        .filter_map(|a| CandidateLink::resolve(&a.text, &a.href, base_url))
        .collect()
}

/// Result of one extraction pass over a page.
#[derive(Debug, Default)]
pub struct ExtractionPass {
    pub links: DiscoverySet,
    pub total_anchors: usize,
    /// Anchors that passed the document-extension filter.
    pub document_anchors: usize,
    /// Document links with no attachment marker or keyword.
    pub rejected: usize,
    /// Document links that looked like attachments but had no usable numeral.
    pub unresolved: usize,
    /// Links assigned by DOM position.
    pub positional: usize,
}

impl ExtractionPass {
    /// Log a one-line summary of the pass.
    pub fn log_summary(&self, strategy: &str) {
        info!(
            "{} pass: {} anchors, {} document links, {} targets found ({} positional), {} rejected, {} unresolved",
            strategy,
            self.total_anchors,
            self.document_anchors,
            self.links.identity_count(),
            self.positional,
            self.rejected,
            self.unresolved
        );
        for link in self.links.links() {
            info!("{} pass found {}: {}", strategy, link.identity, link.url);
        }
    }

    pub fn into_links(self) -> Vec<DiscoveredLink> {
        self.links.into_links()
    }
}

/// Filter and classify a pass's candidates.
///
/// Candidates are taken in document order. The first link for an identity
/// wins. With `positional` set and fewer than two identities found, the
/// leftover document links go through [`positional_fallback`].
pub fn select_targets(
    candidates: Vec<CandidateLink>,
    classifier: &Classifier,
    positional: bool,
) -> ExtractionPass {
    let mut pass = ExtractionPass {
        total_anchors: candidates.len(),
        ..Default::default()
    };
    let mut leftovers: Vec<CandidateLink> = Vec::new();

    for candidate in candidates {
        if !classifier.is_document(&candidate.resolved_url) {
            continue;
        }
        pass.document_anchors += 1;

        match classifier.classify(&candidate) {
            Classification::Identified { identity, tier } => {
                let link = DiscoveredLink::new(identity, candidate.resolved_url.clone());
                match pass.links.insert(link) {
                    InsertOutcome::Added => debug!(
                        "Classified {:?} ({}) as {} via {}",
                        candidate.label,
                        candidate.resolved_url,
                        identity,
                        tier.as_str()
                    ),
                    outcome => debug!(
                        "Dropped {:?} ({}) for {}: {:?}",
                        candidate.label, candidate.resolved_url, identity, outcome
                    ),
                }
            }
            Classification::Unresolved => {
                debug!(
                    "Unresolved attachment link {:?} ({})",
                    candidate.label, candidate.resolved_url
                );
                pass.unresolved += 1;
                leftovers.push(candidate);
            }
            Classification::Rejected => {
                debug!(
                    "Rejected document link {:?} ({})",
                    candidate.label, candidate.resolved_url
                );
                pass.rejected += 1;
                leftovers.push(candidate);
            }
        }
    }

    if positional && pass.links.identity_count() < 2 {
        for link in positional_fallback(&leftovers, &pass.links) {
            if pass.links.insert(link) == InsertOutcome::Added {
                pass.positional += 1;
            }
        }
    }

    pass
}
