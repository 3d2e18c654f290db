//! Link models produced by the extractors.

use std::fmt;

use url::Url;

/// The two attachments the engine is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnexoIdentity {
    AnexoI,
    AnexoII,
}

impl AnexoIdentity {
    /// Every identity, in assignment order.
    pub const ALL: [AnexoIdentity; 2] = [AnexoIdentity::AnexoI, AnexoIdentity::AnexoII];

    /// Roman numeral used in labels and file names.
    pub fn numeral(&self) -> &'static str {
        match self {
            AnexoIdentity::AnexoI => "I",
            AnexoIdentity::AnexoII => "II",
        }
    }

    /// Canonical download name, e.g. `Anexo_II.pdf`.
    pub fn file_name(&self, extension: &str) -> String {
        format!(
            "Anexo_{}.{}",
            self.numeral(),
            extension.trim_start_matches('.')
        )
    }
}

impl fmt::Display for AnexoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Anexo {}", self.numeral())
    }
}

/// An anchor seen during an extraction pass, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    /// Visible anchor text (may be empty).
    pub label: String,
    /// The `href` exactly as it appeared in the markup.
    pub raw_href: String,
    /// `raw_href` resolved against the page URL, fragment removed.
    pub resolved_url: Url,
}

impl CandidateLink {
    /// Resolve an anchor against the page it was found on.
    ///
    /// Returns `None` for hrefs that cannot be resolved or that do not point
    /// at an http(s) resource (`mailto:`, `javascript:`, ...).
    pub fn resolve(label: &str, raw_href: &str, base_url: &Url) -> Option<Self> {
        let href = raw_href.trim();
        if href.is_empty() {
            return None;
        }

        let mut resolved_url = base_url.join(href).ok()?;
        if !matches!(resolved_url.scheme(), "http" | "https") {
            return None;
        }
        resolved_url.set_fragment(None);

        Some(Self {
            label: normalize_label(label),
            raw_href: href.to_string(),
            resolved_url,
        })
    }
}

/// Collapse runs of whitespace in anchor text.
fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A classified link pointing at one of the target attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    pub identity: AnexoIdentity,
    pub url: Url,
}

impl DiscoveredLink {
    pub fn new(identity: AnexoIdentity, url: Url) -> Self {
        Self { identity, url }
    }
}

/// Result of offering a link to a [`DiscoverySet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Added,
    DuplicateIdentity,
    DuplicateUrl,
}

/// Ordered set of discovered links.
///
/// Holds at most one link per identity and at most one link per URL. The
/// first link offered for an identity wins; later ones are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoverySet {
    links: Vec<DiscoveredLink>,
}

impl DiscoverySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a link to the set.
    pub fn insert(&mut self, link: DiscoveredLink) -> InsertOutcome {
        if self.contains_identity(link.identity) {
            return InsertOutcome::DuplicateIdentity;
        }
        if self.contains_url(&link.url) {
            return InsertOutcome::DuplicateUrl;
        }
        self.links.push(link);
        InsertOutcome::Added
    }

    pub fn contains_identity(&self, identity: AnexoIdentity) -> bool {
        self.links.iter().any(|l| l.identity == identity)
    }

    pub fn contains_url(&self, url: &Url) -> bool {
        self.links.iter().any(|l| &l.url == url)
    }

    pub fn get(&self, identity: AnexoIdentity) -> Option<&DiscoveredLink> {
        self.links.iter().find(|l| l.identity == identity)
    }

    /// Number of distinct identities found so far.
    pub fn identity_count(&self) -> usize {
        self.links.len()
    }

    /// Identities not yet present, in assignment order.
    pub fn missing_identities(&self) -> Vec<AnexoIdentity> {
        AnexoIdentity::ALL
            .into_iter()
            .filter(|id| !self.contains_identity(*id))
            .collect()
    }

    pub fn links(&self) -> &[DiscoveredLink] {
        &self.links
    }

    pub fn into_links(self) -> Vec<DiscoveredLink> {
        self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl IntoIterator for DiscoverySet {
    type Item = DiscoveredLink;
    type IntoIter = std::vec::IntoIter<DiscoveredLink>;

    fn into_iter(self) -> Self::IntoIter {
        self.links.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_identity_file_name() {
        assert_eq!(AnexoIdentity::AnexoI.file_name("pdf"), "Anexo_I.pdf");
        assert_eq!(AnexoIdentity::AnexoII.file_name(".pdf"), "Anexo_II.pdf");
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(AnexoIdentity::AnexoII.to_string(), "Anexo II");
    }

    #[test]
    fn test_candidate_resolves_relative_href() {
        let base = url("https://www.gov.br/ans/pt-br/rol/index.html");
        let candidate =
            CandidateLink::resolve("  Anexo \n I ", "../arquivos/anexo_i.pdf#page=2", &base)
                .unwrap();
        assert_eq!(candidate.label, "Anexo I");
        assert_eq!(
            candidate.resolved_url.as_str(),
            "https://www.gov.br/ans/pt-br/arquivos/anexo_i.pdf"
        );
        assert_eq!(candidate.raw_href, "../arquivos/anexo_i.pdf#page=2");
    }

    #[test]
    fn test_candidate_rejects_non_http() {
        let base = url("https://example.com/");
        assert!(CandidateLink::resolve("mail", "mailto:a@b.c", &base).is_none());
        assert!(CandidateLink::resolve("js", "javascript:void(0)", &base).is_none());
        assert!(CandidateLink::resolve("empty", "   ", &base).is_none());
    }

    #[test]
    fn test_set_first_identity_wins() {
        let mut set = DiscoverySet::new();
        let first = DiscoveredLink::new(AnexoIdentity::AnexoI, url("https://a.test/1.pdf"));
        let second = DiscoveredLink::new(AnexoIdentity::AnexoI, url("https://a.test/2.pdf"));

        assert_eq!(set.insert(first.clone()), InsertOutcome::Added);
        assert_eq!(set.insert(second), InsertOutcome::DuplicateIdentity);
        assert_eq!(set.get(AnexoIdentity::AnexoI), Some(&first));
        assert_eq!(set.identity_count(), 1);
    }

    #[test]
    fn test_set_rejects_duplicate_url() {
        let mut set = DiscoverySet::new();
        set.insert(DiscoveredLink::new(
            AnexoIdentity::AnexoI,
            url("https://a.test/1.pdf"),
        ));
        let outcome = set.insert(DiscoveredLink::new(
            AnexoIdentity::AnexoII,
            url("https://a.test/1.pdf"),
        ));
        assert_eq!(outcome, InsertOutcome::DuplicateUrl);
        assert_eq!(set.missing_identities(), vec![AnexoIdentity::AnexoII]);
    }
}
