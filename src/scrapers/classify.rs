//! Heuristic classification of document links into Anexo I / Anexo II.
//!
//! The source page does not mark its attachments, so identity is inferred
//! from anchor text and hrefs in tiers, strongest first:
//!
//! 1. an explicit numeral marker (`Anexo II`, `anexo_ii.pdf`, `AnexoI.pdf`)
//! 2. a standalone `i` / `ii` token in the cleaned file name
//! 3. DOM position, for rendered pages only (see [`positional_fallback`])
//!
//! Anything that carries neither the attachment marker nor a procedure-list
//! keyword is rejected before tier 1.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::models::{AnexoIdentity, CandidateLink, DiscoveredLink, DiscoverySet};
use crate::utils::clean_label_filename;

/// Token meaning "attachment".
const ATTACHMENT_MARKER: &str = "anexo";

/// `ii` must be tested before `i`: the second is a prefix of the first.
static ANEXO_II: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"anexo[\s_.\-]*ii(?:[^a-z0-9]|$)").unwrap());
static ANEXO_I: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"anexo[\s_.\-]*i(?:[^a-z0-9]|$)").unwrap());

/// How an identity was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTier {
    ExplicitMarker,
    FilenameHeuristic,
    Positional,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::ExplicitMarker => "explicit_marker",
            MatchTier::FilenameHeuristic => "filename_heuristic",
            MatchTier::Positional => "positional",
        }
    }
}

/// Outcome of classifying one document link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Identified {
        identity: AnexoIdentity,
        tier: MatchTier,
    },
    /// Looks like an attachment but neither numeral tier could decide which.
    Unresolved,
    /// No attachment marker and no procedure-list keyword.
    Rejected,
}

impl Classification {
    pub fn identity(&self) -> Option<AnexoIdentity> {
        match self {
            Classification::Identified { identity, .. } => Some(*identity),
            _ => None,
        }
    }
}

/// Textual classifier for candidate links.
#[derive(Debug, Clone)]
pub struct Classifier {
    /// Lowercase, without the leading dot.
    extension: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new("pdf")
    }
}

impl Classifier {
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_lowercase(),
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Whether the URL path ends with the document extension.
    ///
    /// Query string and fragment are ignored.
    pub fn is_document(&self, url: &Url) -> bool {
        let path = url.path().to_lowercase();
        path.strip_suffix(&self.extension)
            .is_some_and(|rest| rest.ends_with('.'))
    }

    /// Classify a candidate using the textual tiers.
    ///
    /// The positional tier is not applied here; it needs the whole pass.
    pub fn classify(&self, candidate: &CandidateLink) -> Classification {
        let label = fold(&candidate.label);
        let href = fold(&percent_decode(candidate.resolved_url.path()));

        let admitted = label.contains(ATTACHMENT_MARKER)
            || href.contains(ATTACHMENT_MARKER)
            || has_procedure_keyword(&label);
        if !admitted {
            return Classification::Rejected;
        }

        if let Some(identity) = explicit_marker(&format!("{} {}", label, href)) {
            return Classification::Identified {
                identity,
                tier: MatchTier::ExplicitMarker,
            };
        }

        let filename = fold(&clean_label_filename(
            &candidate.label,
            &candidate.resolved_url,
            &self.extension,
        ));
        if let Some(identity) = numeral_token(&filename) {
            return Classification::Identified {
                identity,
                tier: MatchTier::FilenameHeuristic,
            };
        }

        Classification::Unresolved
    }
}

/// Explicit `anexo <numeral>` marker. `ii` wins over `i`.
fn explicit_marker(text: &str) -> Option<AnexoIdentity> {
    if ANEXO_II.is_match(text) {
        Some(AnexoIdentity::AnexoII)
    } else if ANEXO_I.is_match(text) {
        Some(AnexoIdentity::AnexoI)
    } else {
        None
    }
}

/// Standalone roman numeral token in a cleaned file name.
fn numeral_token(filename: &str) -> Option<AnexoIdentity> {
    let tokens: Vec<&str> = filename
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.contains(&"ii") {
        Some(AnexoIdentity::AnexoII)
    } else if tokens.contains(&"i") {
        Some(AnexoIdentity::AnexoI)
    } else {
        None
    }
}

/// "Rol de procedimentos" and friends.
fn has_procedure_keyword(label: &str) -> bool {
    label
        .split(|c: char| !c.is_alphanumeric())
        .any(|t| t == "rol" || t.starts_with("procedimento"))
}

/// Positional fallback: hand out identities by DOM order.
///
/// Only for rendered pages. Walks the pass's unclassified document links in
/// the order they appeared and gives each the next identity still missing from
/// `found`, `AnexoI` first. Stops after two assignments. Links whose URL is
/// already in `found` are skipped.
///
/// Depends entirely on DOM order. Kept apart from the textual tiers so it can
/// be switched off on its own.
pub fn positional_fallback(
    unclassified: &[CandidateLink],
    found: &DiscoverySet,
) -> Vec<DiscoveredLink> {
    let mut missing = found.missing_identities().into_iter();
    let mut assigned: Vec<DiscoveredLink> = Vec::new();

    for (rank, candidate) in unclassified.iter().enumerate() {
        if assigned.len() == 2 {
            break;
        }
        let url = &candidate.resolved_url;
        if found.contains_url(url) || assigned.iter().any(|l| &l.url == url) {
            continue;
        }
        let Some(identity) = missing.next() else {
            break;
        };

        debug!(
            "Positional fallback: unclassified link #{} ({}) assigned to {}",
            rank, url, identity
        );
        assigned.push(DiscoveredLink::new(identity, url.clone()));
    }

    assigned
}

/// Lowercase and strip the Portuguese diacritics.
fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            c => c,
        })
        .collect()
}

fn percent_decode(text: &str) -> Cow<'_, str> {
    urlencoding::decode(text).unwrap_or(Cow::Borrowed(text))
}
