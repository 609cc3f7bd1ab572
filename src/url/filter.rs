//! Candidate selection for the next step
//!
//! Turns the raw outbound links of a page into the ordered candidate list the
//! walk picks from:
//!
//! 1. Link hygiene: http(s) with a host, no binary downloads, no
//!    `mailto:`/`tel:`/`javascript:` links, no fragments
//! 2. Duplicates collapsed, first occurrence wins
//! 3. Domain confinement (when enabled)
//! 4. Revisit avoidance (when enabled)
//! 5. Ignore rules
//! 6. Truncation to the per-page limit, keeping discovery order

use crate::url::domain::extract_domain;
use crate::url::ignore::IgnoreRuleSet;
use std::collections::HashSet;
use url::Url;

const EXCLUDED_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".zip", ".rar", ".exe",
];

const EXCLUDED_FRAGMENTS: &[&str] = &["mailto:", "tel:", "javascript:", "#"];

/// Why links were dropped while building a candidate list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rejections {
    pub malformed: usize,
    pub duplicate: usize,
    pub off_domain: usize,
    pub visited: usize,
    pub ignored: usize,
    pub truncated: usize,
}

/// Result of filtering one page's links
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    /// Eligible links in discovery order
    pub candidates: Vec<String>,
    /// Number of raw links handed in
    pub discovered: usize,
    pub rejections: Rejections,
}

impl CandidateSet {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }
}

/// Decides which discovered links may be visited next
#[derive(Debug, Clone)]
pub struct LinkFilter {
    ignore: IgnoreRuleSet,
    /// Host every candidate must share, when confinement is on
    confine_to: Option<String>,
    avoid_revisits: bool,
    max_links: usize,
}

impl LinkFilter {
    /// Creates a filter
    ///
    /// # Arguments
    ///
    /// * `ignore` - Compiled ignore rules
    /// * `confine_to` - Host candidates must have (None disables confinement)
    /// * `avoid_revisits` - Drop links already in the visited set
    /// * `max_links` - Maximum number of candidates kept
    pub fn new(
        ignore: IgnoreRuleSet,
        confine_to: Option<String>,
        avoid_revisits: bool,
        max_links: usize,
    ) -> Self {
        Self {
            ignore,
            confine_to: confine_to.map(|host| host.to_lowercase()),
            avoid_revisits,
            max_links,
        }
    }

    pub fn ignore_rules(&self) -> &IgnoreRuleSet {
        &self.ignore
    }

    /// Filters raw links into the candidate list
    pub fn select(&self, links: &[String], visited: &HashSet<String>) -> CandidateSet {
        let mut set = CandidateSet {
            discovered: links.len(),
            ..Default::default()
        };
        let mut seen = HashSet::new();

        for link in links {
            let link = link.trim();

            let Some(domain) = hygienic_domain(link) else {
                set.rejections.malformed += 1;
                continue;
            };

            if !seen.insert(link) {
                set.rejections.duplicate += 1;
                continue;
            }

            if let Some(host) = &self.confine_to {
                if &domain != host {
                    set.rejections.off_domain += 1;
                    continue;
                }
            }

            if self.avoid_revisits && visited.contains(link) {
                set.rejections.visited += 1;
                continue;
            }

            if self.ignore.is_ignored(link) {
                set.rejections.ignored += 1;
                continue;
            }

            if set.candidates.len() >= self.max_links {
                set.rejections.truncated += 1;
                continue;
            }

            set.candidates.push(link.to_string());
        }

        set
    }
}

/// Returns the link's domain if the link is a plain web page URL
fn hygienic_domain(link: &str) -> Option<String> {
    let lower = link.to_lowercase();

    if EXCLUDED_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return None;
    }

    if EXCLUDED_FRAGMENTS.iter().any(|frag| lower.contains(frag)) {
        return None;
    }

    let url = Url::parse(link).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    extract_domain(&url)
}
