use crate::config::{IgnorePattern, PatternKind};
use crate::RuleError;
use regex::Regex;

/// An ignore rule compiled for repeated evaluation
///
/// Each pattern kind maps to exactly one variant, so adding a kind means
/// adding one variant and one arm in [`CompiledPattern::compile`].
#[derive(Debug, Clone)]
pub enum CompiledPattern {
    /// Substring test
    Contains(String),
    /// Whole-string equality
    Exact(String),
    /// Prefix equality
    StartsWith(String),
    /// Suffix equality
    EndsWith(String),
    /// Regular expression searched anywhere in the URL
    Regex(Regex),
    /// Glob translated to an anchored regular expression
    Wildcard(Regex),
}

impl CompiledPattern {
    /// Compiles a rule into its matcher
    ///
    /// # Returns
    ///
    /// * `Ok(CompiledPattern)` - Ready to evaluate
    /// * `Err(RuleError)` - The regex or wildcard could not be compiled
    pub fn compile(pattern: &IgnorePattern) -> Result<Self, RuleError> {
        let text = pattern.pattern.clone();
        match pattern.kind {
            PatternKind::Contains => Ok(Self::Contains(text)),
            PatternKind::Exact => Ok(Self::Exact(text)),
            PatternKind::StartsWith => Ok(Self::StartsWith(text)),
            PatternKind::EndsWith => Ok(Self::EndsWith(text)),
            PatternKind::Regex => Regex::new(&text)
                .map(Self::Regex)
                .map_err(|source| RuleError::InvalidRegex {
                    pattern: text,
                    source,
                }),
            PatternKind::Wildcard => Regex::new(&wildcard_to_regex(&text))
                .map(Self::Wildcard)
                .map_err(|source| RuleError::InvalidWildcard {
                    pattern: text,
                    source,
                }),
        }
    }

    /// Tests the URL against this pattern
    pub fn is_match(&self, url: &str) -> bool {
        match self {
            Self::Contains(p) => url.contains(p.as_str()),
            Self::Exact(p) => url == p,
            Self::StartsWith(p) => url.starts_with(p.as_str()),
            Self::EndsWith(p) => url.ends_with(p.as_str()),
            Self::Regex(re) | Self::Wildcard(re) => re.is_match(url),
        }
    }
}

/// Translates a glob into an anchored regular expression
///
/// Every regex metacharacter is escaped except `*` (any run of characters)
/// and `?` (exactly one character).
///
/// # Examples
///
/// ```
/// use tag_walker::url::wildcard_to_regex;
///
/// assert_eq!(wildcard_to_regex("*.pdf"), r"^.*\.pdf$");
/// assert_eq!(wildcard_to_regex("page?"), "^page.$");
/// ```
pub fn wildcard_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let mut buf = [0u8; 4];
    for c in glob.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    out.push('$');
    out
}

/// Checks whether a URL matches one ignore rule
///
/// Disabled rules never match. A rule whose regex or wildcard fails to
/// compile is reported as a warning and treated as non-matching.
///
/// # Examples
///
/// ```
/// use tag_walker::config::{IgnorePattern, PatternKind};
/// use tag_walker::url::matches;
///
/// let rule = IgnorePattern::new("https://example.com/*.pdf", PatternKind::Wildcard);
/// assert!(matches("https://example.com/documents/report.pdf", &rule));
/// assert!(!matches("https://example.com/report.html", &rule));
/// ```
pub fn matches(url: &str, pattern: &IgnorePattern) -> bool {
    if !pattern.enabled {
        return false;
    }

    match CompiledPattern::compile(pattern) {
        Ok(compiled) => compiled.is_match(url),
        Err(e) => {
            tracing::warn!("Skipping ignore rule: {}", e);
            false
        }
    }
}
