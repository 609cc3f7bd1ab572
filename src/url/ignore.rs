use crate::config::{IgnorePattern, PatternKind};
use crate::url::matcher::CompiledPattern;
use crate::RuleError;

/// One enabled, successfully compiled ignore rule
#[derive(Debug, Clone)]
struct ActiveRule {
    compiled: CompiledPattern,
    kind: PatternKind,
    pattern: String,
    description: String,
}

/// All URL exclusion rules of a walk
///
/// Rules keep their configuration order and are OR-ed: the first match
/// excludes the URL. Disabled rules are dropped when the set is built and
/// rules that fail to compile are reported once and dropped as well.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRuleSet {
    rules: Vec<ActiveRule>,
}

impl IgnoreRuleSet {
    /// Builds the rule set, logging a warning for every rule that fails to compile
    pub fn new(patterns: &[IgnorePattern]) -> Self {
        let (set, errors) = Self::compile(patterns);
        for error in &errors {
            tracing::warn!("Ignore rule disabled: {}", error);
        }
        set
    }

    /// Builds the rule set and returns the compile errors instead of logging them
    pub fn compile(patterns: &[IgnorePattern]) -> (Self, Vec<RuleError>) {
        let mut rules = Vec::new();
        let mut errors = Vec::new();

        for pattern in patterns.iter().filter(|p| p.enabled) {
            match CompiledPattern::compile(pattern) {
                Ok(compiled) => rules.push(ActiveRule {
                    compiled,
                    kind: pattern.kind,
                    pattern: pattern.pattern.clone(),
                    description: pattern.description.clone(),
                }),
                Err(e) => errors.push(e),
            }
        }

        (Self { rules }, errors)
    }

    /// Returns true if any enabled rule matches the URL
    pub fn is_ignored(&self, url: &str) -> bool {
        match self.rules.iter().find(|rule| rule.compiled.is_match(url)) {
            Some(rule) => {
                tracing::debug!(
                    "Excluded by [{}] {} ({}): {}",
                    rule.kind,
                    rule.pattern,
                    rule.description,
                    url
                );
                true
            }
            None => false,
        }
    }

    /// Number of rules taking part in matching
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rule_set_ignores_nothing() {
        let set = IgnoreRuleSet::new(&[]);
        assert!(set.is_empty());
        assert!(!set.is_ignored("https://example.com/logout"));
    }

    #[test]
    fn test_all_disabled_ignores_nothing() {
        let set = IgnoreRuleSet::new(&[
            IgnorePattern::new("logout", PatternKind::Contains).disabled(),
            IgnorePattern::new(".*", PatternKind::Regex).disabled(),
        ]);
        assert!(set.is_empty());
        assert!(!set.is_ignored("https://example.com/logout"));
    }

    #[test]
    fn test_any_rule_excludes() {
        let set = IgnoreRuleSet::new(&[
            IgnorePattern::new("logout", PatternKind::Contains),
            IgnorePattern::new(".pdf", PatternKind::EndsWith),
        ]);
        assert!(set.is_ignored("https://example.com/logout"));
        assert!(set.is_ignored("https://example.com/a.pdf"));
        assert!(!set.is_ignored("https://example.com/about"));
    }

    #[test]
    fn test_is_ignored_is_repeatable() {
        let set = IgnoreRuleSet::new(&[IgnorePattern::new("admin", PatternKind::Contains)]);
        let url = "https://example.com/admin/panel";
        assert_eq!(set.is_ignored(url), set.is_ignored(url));
        assert_eq!(set.is_ignored("https://example.com/"), set.is_ignored("https://example.com/"));
    }

    #[test]
    fn test_disabling_a_rule_removes_its_contribution() {
        let enabled = IgnorePattern::new("admin", PatternKind::Contains);
        let url = "https://example.com/admin";

        assert!(IgnoreRuleSet::new(&[enabled.clone()]).is_ignored(url));
        assert!(!IgnoreRuleSet::new(&[enabled.disabled()]).is_ignored(url));
    }

    #[test]
    fn test_broken_rule_is_skipped_others_still_apply() {
        let (set, errors) = IgnoreRuleSet::compile(&[
            IgnorePattern::new("(unclosed", PatternKind::Regex),
            IgnorePattern::new("logout", PatternKind::Contains),
        ]);

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], RuleError::InvalidRegex { .. }));
        assert_eq!(set.len(), 1);
        assert!(set.is_ignored("https://example.com/logout"));
        assert!(!set.is_ignored("https://example.com/(unclosed"));
    }
}
