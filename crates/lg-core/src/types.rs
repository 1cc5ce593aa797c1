//! Core type definitions for ListGuard
//!
//! Rules are normalized (lower-cased) when they are built, so matching
//! only has to lower-case the candidate URI once.

// =============================================================================
// Filter Rules
// =============================================================================

/// How a compiled rule is tested against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// `||domain^` - the request host contains the domain
    Domain,
    /// Plain token - the full URI contains the token
    Substring,
}

/// A compiled matcher over a request URI.
///
/// Immutable once built: the pattern is private and only reachable through
/// the normalizing constructors.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterRule {
    kind: RuleKind,
    pattern: String,
}

impl FilterRule {
    /// Domain-anchored rule. The domain is lower-cased.
    pub fn domain(domain: &str) -> Self {
        Self {
            kind: RuleKind::Domain,
            pattern: domain.to_lowercase(),
        }
    }

    /// Substring rule. The token is lower-cased.
    pub fn substring(token: &str) -> Self {
        Self {
            kind: RuleKind::Substring,
            pattern: token.to_lowercase(),
        }
    }

    #[inline]
    pub fn kind(&self) -> RuleKind {
        self.kind
    }

    #[inline]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

// =============================================================================
// Rule Sets
// =============================================================================

/// Block and exception rules in force at one point in time.
///
/// Exceptions are always consulted before block rules. A set is built
/// wholesale and shared behind an `Arc`; it is never edited once installed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    pub block: Vec<FilterRule>,
    pub exceptions: Vec<FilterRule>,
}

impl RuleSet {
    pub fn new(block: Vec<FilterRule>, exceptions: Vec<FilterRule>) -> Self {
        Self { block, exceptions }
    }

    pub fn is_empty(&self) -> bool {
        self.block.is_empty() && self.exceptions.is_empty()
    }

    pub fn counts(&self) -> RuleCounts {
        RuleCounts {
            block: self.block.len(),
            exception: self.exceptions.len(),
        }
    }
}

/// Rule counts reported when a set is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleCounts {
    pub block: usize,
    pub exception: usize,
}

// =============================================================================
// Match Decision
// =============================================================================

/// Final decision for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDecision {
    /// No block rule matched, or an exception matched
    Allow,
    /// A block rule matched and no exception did
    Block,
}

impl MatchDecision {
    #[inline]
    pub fn is_block(self) -> bool {
        self == Self::Block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_normalize_case() {
        let rule = FilterRule::domain("Ads.Example.COM");
        assert_eq!(rule.kind(), RuleKind::Domain);
        assert_eq!(rule.pattern(), "ads.example.com");

        let rule = FilterRule::substring("/AdBanner/");
        assert_eq!(rule.kind(), RuleKind::Substring);
        assert_eq!(rule.pattern(), "/adbanner/");
    }

    #[test]
    fn test_rule_set_counts() {
        let set = RuleSet::new(
            vec![FilterRule::domain("a.com"), FilterRule::substring("track")],
            vec![FilterRule::domain("cdn.a.com")],
        );
        assert_eq!(set.counts(), RuleCounts { block: 2, exception: 1 });
        assert!(!set.is_empty());
        assert!(RuleSet::default().is_empty());
    }
}
