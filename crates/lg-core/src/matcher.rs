//! Core Matching Engine
//!
//! This is the hot path - every request goes through here. The URI is
//! lower-cased once; every rule test after that is a plain substring
//! predicate and cannot fail.

use crate::types::{FilterRule, MatchDecision, RuleKind, RuleSet};
use crate::url::get_host_position;

// =============================================================================
// Candidate
// =============================================================================

/// A request URI prepared for matching.
#[derive(Debug, Clone)]
pub struct Candidate {
    url: String,
    host_start: usize,
    host_end: usize,
}

impl Candidate {
    /// Lower-case the URI and locate its host.
    pub fn new(uri: &str) -> Self {
        let url = uri.to_lowercase();
        let (host_start, host_end) = get_host_position(&url);
        Self {
            url,
            host_start,
            host_end,
        }
    }

    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.url[self.host_start..self.host_end]
    }
}

impl FilterRule {
    /// Test this rule against a prepared candidate.
    ///
    /// Domain rules look for the domain anywhere in the host, so
    /// `||example.com^` also hits `evil-example.com`. Paths are never
    /// consulted for domain rules.
    #[inline]
    pub fn matches(&self, candidate: &Candidate) -> bool {
        match self.kind() {
            RuleKind::Domain => candidate.host().contains(self.pattern()),
            RuleKind::Substring => candidate.url().contains(self.pattern()),
        }
    }
}

// =============================================================================
// Matcher
// =============================================================================

/// Evaluates requests against one rule set.
pub struct Matcher<'a> {
    rules: &'a RuleSet,
}

impl<'a> Matcher<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        Self { rules }
    }

    /// Match a request and return the decision.
    ///
    /// An absent or empty URI is allowed. Exceptions are checked first and
    /// win over any block rule.
    pub fn match_request(&self, uri: Option<&str>) -> MatchDecision {
        let uri = match uri {
            Some(uri) if !uri.is_empty() => uri,
            _ => return MatchDecision::Allow,
        };

        let candidate = Candidate::new(uri);
        self.match_candidate(&candidate)
    }

    pub fn match_candidate(&self, candidate: &Candidate) -> MatchDecision {
        if self.rules.exceptions.iter().any(|rule| rule.matches(candidate)) {
            return MatchDecision::Allow;
        }

        match self.rules.block.iter().find(|rule| rule.matches(candidate)) {
            Some(rule) => {
                log::trace!("{} blocked by {:?} rule {}", candidate.url(), rule.kind(), rule.pattern());
                MatchDecision::Block
            }
            None => MatchDecision::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(block: &[FilterRule], exceptions: &[FilterRule]) -> RuleSet {
        RuleSet::new(block.to_vec(), exceptions.to_vec())
    }

    #[test]
    fn test_empty_or_absent_uri_is_allowed() {
        let set = rules(&[FilterRule::substring("a")], &[]);
        let matcher = Matcher::new(&set);
        assert_eq!(matcher.match_request(None), MatchDecision::Allow);
        assert_eq!(matcher.match_request(Some("")), MatchDecision::Allow);
    }

    #[test]
    fn test_domain_rule_uses_host_containment() {
        let set = rules(&[FilterRule::domain("ads.example.com")], &[]);
        let matcher = Matcher::new(&set);

        assert_eq!(matcher.match_request(Some("https://ads.example.com/banner")), MatchDecision::Block);
        assert_eq!(matcher.match_request(Some("https://x.ads.example.com/")), MatchDecision::Block);
        assert_eq!(matcher.match_request(Some("https://notads.example.com/x")), MatchDecision::Block);
        assert_eq!(
            matcher.match_request(Some("https://example.com/ads.example.com-safe")),
            MatchDecision::Allow
        );
        assert_eq!(matcher.match_request(Some("https://example.com/")), MatchDecision::Allow);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let set = rules(&[FilterRule::domain("ads.example.com"), FilterRule::substring("/adbanner/")], &[]);
        let matcher = Matcher::new(&set);

        assert_eq!(matcher.match_request(Some("HTTPS://ADS.Example.COM/")), MatchDecision::Block);
        assert_eq!(matcher.match_request(Some("https://site.test/AdBanner/img.png")), MatchDecision::Block);
    }

    #[test]
    fn test_substring_rule_sees_path() {
        let set = rules(&[FilterRule::substring("adbanner")], &[]);
        let matcher = Matcher::new(&set);

        assert_eq!(matcher.match_request(Some("https://site.test/adbanner/img.png")), MatchDecision::Block);
        assert_eq!(matcher.match_request(Some("https://site.test/img.png")), MatchDecision::Allow);
    }

    #[test]
    fn test_exception_wins_over_block() {
        let set = rules(&[FilterRule::domain("example.com")], &[FilterRule::domain("cdn.example.com")]);
        let matcher = Matcher::new(&set);

        assert_eq!(matcher.match_request(Some("https://cdn.example.com/lib.js")), MatchDecision::Allow);
        assert_eq!(matcher.match_request(Some("https://www.example.com/lib.js")), MatchDecision::Block);
    }

    #[test]
    fn test_exception_alone_does_not_block() {
        let set = rules(&[], &[FilterRule::domain("cdn.example.com")]);
        let matcher = Matcher::new(&set);
        assert_eq!(matcher.match_request(Some("https://cdn.example.com/")), MatchDecision::Allow);
    }

    #[test]
    fn test_rule_order_does_not_matter() {
        let a = FilterRule::substring("track");
        let b = FilterRule::domain("ads.net");
        let forward = rules(&[a.clone(), b.clone()], &[]);
        let backward = rules(&[b, a], &[]);

        for uri in ["https://ads.net/", "https://x.com/track.js", "https://x.com/"] {
            assert_eq!(
                Matcher::new(&forward).match_request(Some(uri)),
                Matcher::new(&backward).match_request(Some(uri))
            );
        }
    }

    #[test]
    fn test_domain_rule_ignores_nested_urls_in_scheme_less_input() {
        let set = rules(&[FilterRule::domain("ads.example.com")], &[]);
        let matcher = Matcher::new(&set);

        assert_eq!(
            matcher.match_request(Some("ads.example.com/r?to=https://good.com/x")),
            MatchDecision::Block
        );
        assert_eq!(
            matcher.match_request(Some("x.com/?u=https://ads.example.com")),
            MatchDecision::Allow
        );
    }

    #[test]
    fn test_candidate_host() {
        let candidate = Candidate::new("https://User@CDN.Example.com:443/Path");
        assert_eq!(candidate.host(), "cdn.example.com");
        assert_eq!(candidate.url(), "https://user@cdn.example.com:443/path");
    }
}
