use lg_core::{FilterRule, RuleSet};

const MIN_TOKEN_LEN: usize = 3;

/// Per-list parse counters, for diagnostics only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    pub lines: usize,
    pub comments: usize,
    pub skipped: usize,
    pub block_rules: usize,
    pub exception_rules: usize,
}

/// Parse a filter list. Never fails; unusable lines are skipped.
pub fn parse_filter_list(text: &str) -> RuleSet {
    parse_with_stats(text).0
}

pub fn parse_with_stats(text: &str) -> (RuleSet, ParseStats) {
    let mut rules = RuleSet::default();
    let mut stats = ParseStats::default();

    for raw_line in text.lines() {
        stats.lines += 1;
        let line = raw_line.trim();

        match parse_line(line) {
            ParsedLine::Comment => stats.comments += 1,
            ParsedLine::Skip => stats.skipped += 1,
            ParsedLine::Block(rule) => rules.block.push(rule),
            ParsedLine::Exception(rule) => rules.exceptions.push(rule),
        }
    }

    stats.block_rules = rules.block.len();
    stats.exception_rules = rules.exceptions.len();

    log::debug!(
        "parsed {} lines: {} block, {} exceptions, {} comments, {} skipped",
        stats.lines,
        stats.block_rules,
        stats.exception_rules,
        stats.comments,
        stats.skipped
    );

    (rules, stats)
}

#[derive(Debug, PartialEq, Eq)]
enum ParsedLine {
    Comment,
    Skip,
    Block(FilterRule),
    Exception(FilterRule),
}

fn parse_line(line: &str) -> ParsedLine {
    if line.is_empty() || line.starts_with('!') {
        return ParsedLine::Comment;
    }

    // Exceptions only support the `||domain` shape
    if let Some(rest) = line.strip_prefix("@@") {
        return match parse_host_anchor_rule(rest.trim()) {
            Some(domain) => ParsedLine::Exception(FilterRule::domain(domain)),
            None => ParsedLine::Skip,
        };
    }

    // `||` without a domain falls through to the token rules
    if let Some(domain) = parse_host_anchor_rule(line) {
        return ParsedLine::Block(FilterRule::domain(domain));
    }

    if line.contains('/') || line.contains('*') {
        return match parse_pattern_token(line) {
            Some(token) => ParsedLine::Block(FilterRule::substring(&token)),
            None => ParsedLine::Skip,
        };
    }

    if is_hostname_like(line) {
        return ParsedLine::Block(FilterRule::substring(line));
    }

    ParsedLine::Skip
}

/// Domain of a `||domain^` rule: everything up to the first `^` or `/`.
fn parse_host_anchor_rule(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("||")?;
    let end = rest.find(|ch: char| ch == '^' || ch == '/').unwrap_or(rest.len());
    let domain = &rest[..end];

    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}

/// Token of a path or wildcard rule with `*` and `^` removed.
fn parse_pattern_token(line: &str) -> Option<String> {
    let token: String = line.chars().filter(|&ch| ch != '*' && ch != '^').collect();
    let token = token.trim();

    if token.chars().count() < MIN_TOKEN_LEN || token.starts_with('@') {
        return None;
    }

    Some(token.to_string())
}

/// Bare token of word characters, dots and hyphens.
fn is_hostname_like(line: &str) -> bool {
    line.chars().count() >= MIN_TOKEN_LEN
        && line
            .chars()
            .all(|ch| ch.is_alphanumeric() || ch == '_' || ch == '.' || ch == '-')
}
