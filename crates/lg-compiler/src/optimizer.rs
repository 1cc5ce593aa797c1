use std::collections::HashSet;

use lg_core::{FilterRule, RuleSet};

pub struct OptimizeStats {
    pub before: usize,
    pub after: usize,
    pub deduped: usize,
}

/// Drop repeated rules, keeping the first occurrence of each.
///
/// Matching is a pure "any rule hits" test, so duplicates never change a
/// decision; they only cost scan time.
pub fn optimize_rules(rules: &mut RuleSet) -> OptimizeStats {
    let before = rules.block.len() + rules.exceptions.len();

    dedupe(&mut rules.block);
    dedupe(&mut rules.exceptions);

    let after = rules.block.len() + rules.exceptions.len();

    OptimizeStats {
        before,
        after,
        deduped: before - after,
    }
}

fn dedupe(rules: &mut Vec<FilterRule>) {
    let mut seen: HashSet<FilterRule> = HashSet::with_capacity(rules.len());
    rules.retain(|rule| seen.insert(rule.clone()));
}
