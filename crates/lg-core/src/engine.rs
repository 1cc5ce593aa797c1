//! Active rule set with lock-free hot swaps
//!
//! The engine starts empty (everything is allowed) and is replaced wholesale
//! whenever a new rule set finishes compiling:
//!
//! ```text
//! Request  -> Engine::classify() -> ArcSwap::load() -> RuleSet (old or new)
//! Refresh  -> Engine::install()  -> ArcSwap::store() -> old set dropped
//! ```
//!
//! A reader holds its own `Arc` for the whole evaluation, so a concurrent
//! swap cannot mix exceptions of one set with block rules of another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::matcher::Matcher;
use crate::types::{MatchDecision, RuleCounts, RuleSet};

/// Process-wide holder of the rule set used to answer queries.
pub struct Engine {
    active: ArcSwap<RuleSet>,
    generation: AtomicU64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with no rules loaded.
    pub fn new() -> Self {
        Self {
            active: ArcSwap::from_pointee(RuleSet::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Classify a request URI.
    ///
    /// Never performs I/O and never fails. Absent or empty input is allowed.
    pub fn classify<'u>(&self, uri: impl Into<Option<&'u str>>) -> MatchDecision {
        let rules = self.active.load();
        Matcher::new(&rules).match_request(uri.into())
    }

    /// Convenience for request hooks: should this request be aborted?
    pub fn should_block<'u>(&self, uri: impl Into<Option<&'u str>>) -> bool {
        self.classify(uri).is_block()
    }

    /// Replace the active rule set and return the new generation.
    pub fn install(&self, rules: RuleSet) -> u64 {
        let counts = rules.counts();
        self.active.store(Arc::new(rules));
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!(
            "installed rule set generation {} ({} block, {} exceptions)",
            generation,
            counts.block,
            counts.exception
        );
        generation
    }

    /// Current rule set, pinned for as long as the caller keeps it.
    pub fn snapshot(&self) -> Arc<RuleSet> {
        self.active.load_full()
    }

    /// Number of installs so far; 0 means nothing has loaded yet.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_loaded(&self) -> bool {
        self.generation() > 0
    }

    pub fn counts(&self) -> RuleCounts {
        self.active.load().counts()
    }
}
