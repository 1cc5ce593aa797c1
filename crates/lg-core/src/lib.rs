//! ListGuard Core Library
//!
//! This crate provides the request matching engine for the ListGuard
//! content filter.
//!
//! # Architecture
//!
//! A filter list is compiled (by `lg-compiler`) into a [`RuleSet`]: an
//! immutable pair of block and exception rule collections. The [`Engine`]
//! holds the active rule set behind an atomically swappable handle, so the
//! request path never locks and never observes a half-built set.
//!
//! # Modules
//!
//! - `types`: Compiled rules, rule sets and match decisions
//! - `url`: Host extraction without allocations
//! - `matcher`: Exception-before-block evaluation over one rule set
//! - `engine`: Process-wide active rule set with lock-free swaps

pub mod engine;
pub mod matcher;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use engine::Engine;
pub use matcher::Matcher;
pub use types::{FilterRule, MatchDecision, RuleCounts, RuleKind, RuleSet};
