//! ListGuard Filter List Compiler
//!
//! This crate compiles EasyList-style filter lists into a [`RuleSet`].
//! Only the network-blocking subset is understood; everything else is
//! dropped line by line without failing the list.
//!
//! [`RuleSet`]: lg_core::RuleSet

pub mod optimizer;
pub mod parser;

pub use optimizer::{optimize_rules, OptimizeStats};
pub use parser::{parse_filter_list, parse_with_stats, ParseStats};
