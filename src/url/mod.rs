//! URL handling module for Tag-Walker
//!
//! This module provides ignore-rule matching, domain extraction and the link
//! filter that turns a page's outbound links into next-step candidates.

mod domain;
mod filter;
mod ignore;
mod matcher;

// Re-export main functions
pub use domain::{domain_of, extract_domain};
pub use filter::{CandidateSet, LinkFilter, Rejections};
pub use ignore::IgnoreRuleSet;
pub use matcher::{matches, wildcard_to_regex, CompiledPattern};
