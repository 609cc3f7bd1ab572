//! Configuration module for Tag-Walker
//!
//! Two files drive a walk:
//! - a TOML settings file with the walk parameters (start URL, step budget,
//!   restart schedule, driver and report options)
//! - a JSON rule file with word lists, ignore patterns and page actions
//!
//! # Example
//!
//! ```no_run
//! use tag_walker::config::{load_rules, load_settings};
//! use std::path::Path;
//!
//! let settings = load_settings(Path::new("walker.toml")).unwrap();
//! let rules = load_rules(Path::new(&settings.rules.path)).unwrap();
//! println!("{} actions configured", rules.actions.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ActionSpec, CrawlConfig, DriverConfig, DriverKind, IgnorePattern, InputSpec, OutputConfig,
    PatternKind, RestartConfig, RestartRange, RuleConfig, RulesConfig, Settings, TimingProfile,
    WordLists,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_rules, load_rules_with_hash, load_settings, parse_rules,
    write_sample_rules, SAMPLE_RULES,
};
pub use validation::{validate_rules, validate_settings, validate_start_url};
