//! Tag-Walker: a randomized, config-governed site walker
//!
//! This crate walks a website's link graph one page at a time, choosing the
//! next page at random, filling in configured forms along the way and
//! periodically resetting the browser session. It exists to exercise
//! client-side marketing instrumentation under realistic interaction.

pub mod actions;
pub mod config;
pub mod crawler;
pub mod driver;
pub mod history;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Tag-Walker operations
#[derive(Debug, Error)]
pub enum WalkerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser driver error: {0}")]
    Driver(#[from] driver::DriverError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse rule file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid restart range: {0}")]
    InvalidRestartRange(String),
}

/// Errors raised while compiling an ignore rule
///
/// These never stop a walk: the offending rule is reported and then treated
/// as non-matching.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },

    #[error("Invalid wildcard pattern '{pattern}': {source}")]
    InvalidWildcard {
        pattern: String,
        source: regex::Error,
    },
}

/// Result type alias for Tag-Walker operations
pub type Result<T> = std::result::Result<T, WalkerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{RuleConfig, Settings};
pub use crawler::{run_walk, CrawlStateMachine};
pub use driver::BrowserDriver;
pub use history::{CrawlReport, Termination};
pub use state::{CrawlPhase, CrawlState};
