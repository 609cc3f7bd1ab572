//! Output handler traits and types
//!
//! This module defines the trait interface for report sinks and the summary
//! numbers they share.

use crate::config::{IgnorePattern, RuleConfig, Settings};
use crate::history::CrawlReport;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to format output: {0}")]
    Format(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Headline numbers of a finished walk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub start_url: String,
    pub termination: String,
    pub duration_seconds: i64,

    pub total_steps: usize,
    pub distinct_pages: usize,
    pub restarts: usize,
    pub instrumented_steps: usize,

    /// Steps per domain, most visited first
    pub domain_counts: Vec<(String, usize)>,

    pub actions_total: usize,
    pub actions_successful: usize,
    pub inputs_total: usize,
    pub inputs_successful: usize,
}

impl RunSummary {
    /// Aggregates a walk report
    pub fn from_report(report: &CrawlReport) -> Self {
        let mut domain_counts: Vec<(String, usize)> = report
            .domain_counts()
            .into_iter()
            .map(|(domain, count)| (domain.to_string(), count))
            .collect();
        // Stable sort keeps ties in alphabetical order
        domain_counts.sort_by(|a, b| b.1.cmp(&a.1));

        Self {
            start_url: report.start_url.clone(),
            termination: report.termination.to_string(),
            duration_seconds: report.duration().num_seconds(),
            total_steps: report.steps.len(),
            distinct_pages: report.distinct_pages().len(),
            restarts: report.restarts.len(),
            instrumented_steps: report
                .steps
                .iter()
                .filter(|s| s.instrumentation_ready)
                .count(),
            domain_counts,
            actions_total: report.actions.len(),
            actions_successful: report.actions.iter().filter(|a| a.success).count(),
            inputs_total: report.actions.iter().map(|a| a.inputs_total).sum(),
            inputs_successful: report.actions.iter().map(|a| a.inputs_successful).sum(),
        }
    }

    /// Share of inputs that were set, as a percentage
    pub fn input_success_rate(&self) -> f64 {
        if self.inputs_total == 0 {
            return 0.0;
        }
        (self.inputs_successful as f64 / self.inputs_total as f64) * 100.0
    }
}

/// Settings a report is written alongside
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    /// SHA-256 of the rule file
    pub config_hash: String,
    pub max_steps: u32,
    /// Restart interval, when restarts are enabled
    pub restart_range: Option<String>,
    /// Enabled ignore patterns
    pub ignore_patterns: Vec<IgnorePattern>,
}

impl RunContext {
    pub fn new(settings: &Settings, rules: &RuleConfig, config_hash: &str) -> Self {
        Self {
            config_hash: config_hash.to_string(),
            max_steps: settings.crawl.max_steps,
            restart_range: settings
                .restart
                .enabled
                .then(|| settings.restart.range.to_string()),
            ignore_patterns: rules
                .ignore_patterns
                .iter()
                .filter(|p| p.enabled)
                .cloned()
                .collect(),
        }
    }
}

/// A destination for finished walk reports
pub trait OutputHandler {
    /// Writes one report
    ///
    /// # Arguments
    ///
    /// * `report` - The finished walk
    /// * `context` - Settings the walk ran with
    fn write_report(&self, report: &CrawlReport, context: &RunContext) -> OutputResult<()>;
}
