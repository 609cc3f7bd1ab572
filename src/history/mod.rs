//! Walk history
//!
//! Every step, action attempt and restart of a walk leaves one immutable
//! record. The [`HistoryRecorder`] is written only by the walk itself; when
//! the walk ends its records are handed over as a [`CrawlReport`].

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// One walk step
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// 1-based step number
    pub step: u32,
    /// Page the step ran on
    pub url: String,
    pub timestamp: DateTime<Utc>,
    /// Raw links reported by the driver
    pub links_discovered: usize,
    /// Candidates left after filtering
    pub links_found: usize,
    pub selected_link: Option<String>,
    pub domain: String,
    pub action_performed: bool,
    pub restart_occurred: bool,
    pub instrumentation_ready: bool,
    pub detected_tags: Vec<String>,
    pub title: Option<String>,
    /// Cookie names and values, when cookie logging is on
    pub cookies: Vec<(String, String)>,
}

/// One action attempt
#[derive(Debug, Clone, PartialEq)]
pub struct ActionHistoryEntry {
    pub step: u32,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub action_name: String,
    pub description: String,
    /// All inputs with a value were set and the click (if any) succeeded
    pub success: bool,
    pub inputs_total: usize,
    pub inputs_successful: usize,
    pub click_attempted: bool,
    pub click_successful: bool,
}

/// One session reset
#[derive(Debug, Clone, PartialEq)]
pub struct RestartHistoryEntry {
    pub step: u32,
    pub timestamp: DateTime<Utc>,
    /// 1-based ordinal of this restart within the walk
    pub restart_count: u32,
    pub visited_urls_before: usize,
    /// The driver confirmed the session state was cleared
    pub success: bool,
    pub next_restart_step: Option<u32>,
    pub error: Option<String>,
}

/// Why a walk ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Every step of the budget was used
    MaxStepsReached,
    /// No eligible link was left at `step`
    DeadEnd { step: u32, url: String },
    /// Stop was requested between steps
    Cancelled,
    /// The browser driver became unusable
    DriverFailure(String),
}

impl Termination {
    /// Short machine-friendly label
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxStepsReached => "max_steps",
            Self::DeadEnd { .. } => "dead_end",
            Self::Cancelled => "cancelled",
            Self::DriverFailure(_) => "driver_failure",
        }
    }

    /// Returns true if the walk ended because of an error
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::DriverFailure(_))
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxStepsReached => write!(f, "step budget exhausted"),
            Self::DeadEnd { step, url } => {
                write!(f, "dead end at step {} ({})", step, url)
            }
            Self::Cancelled => write!(f, "cancelled"),
            Self::DriverFailure(reason) => write!(f, "browser driver failure: {}", reason),
        }
    }
}

/// Append-only log of a walk in progress
#[derive(Debug, Clone, Default)]
pub struct HistoryRecorder {
    steps: Vec<HistoryEntry>,
    actions: Vec<ActionHistoryEntry>,
    restarts: Vec<RestartHistoryEntry>,
}

impl HistoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_step(&mut self, entry: HistoryEntry) {
        self.steps.push(entry);
    }

    pub(crate) fn record_action(&mut self, entry: ActionHistoryEntry) {
        self.actions.push(entry);
    }

    pub(crate) fn record_restart(&mut self, entry: RestartHistoryEntry) {
        self.restarts.push(entry);
    }

    pub fn steps(&self) -> &[HistoryEntry] {
        &self.steps
    }

    pub fn actions(&self) -> &[ActionHistoryEntry] {
        &self.actions
    }

    pub fn restarts(&self) -> &[RestartHistoryEntry] {
        &self.restarts
    }

    /// Closes the log and packages it for reporting
    pub fn into_report(
        self,
        start_url: String,
        termination: Termination,
        started_at: DateTime<Utc>,
    ) -> CrawlReport {
        CrawlReport {
            start_url,
            termination,
            started_at,
            finished_at: Utc::now(),
            steps: self.steps,
            actions: self.actions,
            restarts: self.restarts,
        }
    }
}

/// Everything a finished walk hands to reporting
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub start_url: String,
    pub termination: Termination,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub steps: Vec<HistoryEntry>,
    pub actions: Vec<ActionHistoryEntry>,
    pub restarts: Vec<RestartHistoryEntry>,
}

impl CrawlReport {
    /// Distinct pages steps ran on
    pub fn distinct_pages(&self) -> BTreeSet<&str> {
        self.steps.iter().map(|s| s.url.as_str()).collect()
    }

    /// Steps per domain
    pub fn domain_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for step in &self.steps {
            *counts.entry(step.domain.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Links the walk actually followed, in order
    pub fn followed_links(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter_map(|s| s.selected_link.as_deref())
            .collect()
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
