use std::collections::HashSet;
use url::Url;

use super::CrawlPhase;
use crate::url::extract_domain;
use crate::{ConfigError, Result};

/// Mutable state of one walk
///
/// Owned by a single walk; the visited set and the current page are only
/// changed through the methods below.
#[derive(Debug, Clone)]
pub struct CrawlState {
    start_url: String,
    start_host: String,
    current_url: String,
    /// Number of steps taken so far
    step: u32,
    visited: HashSet<String>,
    phase: CrawlPhase,
}

impl CrawlState {
    /// Creates the state for a walk starting at `start_url`
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlState)` - In the `Init` phase with nothing visited
    /// * `Err(WalkerError)` - The start URL is not absolute or has no host
    pub fn new(start_url: &str) -> Result<Self> {
        let parsed = Url::parse(start_url)?;
        let start_host = extract_domain(&parsed).ok_or_else(|| {
            ConfigError::InvalidUrl(format!("start URL has no host: {}", start_url))
        })?;

        Ok(Self {
            start_url: start_url.to_string(),
            start_host,
            current_url: start_url.to_string(),
            step: 0,
            visited: HashSet::new(),
            phase: CrawlPhase::Init,
        })
    }

    pub fn start_url(&self) -> &str {
        &self.start_url
    }

    /// Lowercase host of the start URL
    pub fn start_host(&self) -> &str {
        &self.start_host
    }

    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    /// Steps taken so far
    pub fn step(&self) -> u32 {
        self.step
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn visited(&self) -> &HashSet<String> {
        &self.visited
    }

    pub fn has_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Starts the next step and returns its 1-based number
    pub(crate) fn begin_step(&mut self) -> u32 {
        self.step += 1;
        self.step
    }

    pub(crate) fn mark_visited(&mut self, url: &str) {
        self.visited.insert(url.to_string());
    }

    /// Records the current page as visited and moves to `next`
    pub(crate) fn advance_to(&mut self, next: String) {
        let previous = std::mem::replace(&mut self.current_url, next);
        self.visited.insert(previous);
    }

    /// Points the walk at `url` without marking anything visited
    pub(crate) fn relocate(&mut self, url: String) {
        self.current_url = url;
    }

    /// Forgets every visited page and returns to the start URL
    ///
    /// # Returns
    ///
    /// The number of visited pages before the reset
    pub(crate) fn reset_to_start(&mut self) -> usize {
        let before = self.visited.len();
        self.visited.clear();
        self.current_url = self.start_url.clone();
        before
    }

    pub(crate) fn transition(&mut self, next: CrawlPhase) -> Result<()> {
        self.phase = self.phase.transition(next)?;
        tracing::debug!("Walk phase: {}", self.phase);
        Ok(())
    }
}
