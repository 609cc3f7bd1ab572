//! Periodic session resets
//!
//! When enabled, a walk drops its browser session state every few steps and
//! starts over from the start URL. The interval is drawn again after every
//! restart from the configured range.

use rand::Rng;

use crate::config::{RestartConfig, RestartRange};
use crate::driver::BrowserDriver;
use crate::state::CrawlState;

/// What a reset did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetOutcome {
    /// 1-based ordinal of this restart
    pub ordinal: u32,
    /// Visited pages forgotten by the reset
    pub visited_before: usize,
    /// The driver confirmed it cleared cookies and storage
    pub session_cleared: bool,
}

/// Decides when a reset is due and performs it
#[derive(Debug, Clone)]
pub struct RestartScheduler {
    enabled: bool,
    range: RestartRange,
    next_restart_step: Option<u32>,
    restart_count: u32,
}

impl RestartScheduler {
    pub fn new(config: &RestartConfig) -> Self {
        Self {
            enabled: config.enabled,
            range: config.range,
            next_restart_step: None,
            restart_count: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn next_restart_step(&self) -> Option<u32> {
        self.next_restart_step
    }

    /// Resets performed so far
    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    /// Returns true if a reset is due at `current_step`
    pub fn should_restart(&self, current_step: u32) -> bool {
        self.enabled && matches!(self.next_restart_step, Some(next) if current_step >= next)
    }

    /// Schedules the next reset a random number of steps after `current_step`
    ///
    /// The offset is drawn uniformly from the inclusive restart range.
    ///
    /// # Returns
    ///
    /// The scheduled step, or None when restarts are disabled
    pub fn schedule_next<R: Rng + ?Sized>(&mut self, current_step: u32, rng: &mut R) -> Option<u32> {
        if !self.enabled {
            return None;
        }

        let offset = rng.gen_range(self.range.min..=self.range.max);
        let next = current_step.saturating_add(offset);
        self.next_restart_step = Some(next);
        tracing::debug!("Next restart scheduled at step {}", next);
        Some(next)
    }

    /// Clears the browser session, forgets visited pages and returns to the start URL
    ///
    /// The in-memory reset always happens, even if the driver fails to clear
    /// its session state.
    pub async fn perform_reset<D: BrowserDriver + ?Sized>(
        &mut self,
        driver: &mut D,
        state: &mut CrawlState,
    ) -> ResetOutcome {
        let session_cleared = driver.clear_session_state().await;
        if !session_cleared {
            tracing::warn!("Browser session state could not be cleared");
        }

        let visited_before = state.reset_to_start();
        self.restart_count += 1;

        tracing::info!(
            "Restart #{}: forgot {} visited pages, back to {}",
            self.restart_count,
            visited_before,
            state.start_url()
        );

        ResetOutcome {
            ordinal: self.restart_count,
            visited_before,
            session_cleared,
        }
    }
}
