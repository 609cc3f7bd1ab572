//! Walk orchestration
//!
//! This module contains the walk itself:
//! - The step loop and its state machine
//! - Periodic session restarts
//! - The cooperative stop signal

mod machine;
mod restart;
mod signal;

pub use machine::CrawlStateMachine;
pub use restart::{ResetOutcome, RestartScheduler};
pub use signal::{stop_channel, StopHandle, StopSignal};

use rand::Rng;
use std::sync::Arc;

use crate::config::{RuleConfig, Settings};
use crate::driver::BrowserDriver;
use crate::history::CrawlReport;
use crate::Result;

/// Runs a complete walk
///
/// This is the main entry point for a walk. It will:
/// 1. Prepare the walk state, link filter and restart schedule
/// 2. Step through pages until the budget is used up, a dead end is hit,
///    `stop` fires or the driver fails
/// 3. Shut the driver down
///
/// # Arguments
///
/// * `settings` - Walk, restart and driver settings
/// * `rules` - Word lists, ignore patterns and actions
/// * `driver` - Browser to walk with
/// * `rng` - Source of every random draw
/// * `stop` - Ends the walk early at the next step boundary
///
/// # Returns
///
/// * `Ok(CrawlReport)` - The walk ended; see its termination
/// * `Err(WalkerError)` - The start URL was unusable
pub async fn run_walk<D, R>(
    settings: &Settings,
    rules: Arc<RuleConfig>,
    driver: D,
    rng: R,
    stop: StopSignal,
) -> Result<CrawlReport>
where
    D: BrowserDriver,
    R: Rng,
{
    let mut machine =
        CrawlStateMachine::new(settings.crawl.clone(), &settings.restart, rules, driver, rng)?
            .with_stop_signal(stop);
    machine.run().await
}
