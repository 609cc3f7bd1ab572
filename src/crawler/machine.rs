//! The walk loop
//!
//! Each step either resets the session (when a restart is due) or visits the
//! current page:
//!
//! 1. Load the page, retrying a bounded number of times
//! 2. Run the actions bound to its URL
//! 3. Collect its links and filter them into candidates
//! 4. Pick one candidate at random and move there
//!
//! A page without candidates ends the walk as a dead end. A lost browser
//! session ends it as a driver failure. Either way the driver is shut down
//! and the history is handed back as a [`CrawlReport`].

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::actions::ActionResolver;
use crate::config::{CrawlConfig, RestartConfig, RuleConfig};
use crate::crawler::restart::RestartScheduler;
use crate::crawler::signal::StopSignal;
use crate::driver::{BrowserDriver, DriverError, RenderedPage};
use crate::history::{CrawlReport, HistoryEntry, HistoryRecorder, RestartHistoryEntry, Termination};
use crate::state::{CrawlPhase, CrawlState};
use crate::url::{domain_of, IgnoreRuleSet, LinkFilter};
use crate::Result;

/// How a single step ended
#[derive(Debug)]
enum StepOutcome {
    Continue,
    DeadEnd,
    Fatal(String),
}

/// Sequences a walk over one browser driver
///
/// The machine exclusively owns the walk state, the history and the random
/// source. Every random draw of the walk (input values, link choice, restart
/// intervals) comes from `rng`, so a seeded generator replays a walk exactly.
pub struct CrawlStateMachine<D: BrowserDriver, R: Rng> {
    config: CrawlConfig,
    rules: Arc<RuleConfig>,
    filter: LinkFilter,
    restarts: RestartScheduler,
    state: CrawlState,
    history: HistoryRecorder,
    driver: D,
    rng: R,
    stop: StopSignal,
    interaction_warned: bool,
}

impl<D: BrowserDriver, R: Rng> CrawlStateMachine<D, R> {
    /// Prepares a walk
    ///
    /// Compiles the ignore rules and schedules the first restart. Nothing is
    /// loaded until [`run`](Self::run).
    ///
    /// # Arguments
    ///
    /// * `config` - Walk parameters
    /// * `restart` - Restart schedule
    /// * `rules` - Word lists, ignore patterns and actions
    /// * `driver` - Browser to walk with
    /// * `rng` - Source of every random draw
    pub fn new(
        config: CrawlConfig,
        restart: &RestartConfig,
        rules: Arc<RuleConfig>,
        driver: D,
        mut rng: R,
    ) -> Result<Self> {
        let state = CrawlState::new(&config.start_url)?;

        let confine_to = config
            .stay_in_domain
            .then(|| state.start_host().to_string());
        let filter = LinkFilter::new(
            IgnoreRuleSet::new(&rules.ignore_patterns),
            confine_to,
            config.avoid_revisits,
            config.max_links_per_page,
        );

        let mut restarts = RestartScheduler::new(restart);
        if let Some(first) = restarts.schedule_next(0, &mut rng) {
            tracing::info!("First restart scheduled at step {}", first);
        }

        Ok(Self {
            config,
            rules,
            filter,
            restarts,
            state,
            history: HistoryRecorder::new(),
            driver,
            rng,
            stop: StopSignal::never(),
            interaction_warned: false,
        })
    }

    /// Uses `stop` to end the walk early
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    pub fn restart_scheduler(&self) -> &RestartScheduler {
        &self.restarts
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Runs the walk to completion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - The walk ended (budget, dead end, stop or driver failure)
    /// * `Err(WalkerError)` - The machine was run twice
    pub async fn run(&mut self) -> Result<CrawlReport> {
        let started_at = Utc::now();
        self.state.transition(CrawlPhase::Active)?;

        tracing::info!(
            "Starting walk at {} ({} steps, {}s delay, stay in domain: {})",
            self.state.start_url(),
            self.config.max_steps,
            self.config.delay_seconds,
            self.config.stay_in_domain
        );
        tracing::info!(
            "{} ignore rules active, {} actions configured",
            self.filter.ignore_rules().len(),
            self.rules.actions.iter().filter(|a| a.enabled).count()
        );

        let walked = self.step_loop().await;
        if let Err(e) = self.driver.shutdown().await {
            tracing::warn!("Browser driver did not shut down cleanly: {}", e);
        }
        let termination = walked?;
        self.state.transition(CrawlPhase::Terminated)?;

        tracing::info!(
            "Walk finished after {} steps: {}",
            self.history.steps().len(),
            termination
        );

        let history = std::mem::take(&mut self.history);
        Ok(history.into_report(
            self.state.start_url().to_string(),
            termination,
            started_at,
        ))
    }

    /// Takes steps until the walk ends
    async fn step_loop(&mut self) -> Result<Termination> {
        let delay = Duration::try_from_secs_f64(self.config.delay_seconds).unwrap_or_default();

        let termination = loop {
            if self.state.step() >= self.config.max_steps {
                break Termination::MaxStepsReached;
            }
            if self.stop.is_stopped() {
                tracing::info!("Stop requested, ending walk after step {}", self.state.step());
                break Termination::Cancelled;
            }

            let step = self.state.begin_step();
            let outcome = if self.restarts.should_restart(step) {
                self.restart_step(step).await?
            } else {
                self.visit_step(step).await
            };

            match outcome {
                StepOutcome::Continue => {}
                StepOutcome::DeadEnd => {
                    tracing::warn!("No eligible links left at step {}, ending walk", step);
                    break Termination::DeadEnd {
                        step,
                        url: self.state.current_url().to_string(),
                    };
                }
                StepOutcome::Fatal(reason) => {
                    tracing::error!("Browser driver failed at step {}: {}", step, reason);
                    break Termination::DriverFailure(reason);
                }
            }

            if step < self.config.max_steps {
                self.stop.sleep(delay).await;
            }
        };

        Ok(termination)
    }

    /// Resets the session; the step ends on the start URL without a link choice
    async fn restart_step(&mut self, step: u32) -> Result<StepOutcome> {
        tracing::info!("Step {}/{}: restarting browser session", step, self.config.max_steps);
        self.state.transition(CrawlPhase::Restarting)?;

        let outcome = self
            .restarts
            .perform_reset(&mut self.driver, &mut self.state)
            .await;
        let next_restart_step = self.restarts.schedule_next(step, &mut self.rng);

        self.state.transition(CrawlPhase::Active)?;

        if let Some(next) = next_restart_step {
            tracing::info!("Next restart scheduled at step {}", next);
        }

        self.history.record_restart(RestartHistoryEntry {
            step,
            timestamp: Utc::now(),
            restart_count: outcome.ordinal,
            visited_urls_before: outcome.visited_before,
            success: outcome.session_cleared,
            next_restart_step,
            error: (!outcome.session_cleared)
                .then(|| "browser session state could not be cleared".to_string()),
        });

        let mut entry = new_entry(step, self.state.current_url(), None);
        entry.restart_occurred = true;
        self.history.record_step(entry);

        Ok(StepOutcome::Continue)
    }

    /// Visits the current page and moves to one of its links
    async fn visit_step(&mut self, step: u32) -> StepOutcome {
        let url = self.state.current_url().to_string();
        tracing::info!("Step {}/{}: {}", step, self.config.max_steps, url);

        let mut page = match self.fetch_page(&url).await {
            Ok(page) => page,
            Err(e) if e.is_fatal() => return StepOutcome::Fatal(e.to_string()),
            Err(e) => {
                tracing::warn!("Giving up on {}: {}", url, e);
                self.history.record_step(new_entry(step, &url, None));
                return StepOutcome::DeadEnd;
            }
        };

        if page.instrumentation_ready {
            tracing::info!("Instrumentation ready: {}", page.detected_tags.join(", "));
        } else {
            tracing::debug!("No marketing instrumentation detected on {}", url);
        }

        // Page actions
        let mut action_performed = false;
        let resolver = ActionResolver::new(&self.rules);
        let applicable = resolver.applicable(&url);
        if !applicable.is_empty() {
            if self.driver.supports_interaction() {
                for action in applicable {
                    let entry = resolver
                        .execute(action, step, &url, &mut self.driver, &mut self.rng, &self.stop)
                        .await;
                    self.history.record_action(entry);
                }
                action_performed = true;

                match self.driver.current_url().await {
                    Ok(now) => {
                        if now != url {
                            tracing::info!("Actions moved the browser to {}", now);
                            // Title and tags were read from the page before the actions
                            page.final_url = now.clone();
                            page.title = None;
                            page.detected_tags.clear();
                            page.instrumentation_ready = false;
                            self.state.relocate(now);
                        }
                    }
                    Err(e) if e.is_fatal() => return StepOutcome::Fatal(e.to_string()),
                    Err(e) => tracing::warn!("Could not read the URL after actions: {}", e),
                }
            } else if !self.interaction_warned {
                tracing::warn!(
                    "Browser driver cannot fill forms; skipping {} matching actions",
                    applicable.len()
                );
                self.interaction_warned = true;
            }
        }

        let page_url = self.state.current_url().to_string();

        let cookies = if self.config.log_cookies {
            let cookies = self.driver.cookie_snapshot().await;
            tracing::debug!("{} cookies on {}", cookies.len(), page_url);
            for (name, value) in &cookies {
                tracing::debug!("  cookie {} = {}", name, value);
            }
            cookies
        } else {
            Vec::new()
        };

        let links = match self.driver.extract_links(&page).await {
            Ok(links) => links,
            Err(e) if e.is_fatal() => return StepOutcome::Fatal(e.to_string()),
            Err(e) => {
                tracing::warn!("Failed to read links from {}: {}", page_url, e);
                Vec::new()
            }
        };

        self.state.mark_visited(&page_url);
        let candidates = self.filter.select(&links, self.state.visited());
        tracing::debug!("Link rejections on {}: {:?}", page_url, candidates.rejections);
        tracing::info!(
            "{} links discovered, {} candidates",
            candidates.discovered,
            candidates.len()
        );

        let mut entry = new_entry(step, &page_url, Some(&page));
        entry.links_discovered = candidates.discovered;
        entry.links_found = candidates.len();
        entry.action_performed = action_performed;
        entry.cookies = cookies;

        let Some(selected) = candidates.candidates.choose(&mut self.rng).cloned() else {
            self.history.record_step(entry);
            return StepOutcome::DeadEnd;
        };

        tracing::info!("Selected {}", selected);
        entry.selected_link = Some(selected.clone());
        self.history.record_step(entry);
        self.state.advance_to(selected);

        StepOutcome::Continue
    }

    /// Loads a page, retrying recoverable failures
    async fn fetch_page(&mut self, url: &str) -> std::result::Result<RenderedPage, DriverError> {
        let attempts = self.config.fetch_retries + 1;
        let mut attempt = 1;
        loop {
            match self.driver.fetch_and_render(url).await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_fatal() || attempt >= attempts => return Err(e),
                Err(e) => {
                    tracing::warn!("Attempt {}/{} failed: {}", attempt, attempts, e);
                    attempt += 1;
                }
            }
        }
    }
}

/// A step entry with no links and no selection
fn new_entry(step: u32, url: &str, page: Option<&RenderedPage>) -> HistoryEntry {
    HistoryEntry {
        step,
        url: url.to_string(),
        timestamp: Utc::now(),
        links_discovered: 0,
        links_found: 0,
        selected_link: None,
        domain: domain_of(url).unwrap_or_default(),
        action_performed: false,
        restart_occurred: false,
        instrumentation_ready: page.is_some_and(|p| p.instrumentation_ready),
        detected_tags: page.map(|p| p.detected_tags.clone()).unwrap_or_default(),
        title: page.and_then(|p| p.title.clone()),
        cookies: Vec::new(),
    }
}
