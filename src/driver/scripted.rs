//! In-memory Browser Driver with scripted pages
//!
//! Serves a fixed link graph, fails where told to and records every call, so
//! walks can be run and checked without a browser or a network.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use super::{BrowserDriver, DriverError, RenderedPage};

/// One page of the scripted site
#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    pub links: Vec<String>,
    pub title: Option<String>,
    pub detected_tags: Vec<String>,
}

impl ScriptedPage {
    pub fn with_links(links: &[&str]) -> Self {
        Self {
            links: links.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }
}

/// A call received by a [`ScriptedDriver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Fetch(String),
    ExtractLinks(String),
    SetInput { locator: String, value: String },
    Click(String),
    ClearSession,
    CurrentUrl,
    CookieSnapshot,
    Shutdown,
}

/// Fake driver for deterministic walks
///
/// # Example
///
/// ```
/// use tag_walker::driver::ScriptedDriver;
///
/// let driver = ScriptedDriver::new()
///     .with_page("https://example.com/", &["https://example.com/a"])
///     .with_page("https://example.com/a", &[]);
/// assert!(driver.calls().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    pages: HashMap<String, ScriptedPage>,
    /// Remaining transient failures per URL
    failures: HashMap<String, u32>,
    fatal_urls: HashSet<String>,
    failing_locators: HashSet<String>,
    /// Locator -> URL the browser shows after clicking it
    click_targets: HashMap<String, String>,
    cookies: Vec<(String, String)>,
    no_interaction: bool,
    clear_fails: bool,
    current_url_fails: bool,
    current: Option<String>,
    calls: Vec<DriverCall>,
    shut_down: bool,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a page linking to `links`
    pub fn with_page(self, url: &str, links: &[&str]) -> Self {
        self.with_scripted_page(url, ScriptedPage::with_links(links))
    }

    pub fn with_scripted_page(mut self, url: &str, page: ScriptedPage) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }

    /// Makes the next `times` fetches of `url` fail
    pub fn failing(mut self, url: &str, times: u32) -> Self {
        self.failures.insert(url.to_string(), times);
        self
    }

    /// Makes every fetch of `url` lose the browser session
    pub fn fatal_on(mut self, url: &str) -> Self {
        self.fatal_urls.insert(url.to_string());
        self
    }

    /// Makes inputs and clicks at `locator` fail
    pub fn failing_locator(mut self, locator: &str) -> Self {
        self.failing_locators.insert(locator.to_string());
        self
    }

    /// Makes a successful click at `locator` navigate to `url`
    pub fn click_navigates(mut self, locator: &str, url: &str) -> Self {
        self.click_targets
            .insert(locator.to_string(), url.to_string());
        self
    }

    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push((name.to_string(), value.to_string()));
        self
    }

    /// Behaves like a driver that cannot fill forms
    pub fn without_interaction(mut self) -> Self {
        self.no_interaction = true;
        self
    }

    /// Makes `clear_session_state` report failure
    pub fn with_failing_clear(mut self) -> Self {
        self.clear_fails = true;
        self
    }

    /// Makes `current_url` fail the way a browser with an alert open does
    pub fn with_failing_current_url(mut self) -> Self {
        self.current_url_fails = true;
        self
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    /// URLs passed to `fetch_and_render`, in order
    pub fn fetched_urls(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DriverCall::Fetch(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&DriverCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

#[async_trait]
impl BrowserDriver for ScriptedDriver {
    async fn fetch_and_render(&mut self, url: &str) -> Result<RenderedPage, DriverError> {
        self.calls.push(DriverCall::Fetch(url.to_string()));

        if self.fatal_urls.contains(url) {
            return Err(DriverError::Fatal(format!("session lost loading {}", url)));
        }

        if let Some(remaining) = self.failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DriverError::Timeout {
                    url: url.to_string(),
                });
            }
        }

        let Some(page) = self.pages.get(url) else {
            return Err(DriverError::Fetch {
                url: url.to_string(),
                message: "HTTP 404".to_string(),
            });
        };

        self.current = Some(url.to_string());
        Ok(RenderedPage {
            url: url.to_string(),
            final_url: url.to_string(),
            title: page.title.clone(),
            instrumentation_ready: !page.detected_tags.is_empty(),
            detected_tags: page.detected_tags.clone(),
            body: None,
        })
    }

    async fn extract_links(&mut self, page: &RenderedPage) -> Result<Vec<String>, DriverError> {
        self.calls
            .push(DriverCall::ExtractLinks(page.final_url.clone()));
        Ok(self
            .pages
            .get(&page.final_url)
            .map(|p| p.links.clone())
            .unwrap_or_default())
    }

    async fn set_input_value(&mut self, locator: &str, value: &str) -> bool {
        self.calls.push(DriverCall::SetInput {
            locator: locator.to_string(),
            value: value.to_string(),
        });
        !self.no_interaction && !self.failing_locators.contains(locator)
    }

    async fn click(&mut self, locator: &str) -> bool {
        self.calls.push(DriverCall::Click(locator.to_string()));
        if self.no_interaction || self.failing_locators.contains(locator) {
            return false;
        }
        if let Some(target) = self.click_targets.get(locator) {
            self.current = Some(target.clone());
        }
        true
    }

    async fn clear_session_state(&mut self) -> bool {
        self.calls.push(DriverCall::ClearSession);
        if self.clear_fails {
            return false;
        }
        self.cookies.clear();
        true
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        self.calls.push(DriverCall::CurrentUrl);
        if self.current_url_fails {
            return Err(DriverError::Fetch {
                url: "current page".to_string(),
                message: "unexpected alert open".to_string(),
            });
        }
        self.current
            .clone()
            .ok_or_else(|| DriverError::Fatal("No page has been loaded".to_string()))
    }

    async fn shutdown(&mut self) -> Result<(), DriverError> {
        self.calls.push(DriverCall::Shutdown);
        self.shut_down = true;
        Ok(())
    }

    fn supports_interaction(&self) -> bool {
        !self.no_interaction
    }

    async fn cookie_snapshot(&mut self) -> Vec<(String, String)> {
        self.calls.push(DriverCall::CookieSnapshot);
        self.cookies.clone()
    }
}
