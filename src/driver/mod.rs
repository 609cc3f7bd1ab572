//! Browser Driver capability
//!
//! The walk never loads pages, parses HTML or runs scripts itself. Everything
//! that touches a browser goes through [`BrowserDriver`]:
//!
//! - [`WebDriverBrowser`] drives Chrome through a WebDriver server
//! - [`HttpDriver`] fetches static HTML with reqwest (no JavaScript, no forms)
//! - [`ScriptedDriver`] is an in-memory fake with scripted pages for tests

mod http;
mod links;
mod scripted;
mod webdriver;

pub use http::{detect_tags, HttpDriver};
pub use links::{extract_page_links, extract_title};
pub use scripted::{DriverCall, ScriptedDriver, ScriptedPage};
pub use webdriver::WebDriverBrowser;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::config::TimingProfile;

/// A page as left by the driver after loading and settling
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedPage {
    /// URL that was requested
    pub url: String,
    /// URL after redirects
    pub final_url: String,
    /// Title text, if any
    pub title: Option<String>,
    /// True once the marketing instrumentation on the page finished loading
    pub instrumentation_ready: bool,
    /// Tag families seen on the page ("Google Analytics/GTM", ...)
    pub detected_tags: Vec<String>,
    /// Raw HTML for drivers that work on static markup
    pub body: Option<String>,
}

/// Errors raised by a Browser Driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to load {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Timed out loading {url}")]
    Timeout { url: String },

    #[error("{url} is not an HTML page ({content_type})")]
    NotHtml { url: String, content_type: String },

    /// The driver can no longer be used for this run
    #[error("Browser driver failed: {0}")]
    Fatal(String),
}

impl DriverError {
    /// Returns true if the error ends the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Everything the walk needs from a browser
///
/// Calls are issued one at a time and awaited before the next one; a driver
/// is owned by a single walk.
#[async_trait]
pub trait BrowserDriver: Send {
    /// Navigates to `url` and waits until the page and its instrumentation settle
    async fn fetch_and_render(&mut self, url: &str) -> Result<RenderedPage, DriverError>;

    /// Returns the absolute URLs of every link on the page, in document order
    async fn extract_links(&mut self, page: &RenderedPage) -> Result<Vec<String>, DriverError>;

    /// Types `value` into the element at `locator`; false if that failed
    async fn set_input_value(&mut self, locator: &str, value: &str) -> bool;

    /// Clicks the element at `locator`; false if that failed
    async fn click(&mut self, locator: &str) -> bool;

    /// Drops cookies and local/session storage
    async fn clear_session_state(&mut self) -> bool;

    /// URL the browser currently shows
    async fn current_url(&mut self) -> Result<String, DriverError>;

    /// Releases the browser
    async fn shutdown(&mut self) -> Result<(), DriverError>;

    /// Whether `set_input_value` and `click` can do anything
    fn supports_interaction(&self) -> bool {
        true
    }

    /// Cookie names and values visible to the current page
    async fn cookie_snapshot(&mut self) -> Vec<(String, String)> {
        Vec::new()
    }
}

/// Waits applied by the WebDriver browser after each navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Pause right after `document.readyState` is complete
    pub settle: Duration,
    /// Limit for `document.readyState == "complete"`
    pub ready_state: Duration,
    /// Limit for pending jQuery requests to drain
    pub ajax_idle: Duration,
    /// Limit for marketing globals to appear
    pub instrumentation: Duration,
    /// Pause after everything else
    pub trailing: Duration,
}

impl Timings {
    pub fn for_profile(profile: TimingProfile) -> Self {
        match profile {
            TimingProfile::Fast => Self {
                settle: Duration::from_secs(1),
                ready_state: Duration::from_secs(5),
                ajax_idle: Duration::from_secs(2),
                instrumentation: Duration::from_secs(3),
                trailing: Duration::ZERO,
            },
            TimingProfile::Safe => Self {
                settle: Duration::from_secs(2),
                ready_state: Duration::from_secs(10),
                ajax_idle: Duration::from_secs(5),
                instrumentation: Duration::from_secs(8),
                trailing: Duration::from_secs(1),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_fatal_errors_are_fatal() {
        assert!(DriverError::Fatal("session lost".into()).is_fatal());
        assert!(!DriverError::Timeout {
            url: "https://example.com/".into()
        }
        .is_fatal());
        assert!(!DriverError::Fetch {
            url: "https://example.com/".into(),
            message: "connection reset".into()
        }
        .is_fatal());
        assert!(!DriverError::NotHtml {
            url: "https://example.com/a.json".into(),
            content_type: "application/json".into()
        }
        .is_fatal());
    }

    #[test]
    fn test_safe_profile_waits_longer() {
        let fast = Timings::for_profile(TimingProfile::Fast);
        let safe = Timings::for_profile(TimingProfile::Safe);

        assert_eq!(fast.settle, Duration::from_secs(1));
        assert_eq!(safe.instrumentation, Duration::from_secs(8));
        assert!(safe.ready_state > fast.ready_state);
        assert!(safe.ajax_idle > fast.ajax_idle);
        assert_eq!(fast.trailing, Duration::ZERO);
        assert_eq!(safe.trailing, Duration::from_secs(1));
    }
}
