//! WebDriver-backed browser
//!
//! Drives Chrome through a WebDriver server (chromedriver, Selenium) with
//! thirtyfour. After each navigation the page is given time to finish its
//! scripts and for marketing instrumentation to appear, according to the
//! configured timing profile.

use async_trait::async_trait;
use std::time::Duration;
use thirtyfour::prelude::*;
use tokio::time::{sleep, Instant};

use super::{BrowserDriver, DriverError, RenderedPage, Timings};
use crate::config::DriverConfig;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const ELEMENT_WAIT: Duration = Duration::from_secs(10);
const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

const READY_STATE_SCRIPT: &str = "return document.readyState === 'complete';";
const AJAX_IDLE_SCRIPT: &str = "return typeof jQuery === 'undefined' || jQuery.active === 0;";
const COOKIE_SCRIPT: &str = "return document.cookie;";
const CLEAR_STORAGE_SCRIPT: &str =
    "window.localStorage.clear(); window.sessionStorage.clear(); return true;";

/// JavaScript probes for each tag family
const TAG_PROBES: &[(&str, &str)] = &[
    (
        "Google Analytics/GTM",
        "return typeof gtag !== 'undefined' || typeof dataLayer !== 'undefined' || typeof ga !== 'undefined';",
    ),
    ("Facebook Pixel", "return typeof fbq !== 'undefined';"),
    (
        "Adobe Analytics",
        "return typeof s !== 'undefined' || typeof adobe !== 'undefined';",
    ),
];

/// Error messages that mean the browser session is gone
const LOST_SESSION_MARKERS: &[&str] = &[
    "invalid session id",
    "session deleted",
    "disconnected",
    "no such window",
];

/// Browser Driver backed by a real browser
pub struct WebDriverBrowser {
    driver: Option<WebDriver>,
    timings: Timings,
}

impl WebDriverBrowser {
    /// Opens a Chrome session on the configured WebDriver server
    pub async fn connect(config: &DriverConfig) -> Result<Self, DriverError> {
        let mut caps = DesiredCapabilities::chrome();
        if config.headless {
            caps.set_headless().map_err(fatal)?;
        }
        caps.add_chrome_arg(&format!("--user-agent={}", config.user_agent))
            .map_err(fatal)?;
        caps.add_chrome_arg("--no-sandbox").map_err(fatal)?;
        caps.add_chrome_arg("--disable-dev-shm-usage").map_err(fatal)?;
        caps.add_chrome_arg("--disable-gpu").map_err(fatal)?;
        caps.add_chrome_arg("--window-size=1920,1080").map_err(fatal)?;

        let driver = WebDriver::new(&config.webdriver_url, caps)
            .await
            .map_err(|e| {
                DriverError::Fatal(format!(
                    "Failed to connect to WebDriver at {}: {}",
                    config.webdriver_url, e
                ))
            })?;
        driver
            .set_page_load_timeout(PAGE_LOAD_TIMEOUT)
            .await
            .map_err(fatal)?;

        tracing::info!(
            "Browser session opened ({:?} timing, headless: {})",
            config.timing_profile,
            config.headless
        );

        Ok(Self {
            driver: Some(driver),
            timings: Timings::for_profile(config.timing_profile),
        })
    }

    fn session(&self) -> Result<&WebDriver, DriverError> {
        self.driver
            .as_ref()
            .ok_or_else(|| DriverError::Fatal("Browser session already closed".to_string()))
    }

    /// Runs a boolean script, treating errors and non-booleans as false
    async fn probe(&self, script: &str) -> bool {
        let Ok(driver) = self.session() else {
            return false;
        };
        match driver.execute(script, Vec::new()).await {
            Ok(ret) => ret.json().as_bool().unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Polls a boolean script until it returns true or `limit` elapses
    async fn wait_until(&self, script: &str, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        loop {
            if self.probe(script).await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    /// Waits for the tag families to appear and returns the ones found
    async fn wait_for_instrumentation(&self) -> Vec<String> {
        let deadline = Instant::now() + self.timings.instrumentation;
        let mut found: Vec<String> = Vec::new();

        loop {
            for (family, script) in TAG_PROBES {
                if !found.iter().any(|f| f == family) && self.probe(script).await {
                    tracing::debug!("{} detected", family);
                    found.push(family.to_string());
                }
            }
            if found.len() == TAG_PROBES.len() || Instant::now() >= deadline {
                return found;
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn find(&self, locator: &str, clickable: bool) -> Result<WebElement, String> {
        let driver = self.session().map_err(|e| e.to_string())?;
        let query = driver
            .query(By::XPath(locator))
            .wait(ELEMENT_WAIT, POLL_INTERVAL);
        let found = if clickable {
            query.and_clickable().first().await
        } else {
            query.first().await
        };
        found.map_err(|e| e.to_string())
    }
}

fn fatal(error: WebDriverError) -> DriverError {
    DriverError::Fatal(error.to_string())
}

/// Maps a navigation error, separating a lost session from a bad page
fn classify(url: &str, error: WebDriverError) -> DriverError {
    classify_message(url, error.to_string())
}

fn classify_message(url: &str, message: String) -> DriverError {
    let lower = message.to_lowercase();

    if LOST_SESSION_MARKERS.iter().any(|m| lower.contains(m)) {
        DriverError::Fatal(message)
    } else if lower.contains("timeout") {
        DriverError::Timeout {
            url: url.to_string(),
        }
    } else {
        DriverError::Fetch {
            url: url.to_string(),
            message,
        }
    }
}

#[async_trait]
impl BrowserDriver for WebDriverBrowser {
    async fn fetch_and_render(&mut self, url: &str) -> Result<RenderedPage, DriverError> {
        let driver = self.session()?;
        driver.goto(url).await.map_err(|e| classify(url, e))?;

        sleep(self.timings.settle).await;
        if !self.wait_until(READY_STATE_SCRIPT, self.timings.ready_state).await {
            tracing::warn!("Page did not finish loading in time: {}", url);
        }
        if !self.wait_until(AJAX_IDLE_SCRIPT, self.timings.ajax_idle).await {
            tracing::debug!("Ajax requests still pending: {}", url);
        }
        let detected_tags = self.wait_for_instrumentation().await;
        sleep(self.timings.trailing).await;

        let driver = self.session()?;
        let final_url = driver
            .current_url()
            .await
            .map_err(|e| classify(url, e))?
            .to_string();
        let title = driver.title().await.ok().filter(|t| !t.trim().is_empty());

        Ok(RenderedPage {
            url: url.to_string(),
            final_url,
            title,
            instrumentation_ready: !detected_tags.is_empty(),
            detected_tags,
            body: None,
        })
    }

    async fn extract_links(&mut self, page: &RenderedPage) -> Result<Vec<String>, DriverError> {
        let driver = self.session()?;
        let elements = driver
            .find_all(By::Tag("a"))
            .await
            .map_err(|e| classify(&page.final_url, e))?;

        let base = url::Url::parse(&page.final_url).ok();
        let mut links = Vec::new();
        for element in elements {
            // Elements can go stale while a page keeps rendering
            let Ok(Some(href)) = element.attr("href").await else {
                continue;
            };
            let href = href.trim();
            match base.as_ref().and_then(|b| b.join(href).ok()) {
                Some(absolute) => links.push(absolute.to_string()),
                None => links.push(href.to_string()),
            }
        }

        Ok(links)
    }

    async fn set_input_value(&mut self, locator: &str, value: &str) -> bool {
        let element = match self.find(locator, false).await {
            Ok(element) => element,
            Err(e) => {
                tracing::warn!("Input not found: {} ({})", locator, e);
                return false;
            }
        };

        if let Err(e) = element.clear().await {
            tracing::debug!("Could not clear {}: {}", locator, e);
        }
        match element.send_keys(value).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to type into {}: {}", locator, e);
                false
            }
        }
    }

    async fn click(&mut self, locator: &str) -> bool {
        let element = match self.find(locator, true).await {
            Ok(element) => element,
            Err(e) => {
                tracing::warn!("Clickable element not found: {} ({})", locator, e);
                return false;
            }
        };

        match element.click().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to click {}: {}", locator, e);
                false
            }
        }
    }

    async fn clear_session_state(&mut self) -> bool {
        let Ok(driver) = self.session() else {
            return false;
        };

        let cookies_cleared = match driver.delete_all_cookies().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to delete cookies: {}", e);
                false
            }
        };

        // Storage is per origin; about:blank pages have none to clear
        if let Err(e) = driver.execute(CLEAR_STORAGE_SCRIPT, Vec::new()).await {
            tracing::debug!("Storage not cleared: {}", e);
        }

        cookies_cleared
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        let driver = self.session()?;
        driver
            .current_url()
            .await
            .map(|u| u.to_string())
            .map_err(|e| classify("current page", e))
    }

    async fn shutdown(&mut self) -> Result<(), DriverError> {
        match self.driver.take() {
            Some(driver) => {
                tracing::info!("Closing browser session");
                driver.quit().await.map_err(fatal)
            }
            None => Ok(()),
        }
    }

    async fn cookie_snapshot(&mut self) -> Vec<(String, String)> {
        let Ok(driver) = self.session() else {
            return Vec::new();
        };
        let Ok(ret) = driver.execute(COOKIE_SCRIPT, Vec::new()).await else {
            return Vec::new();
        };

        ret.json()
            .as_str()
            .unwrap_or("")
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }
}
