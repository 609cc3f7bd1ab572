//! Static HTTP driver
//!
//! Fetches pages with reqwest and reads links out of the returned markup. No
//! JavaScript runs, so the instrumentation signal comes from scanning the
//! HTML for well-known tag snippets, and form actions are unavailable.

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::links::{extract_page_links, extract_title};
use super::{BrowserDriver, DriverError, RenderedPage};
use crate::config::{DriverConfig, TimingProfile};

/// Request timeout used by the fast timing profile
const FAST_TIMEOUT: Duration = Duration::from_secs(10);

/// Markers of each tag family, matched case-insensitively against the HTML
const TAG_SIGNATURES: &[(&str, &[&str])] = &[
    (
        "Google Analytics/GTM",
        &[
            "googletagmanager.com",
            "google-analytics.com",
            "gtag(",
            "datalayer",
        ],
    ),
    ("Facebook Pixel", &["connect.facebook.net", "fbq("]),
    (
        "Adobe Analytics",
        &["adobedtm.com", "appmeasurement", "omniture", "s_code.js"],
    ),
];

/// Returns the tag families whose markers appear in the HTML
///
/// # Example
///
/// ```
/// use tag_walker::driver::detect_tags;
///
/// let html = r#"<script src="https://www.googletagmanager.com/gtm.js?id=GTM-X"></script>"#;
/// assert_eq!(detect_tags(html), vec!["Google Analytics/GTM"]);
/// ```
pub fn detect_tags(html: &str) -> Vec<String> {
    let lower = html.to_lowercase();
    TAG_SIGNATURES
        .iter()
        .filter(|(_, markers)| markers.iter().any(|m| lower.contains(m)))
        .map(|(family, _)| family.to_string())
        .collect()
}

/// Browser Driver backed by plain HTTP requests
pub struct HttpDriver {
    client: Client,
    jar: Arc<Jar>,
    user_agent: String,
    timeout: Duration,
    current_url: Option<String>,
}

impl HttpDriver {
    /// Creates a driver with an empty cookie store
    ///
    /// # Arguments
    ///
    /// * `user_agent` - User-Agent header sent with every request
    /// * `timeout` - Whole-request timeout
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, DriverError> {
        let jar = Arc::new(Jar::default());
        let client = build_client(user_agent, timeout, jar.clone())?;

        Ok(Self {
            client,
            jar,
            user_agent: user_agent.to_string(),
            timeout,
            current_url: None,
        })
    }

    /// Creates a driver from the `[driver]` settings
    pub fn from_config(config: &DriverConfig) -> Result<Self, DriverError> {
        let timeout = match config.timing_profile {
            TimingProfile::Fast => FAST_TIMEOUT,
            TimingProfile::Safe => Duration::from_secs(config.request_timeout_seconds),
        };
        Self::new(&config.user_agent, timeout)
    }
}

fn build_client(user_agent: &str, timeout: Duration, jar: Arc<Jar>) -> Result<Client, DriverError> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .cookie_provider(jar)
        .gzip(true)
        .brotli(true)
        .build()
        .map_err(|e| DriverError::Fatal(format!("Failed to build HTTP client: {}", e)))
}

#[async_trait]
impl BrowserDriver for HttpDriver {
    async fn fetch_and_render(&mut self, url: &str) -> Result<RenderedPage, DriverError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DriverError::Timeout {
                    url: url.to_string(),
                }
            } else {
                DriverError::Fetch {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        let final_url = response.url().to_string();
        self.current_url = Some(final_url.clone());

        if !status.is_success() {
            return Err(DriverError::Fetch {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.contains("text/html") {
            return Err(DriverError::NotHtml {
                url: url.to_string(),
                content_type,
            });
        }

        let body = response.text().await.map_err(|e| DriverError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let detected_tags = detect_tags(&body);
        Ok(RenderedPage {
            url: url.to_string(),
            final_url,
            title: extract_title(&body),
            instrumentation_ready: !detected_tags.is_empty(),
            detected_tags,
            body: Some(body),
        })
    }

    async fn extract_links(&mut self, page: &RenderedPage) -> Result<Vec<String>, DriverError> {
        let Some(body) = &page.body else {
            return Ok(Vec::new());
        };

        let base = Url::parse(&page.final_url).map_err(|e| DriverError::Fetch {
            url: page.final_url.clone(),
            message: e.to_string(),
        })?;

        Ok(extract_page_links(body, &base))
    }

    async fn set_input_value(&mut self, locator: &str, _value: &str) -> bool {
        tracing::debug!("HTTP driver cannot fill inputs: {}", locator);
        false
    }

    async fn click(&mut self, locator: &str) -> bool {
        tracing::debug!("HTTP driver cannot click: {}", locator);
        false
    }

    async fn clear_session_state(&mut self) -> bool {
        let jar = Arc::new(Jar::default());
        match build_client(&self.user_agent, self.timeout, jar.clone()) {
            Ok(client) => {
                self.client = client;
                self.jar = jar;
                true
            }
            Err(e) => {
                tracing::warn!("{}", e);
                false
            }
        }
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        self.current_url
            .clone()
            .ok_or_else(|| DriverError::Fatal("No page has been loaded".to_string()))
    }

    async fn shutdown(&mut self) -> Result<(), DriverError> {
        self.current_url = None;
        Ok(())
    }

    fn supports_interaction(&self) -> bool {
        false
    }

    async fn cookie_snapshot(&mut self) -> Vec<(String, String)> {
        let Some(url) = self.current_url.as_deref().and_then(|u| Url::parse(u).ok()) else {
            return Vec::new();
        };

        let Some(header) = self.jar.cookies(&url) else {
            return Vec::new();
        };

        header
            .to_str()
            .unwrap_or("")
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }
}
