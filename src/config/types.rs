use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::ConfigError;

/// Main settings structure for Tag-Walker (loaded from TOML)
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub restart: RestartConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub rules: RulesConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Walk parameters
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// URL the walk starts from and returns to after each restart
    #[serde(rename = "start-url")]
    pub start_url: String,

    /// Maximum number of steps (restart steps included)
    #[serde(rename = "max-steps", default = "default_max_steps")]
    pub max_steps: u32,

    /// Delay between steps (seconds)
    #[serde(rename = "delay-seconds", default = "default_delay_seconds")]
    pub delay_seconds: f64,

    /// Only follow links whose host equals the start URL's host
    #[serde(rename = "stay-in-domain", default = "default_true")]
    pub stay_in_domain: bool,

    /// Candidate links kept per page before the random pick
    #[serde(rename = "max-links-per-page", default = "default_max_links")]
    pub max_links_per_page: usize,

    /// Extra attempts for a page that fails to load
    #[serde(rename = "fetch-retries", default = "default_fetch_retries")]
    pub fetch_retries: u32,

    /// Exclude already visited URLs from the candidates
    #[serde(rename = "avoid-revisits", default = "default_true")]
    pub avoid_revisits: bool,

    /// Record the cookies visible to each page in the step history
    #[serde(rename = "log-cookies", default)]
    pub log_cookies: bool,
}

/// Periodic session reset configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RestartConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Interval between restarts, in steps ("10-20" or "15")
    #[serde(default)]
    pub range: RestartRange,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            range: RestartRange::default(),
        }
    }
}

/// Inclusive range of steps between two restarts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct RestartRange {
    pub min: u32,
    pub max: u32,
}

impl RestartRange {
    pub fn new(min: u32, max: u32) -> Result<Self, ConfigError> {
        if min == 0 {
            return Err(ConfigError::InvalidRestartRange(format!(
                "minimum interval must be >= 1, got {}",
                min
            )));
        }
        if min > max {
            return Err(ConfigError::InvalidRestartRange(format!(
                "minimum {} is greater than maximum {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }
}

impl Default for RestartRange {
    fn default() -> Self {
        Self { min: 10, max: 20 }
    }
}

impl FromStr for RestartRange {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '−' | '—' | '–' | '－' => '-',
                other => other,
            })
            .collect();

        let parse = |part: &str| {
            part.trim().parse::<u32>().map_err(|_| {
                ConfigError::InvalidRestartRange(format!("'{}' is not a step count", part.trim()))
            })
        };

        match normalized.split_once('-') {
            Some((min, max)) => Self::new(parse(min)?, parse(max)?),
            None => {
                let value = parse(&normalized)?;
                Self::new(value, value)
            }
        }
    }
}

impl TryFrom<String> for RestartRange {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for RestartRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Which Browser Driver implementation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// Real browser through a WebDriver server
    Webdriver,
    /// Plain HTTP fetches, no JavaScript and no form interaction
    Http,
}

/// Wait strategy used by the driver after each navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingProfile {
    Fast,
    Safe,
}

/// Browser Driver configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_driver_kind")]
    pub kind: DriverKind,

    #[serde(rename = "timing-profile", default = "default_timing_profile")]
    pub timing_profile: TimingProfile,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(rename = "webdriver-url", default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    #[serde(
        rename = "request-timeout-seconds",
        default = "default_request_timeout"
    )]
    pub request_timeout_seconds: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            kind: default_driver_kind(),
            timing_profile: default_timing_profile(),
            headless: true,
            webdriver_url: default_webdriver_url(),
            user_agent: default_user_agent(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Location of the JSON rule file
#[derive(Debug, Clone, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "default_rules_path")]
    pub path: String,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            path: default_rules_path(),
        }
    }
}

/// Report destinations
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Markdown history report
    #[serde(rename = "history-path", default)]
    pub history_path: Option<String>,

    /// SQLite history export
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,
}

/// Named pools of candidate input values
pub type WordLists = BTreeMap<String, Vec<String>>;

/// Rule snapshot loaded from the JSON rule file
///
/// Shared read-only for the lifetime of a walk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleConfig {
    #[serde(default, deserialize_with = "deserialize_word_lists")]
    pub word_lists: WordLists,
    #[serde(default)]
    pub ignore_patterns: Vec<IgnorePattern>,
    #[serde(default)]
    pub actions: Vec<ActionSpec>,
}

/// The six URL match semantics of an ignore rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Contains,
    Exact,
    StartsWith,
    EndsWith,
    Regex,
    Wildcard,
}

impl PatternKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Contains => "contains",
            Self::Exact => "exact",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::Regex => "regex",
            Self::Wildcard => "wildcard",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A URL exclusion rule
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IgnorePattern {
    pub pattern: String,
    #[serde(rename = "type", default = "default_pattern_kind")]
    pub kind: PatternKind,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl IgnorePattern {
    pub fn new(pattern: impl Into<String>, kind: PatternKind) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
            description: String::new(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// How to fill one form field
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InputSpec {
    pub xpath: String,
    #[serde(default, deserialize_with = "deserialize_optional_scalar")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_scalars")]
    pub random_values: Option<Vec<String>>,
    #[serde(default)]
    pub value_list: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// A set of inputs and an optional click bound to a URL substring
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub url_pattern: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    #[serde(default)]
    pub click_element: Option<String>,
    /// Seconds to wait after a successful click
    #[serde(default = "default_wait_after_click")]
    pub wait_after_click: f64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_steps() -> u32 {
    10
}

fn default_delay_seconds() -> f64 {
    2.0
}

fn default_max_links() -> usize {
    50
}

fn default_fetch_retries() -> u32 {
    1
}

fn default_driver_kind() -> DriverKind {
    DriverKind::Webdriver
}

fn default_timing_profile() -> TimingProfile {
    TimingProfile::Fast
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_rules_path() -> String {
    "crawler_config.json".to_string()
}

fn default_pattern_kind() -> PatternKind {
    PatternKind::Contains
}

fn default_wait_after_click() -> f64 {
    3.0
}

/// Rule files write values as strings, numbers or booleans
///
/// Numbers and booleans keep their JSON spelling, so `1.0` stays `"1.0"`
/// and `true` becomes `"true"`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl From<Scalar> for String {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Text(s) => s,
            Scalar::Number(n) => n.to_string(),
            Scalar::Flag(b) => b.to_string(),
        }
    }
}

fn deserialize_optional_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Scalar> = Option::deserialize(deserializer)?;
    Ok(value.map(String::from))
}

fn deserialize_optional_scalars<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Option<Vec<Scalar>> = Option::deserialize(deserializer)?;
    Ok(values.map(|v| v.into_iter().map(String::from).collect()))
}

fn deserialize_word_lists<'de, D>(deserializer: D) -> Result<WordLists, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, Vec<Scalar>> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, values)| (name, values.into_iter().map(String::from).collect()))
        .collect())
}
