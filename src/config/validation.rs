use crate::config::types::{
    ActionSpec, CrawlConfig, DriverConfig, IgnorePattern, RuleConfig, Settings,
};
use crate::ConfigError;
use url::Url;

/// Validates the walk settings
pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    validate_crawl_config(&settings.crawl)?;
    validate_driver_config(&settings.driver)?;

    if settings.rules.path.is_empty() {
        return Err(ConfigError::Validation(
            "rules path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the rule snapshot
pub fn validate_rules(rules: &RuleConfig) -> Result<(), ConfigError> {
    validate_ignore_patterns(&rules.ignore_patterns)?;
    validate_actions(&rules.actions)?;
    Ok(())
}

/// Validates walk parameters
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_start_url(&config.start_url)?;

    if config.max_steps < 1 {
        return Err(ConfigError::Validation(format!(
            "max_steps must be >= 1, got {}",
            config.max_steps
        )));
    }

    if !config.delay_seconds.is_finite() || config.delay_seconds < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay_seconds must be a non-negative number, got {}",
            config.delay_seconds
        )));
    }

    if config.max_links_per_page < 1 {
        return Err(ConfigError::Validation(format!(
            "max_links_per_page must be >= 1, got {}",
            config.max_links_per_page
        )));
    }

    Ok(())
}

/// Validates the start URL: absolute http(s) with a host
pub fn validate_start_url(start_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start_url '{}': {}", start_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "start_url '{}' must use http or https",
            start_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "start_url '{}' has no host",
            start_url
        )));
    }

    Ok(())
}

/// Validates driver configuration
fn validate_driver_config(config: &DriverConfig) -> Result<(), ConfigError> {
    if config.request_timeout_seconds < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_seconds must be >= 1, got {}",
            config.request_timeout_seconds
        )));
    }

    Url::parse(&config.webdriver_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid webdriver_url: {}", e)))?;

    Ok(())
}

/// Validates ignore patterns
///
/// Regex and wildcard syntax is not checked here: a malformed expression only
/// disables its own rule when the rule set is compiled.
fn validate_ignore_patterns(patterns: &[IgnorePattern]) -> Result<(), ConfigError> {
    for (index, pattern) in patterns.iter().enumerate() {
        if pattern.pattern.is_empty() {
            return Err(ConfigError::Validation(format!(
                "ignore pattern #{} ({}) has an empty pattern",
                index + 1,
                pattern.kind
            )));
        }
    }
    Ok(())
}

/// Validates action specs
fn validate_actions(actions: &[ActionSpec]) -> Result<(), ConfigError> {
    for action in actions {
        if action.url_pattern.is_empty() {
            return Err(ConfigError::Validation(format!(
                "action '{}' has an empty url_pattern",
                action.name
            )));
        }

        if !action.wait_after_click.is_finite() || action.wait_after_click < 0.0 {
            return Err(ConfigError::Validation(format!(
                "action '{}' has an invalid wait_after_click: {}",
                action.name, action.wait_after_click
            )));
        }

        for input in &action.inputs {
            if input.xpath.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "action '{}' has an input without an xpath",
                    action.name
                )));
            }
        }

        if let Some(click) = &action.click_element {
            if click.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "action '{}' has an empty click_element",
                    action.name
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{InputSpec, PatternKind};

    fn action(name: &str) -> ActionSpec {
        ActionSpec {
            name: name.to_string(),
            url_pattern: "/form".to_string(),
            description: String::new(),
            inputs: vec![InputSpec {
                xpath: "//input[@name='q']".to_string(),
                value: Some("rust".to_string()),
                ..Default::default()
            }],
            click_element: Some("//button".to_string()),
            wait_after_click: 1.0,
            enabled: true,
        }
    }

    #[test]
    fn test_validate_start_url() {
        assert!(validate_start_url("https://example.com").is_ok());
        assert!(validate_start_url("http://localhost:8080/path").is_ok());

        assert!(validate_start_url("").is_err());
        assert!(validate_start_url("example.com").is_err());
        assert!(validate_start_url("ftp://example.com").is_err());
        assert!(validate_start_url("mailto:user@example.com").is_err());
    }

    #[test]
    fn test_validate_actions() {
        assert!(validate_actions(&[action("ok")]).is_ok());

        let mut no_pattern = action("no pattern");
        no_pattern.url_pattern.clear();
        assert!(validate_actions(&[no_pattern]).is_err());

        let mut no_xpath = action("no xpath");
        no_xpath.inputs[0].xpath = "  ".to_string();
        assert!(validate_actions(&[no_xpath]).is_err());

        let mut negative_wait = action("negative wait");
        negative_wait.wait_after_click = -1.0;
        assert!(validate_actions(&[negative_wait]).is_err());

        let mut empty_click = action("empty click");
        empty_click.click_element = Some(String::new());
        assert!(validate_actions(&[empty_click]).is_err());
    }

    #[test]
    fn test_validate_ignore_patterns() {
        assert!(validate_ignore_patterns(&[IgnorePattern::new("logout", PatternKind::Contains)]).is_ok());
        assert!(validate_ignore_patterns(&[IgnorePattern::new("", PatternKind::Exact)]).is_err());

        // Malformed regexes are tolerated at load time
        assert!(validate_ignore_patterns(&[IgnorePattern::new("([", PatternKind::Regex)]).is_ok());
    }
}
