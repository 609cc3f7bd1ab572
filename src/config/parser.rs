use crate::config::types::{RuleConfig, Settings};
use crate::config::validation::{validate_rules, validate_settings};
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and validates the walk settings from a TOML file
///
/// # Arguments
///
/// * `path` - Path to the TOML settings file
///
/// # Returns
///
/// * `Ok(Settings)` - Successfully loaded and validated settings
/// * `Err(ConfigError)` - Failed to load, parse, or validate the settings
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use tag_walker::config::load_settings;
///
/// let settings = load_settings(Path::new("walker.toml")).unwrap();
/// println!("Start URL: {}", settings.crawl.start_url);
/// ```
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let settings: Settings = toml::from_str(&content)?;
    validate_settings(&settings)?;
    Ok(settings)
}

/// Loads and validates the rule snapshot from a JSON file
///
/// Unknown pattern kinds fail here, at load time.
pub fn load_rules(path: &Path) -> Result<RuleConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_rules(&content)
}

/// Parses and validates a rule snapshot from JSON text
pub fn parse_rules(content: &str) -> Result<RuleConfig, ConfigError> {
    let rules: RuleConfig = serde_json::from_str(content)?;
    validate_rules(&rules)?;
    Ok(rules)
}

/// Computes a SHA-256 hash of a configuration file's content
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a rule file and returns both the rules and the file's hash
pub fn load_rules_with_hash(path: &Path) -> Result<(RuleConfig, String), ConfigError> {
    let rules = load_rules(path)?;
    let hash = compute_config_hash(path)?;
    Ok((rules, hash))
}

/// Writes a sample rule file showing every pattern kind and value source
///
/// Refuses to overwrite an existing file.
pub fn write_sample_rules(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::Validation(format!(
            "refusing to overwrite existing file {}",
            path.display()
        )));
    }
    std::fs::write(path, SAMPLE_RULES)?;
    Ok(())
}

/// Sample rule file content
pub const SAMPLE_RULES: &str = r#"{
  "word_lists": {
    "names": ["Alice Smith", "Bob Jones", "Carol White", "David Brown", "Emma Green"],
    "cities": ["London", "Paris", "Berlin", "Madrid", "Rome"],
    "companies": ["Sample Ltd", "Test Inc", "Demo LLC", "Example Co"],
    "search_keywords": ["rust programming", "machine learning", "web development", "data science"],
    "emails": ["test@example.com", "sample@example.org", "demo@example.net"]
  },
  "ignore_patterns": [
    {"pattern": "logout", "type": "contains", "description": "Skip logout pages", "enabled": true},
    {"pattern": "admin", "type": "contains", "description": "Skip admin screens", "enabled": true},
    {"pattern": "privacy", "type": "contains", "description": "Skip the privacy policy", "enabled": true},
    {"pattern": "terms", "type": "contains", "description": "Skip terms of service", "enabled": true},
    {"pattern": "contact", "type": "contains", "description": "Skip contact pages", "enabled": false},
    {"pattern": "https://example.com/exact/path", "type": "exact", "description": "Skip one exact URL", "enabled": false},
    {"pattern": "https://example.com/admin", "type": "startswith", "description": "Skip URLs under /admin", "enabled": false},
    {"pattern": ".pdf", "type": "endswith", "description": "Skip PDF files", "enabled": false},
    {"pattern": "^https://example\\.com/admin/.*", "type": "regex", "description": "Skip /admin/ by regex", "enabled": false},
    {"pattern": "https://example.com/*.pdf", "type": "wildcard", "description": "Skip PDF files by wildcard", "enabled": false}
  ],
  "actions": [
    {
      "name": "Login form",
      "url_pattern": "example.com/login",
      "description": "Fill the login form",
      "inputs": [
        {"xpath": "//input[@name='username']", "random_values": ["user1", "testuser", "sample_user"], "description": "Username (random)"},
        {"xpath": "//input[@name='password']", "value": "testpass", "description": "Password (fixed)"}
      ],
      "click_element": "//button[@type='submit']",
      "wait_after_click": 3,
      "enabled": false
    },
    {
      "name": "Site search",
      "url_pattern": "example.com/search",
      "description": "Search with a random keyword",
      "inputs": [
        {"xpath": "//input[@name='q']", "value_list": "search_keywords", "description": "Keyword (word list)"}
      ],
      "click_element": "//button[@type='submit']",
      "wait_after_click": 2,
      "enabled": false
    },
    {
      "name": "Contact form",
      "url_pattern": "contact",
      "description": "Fill the contact form with random values",
      "inputs": [
        {"xpath": "//input[@name='name']", "value_list": "names", "description": "Name"},
        {"xpath": "//input[@name='email']", "value_list": "emails", "description": "Email"},
        {"xpath": "//input[@name='company']", "value_list": "companies", "description": "Company"},
        {"xpath": "//input[@name='city']", "random_values": ["Camden", "Hackney", "Islington"], "description": "District"},
        {"xpath": "//textarea[@name='message']", "random_values": ["Please tell me more about your service.", "Is a free trial available?"], "description": "Message"}
      ],
      "click_element": "//button[contains(text(), 'Send')]",
      "wait_after_click": 5,
      "enabled": false
    }
  ]
}
"#;
