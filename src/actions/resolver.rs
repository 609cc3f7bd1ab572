use chrono::Utc;
use rand::RngCore;
use std::time::Duration;

use super::value::{Resolution, ValueResolver};
use crate::config::{ActionSpec, RuleConfig};
use crate::crawler::StopSignal;
use crate::driver::BrowserDriver;
use crate::history::ActionHistoryEntry;

/// Returns the enabled actions whose `url_pattern` occurs in `url`
///
/// Configuration order is kept. An empty `url_pattern` matches nothing.
pub fn applicable_actions<'a>(url: &str, actions: &'a [ActionSpec]) -> Vec<&'a ActionSpec> {
    actions
        .iter()
        .filter(|action| {
            action.enabled && !action.url_pattern.is_empty() && url.contains(&action.url_pattern)
        })
        .collect()
}

/// Picks and performs the page actions of a walk
#[derive(Debug, Clone, Copy)]
pub struct ActionResolver<'a> {
    actions: &'a [ActionSpec],
    values: ValueResolver<'a>,
}

impl<'a> ActionResolver<'a> {
    pub fn new(rules: &'a RuleConfig) -> Self {
        Self {
            actions: &rules.actions,
            values: ValueResolver::new(&rules.word_lists),
        }
    }

    /// Actions to run on `url`, in configuration order
    pub fn applicable(&self, url: &str) -> Vec<&'a ActionSpec> {
        applicable_actions(url, self.actions)
    }

    /// Fills the action's inputs, clicks its element and reports the outcome
    ///
    /// Failed inputs never stop the remaining ones. A successful click is
    /// followed by `wait_after_click` seconds, cut short if the walk is
    /// stopped.
    ///
    /// # Arguments
    ///
    /// * `action` - The action to perform
    /// * `step` - Step number the action runs in
    /// * `url` - Page the action runs on
    /// * `driver` - Browser to act on
    /// * `rng` - Source for random input values
    /// * `stop` - Stop signal observed while waiting after the click
    pub async fn execute<D, R>(
        &self,
        action: &ActionSpec,
        step: u32,
        url: &str,
        driver: &mut D,
        rng: &mut R,
        stop: &StopSignal,
    ) -> ActionHistoryEntry
    where
        D: BrowserDriver + ?Sized,
        R: RngCore,
    {
        tracing::info!("Running action '{}' on {}", action.name, url);

        let mut inputs_total = 0;
        let mut inputs_successful = 0;

        for input in action.inputs.iter().filter(|i| !i.xpath.trim().is_empty()) {
            inputs_total += 1;
            let label = if input.description.is_empty() {
                input.xpath.as_str()
            } else {
                input.description.as_str()
            };

            let resolution = self.values.resolve(input, &mut *rng);
            match &resolution {
                Resolution::MissingList(_) | Resolution::EmptyList(_) => {
                    tracing::warn!("Input '{}' skipped: {}", label, resolution)
                }
                Resolution::NoValue => tracing::warn!("Input '{}' has no value source", label),
                _ => tracing::debug!("Input '{}': {}", label, resolution),
            }

            let Some(value) = resolution.value() else {
                continue;
            };

            if driver.set_input_value(&input.xpath, value).await {
                inputs_successful += 1;
            } else {
                tracing::warn!("Failed to set input '{}' ({})", label, input.xpath);
            }
        }

        let click_attempted = action.click_element.is_some();
        let mut click_successful = false;
        if let Some(locator) = &action.click_element {
            click_successful = driver.click(locator).await;
            if click_successful {
                let wait = Duration::try_from_secs_f64(action.wait_after_click).unwrap_or_default();
                tracing::debug!("Clicked {}, waiting {:?}", locator, wait);
                stop.sleep(wait).await;
            } else {
                tracing::warn!("Failed to click {}", locator);
            }
        }

        let success =
            inputs_successful == inputs_total && (!click_attempted || click_successful);

        if success {
            tracing::info!(
                "Action '{}' done ({}/{} inputs)",
                action.name,
                inputs_successful,
                inputs_total
            );
        } else {
            tracing::warn!(
                "Action '{}' partly failed ({}/{} inputs, click: {})",
                action.name,
                inputs_successful,
                inputs_total,
                if click_attempted { click_successful.to_string() } else { "none".to_string() }
            );
        }

        ActionHistoryEntry {
            step,
            timestamp: Utc::now(),
            url: url.to_string(),
            action_name: action.name.clone(),
            description: action.description.clone(),
            success,
            inputs_total,
            inputs_successful,
            click_attempted,
            click_successful,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputSpec;
    use crate::driver::{DriverCall, ScriptedDriver};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FORM_URL: &str = "https://example.com/contact/form";

    fn action(name: &str, pattern: &str) -> ActionSpec {
        ActionSpec {
            name: name.to_string(),
            url_pattern: pattern.to_string(),
            description: String::new(),
            inputs: Vec::new(),
            click_element: None,
            wait_after_click: 0.0,
            enabled: true,
        }
    }

    fn input(xpath: &str, value: Option<&str>) -> InputSpec {
        InputSpec {
            xpath: xpath.to_string(),
            value: value.map(str::to_string),
            ..Default::default()
        }
    }

    async fn run(action: &ActionSpec, driver: &mut ScriptedDriver) -> ActionHistoryEntry {
        let rules = RuleConfig::default();
        let resolver = ActionResolver::new(&rules);
        let mut rng = StdRng::seed_from_u64(1);
        resolver
            .execute(action, 1, FORM_URL, driver, &mut rng, &StopSignal::never())
            .await
    }

    #[test]
    fn test_applicable_actions_by_substring_in_order() {
        let mut disabled = action("disabled", "contact");
        disabled.enabled = false;
        let actions = vec![
            action("second", "/form"),
            action("other", "/search"),
            disabled,
            action("first", "contact"),
            action("empty", ""),
        ];

        let names: Vec<&str> = applicable_actions(FORM_URL, &actions)
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn test_no_actions_apply() {
        assert!(applicable_actions(FORM_URL, &[]).is_empty());
        assert!(applicable_actions("https://example.com/", &[action("a", "/form")]).is_empty());
    }

    #[tokio::test]
    async fn test_all_inputs_and_click_succeed() {
        let mut spec = action("contact", "contact");
        spec.inputs = vec![input("//input[@id='name']", Some("Taro")), input("//input[@id='age']", Some("30"))];
        spec.click_element = Some("//button".to_string());

        let mut driver = ScriptedDriver::new();
        let entry = run(&spec, &mut driver).await;

        assert!(entry.success);
        assert_eq!(entry.inputs_total, 2);
        assert_eq!(entry.inputs_successful, 2);
        assert!(entry.click_attempted);
        assert!(entry.click_successful);
        assert_eq!(entry.url, FORM_URL);
        assert_eq!(
            driver.calls(),
            &[
                DriverCall::SetInput {
                    locator: "//input[@id='name']".to_string(),
                    value: "Taro".to_string()
                },
                DriverCall::SetInput {
                    locator: "//input[@id='age']".to_string(),
                    value: "30".to_string()
                },
                DriverCall::Click("//button".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_input_does_not_stop_the_rest() {
        let mut spec = action("contact", "contact");
        spec.inputs = vec![
            input("//broken", Some("x")),
            input("//ok", Some("y")),
        ];

        let mut driver = ScriptedDriver::new().failing_locator("//broken");
        let entry = run(&spec, &mut driver).await;

        assert!(!entry.success);
        assert_eq!(entry.inputs_total, 2);
        assert_eq!(entry.inputs_successful, 1);
        assert!(!entry.click_attempted);
        assert_eq!(driver.count(|c| matches!(c, DriverCall::SetInput { .. })), 2);
    }

    #[tokio::test]
    async fn test_input_without_value_counts_as_failed() {
        let mut spec = action("contact", "contact");
        spec.inputs = vec![
            input("//ok", Some("y")),
            InputSpec {
                xpath: "//missing".to_string(),
                value_list: Some("no_such_list".to_string()),
                ..Default::default()
            },
        ];

        let mut driver = ScriptedDriver::new();
        let entry = run(&spec, &mut driver).await;

        assert!(!entry.success);
        assert_eq!(entry.inputs_total, 2);
        assert_eq!(entry.inputs_successful, 1);
        // No driver call for the input that had no value
        assert_eq!(driver.count(|c| matches!(c, DriverCall::SetInput { .. })), 1);
    }

    #[tokio::test]
    async fn test_failed_click() {
        let mut spec = action("search", "contact");
        spec.inputs = vec![input("//q", Some("shoes"))];
        spec.click_element = Some("//submit".to_string());

        let mut driver = ScriptedDriver::new().failing_locator("//submit");
        let entry = run(&spec, &mut driver).await;

        assert!(!entry.success);
        assert_eq!(entry.inputs_successful, 1);
        assert!(entry.click_attempted);
        assert!(!entry.click_successful);
    }

    #[tokio::test]
    async fn test_empty_xpath_inputs_are_ignored() {
        let mut spec = action("contact", "contact");
        spec.inputs = vec![input("  ", Some("x"))];

        let mut driver = ScriptedDriver::new();
        let entry = run(&spec, &mut driver).await;

        assert!(entry.success);
        assert_eq!(entry.inputs_total, 0);
        assert!(driver.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_after_successful_click() {
        let mut spec = action("contact", "contact");
        spec.click_element = Some("//button".to_string());
        spec.wait_after_click = 3.0;

        let mut driver = ScriptedDriver::new();
        let started = tokio::time::Instant::now();
        let entry = run(&spec, &mut driver).await;

        assert!(entry.success);
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_random_values_come_from_word_lists() {
        let mut rules = RuleConfig::default();
        rules
            .word_lists
            .insert("names".to_string(), vec!["Hanako".to_string()]);
        let mut spec = action("contact", "contact");
        spec.inputs = vec![InputSpec {
            xpath: "//name".to_string(),
            value_list: Some("names".to_string()),
            ..Default::default()
        }];

        let resolver = ActionResolver::new(&rules);
        let mut driver = ScriptedDriver::new();
        let mut rng = StdRng::seed_from_u64(3);
        let entry = resolver
            .execute(&spec, 2, FORM_URL, &mut driver, &mut rng, &StopSignal::never())
            .await;

        assert!(entry.success);
        assert_eq!(entry.step, 2);
        assert_eq!(
            driver.calls()[0],
            DriverCall::SetInput {
                locator: "//name".to_string(),
                value: "Hanako".to_string()
            }
        );
    }
}
