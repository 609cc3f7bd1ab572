//! Integration tests for whole walks
//!
//! These tests load settings and rules from files, run walks over the
//! scripted driver and write the reports.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::sync::Arc;
use tag_walker::config::{load_rules_with_hash, load_settings, parse_rules, RuleConfig, Settings};
use tag_walker::crawler::{run_walk, stop_channel, StopSignal};
use tag_walker::driver::ScriptedDriver;
use tag_walker::output::{
    format_markdown_report, MarkdownOutputHandler, OutputHandler, RunContext, RunSummary,
    SqliteOutputHandler,
};
use tag_walker::Termination;

const SITE: [&str; 6] = [
    "https://shop.example/",
    "https://shop.example/products",
    "https://shop.example/search",
    "https://shop.example/private/orders",
    "https://shop.example/about",
    "https://partner.example/",
];

/// Every page links to every page, including one off-site page
fn site_driver() -> ScriptedDriver {
    SITE.iter()
        .fold(ScriptedDriver::new(), |driver, page| driver.with_page(page, &SITE))
}

fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn settings_toml(max_steps: u32, restart: bool) -> String {
    format!(
        r#"
[crawl]
start-url = "https://shop.example/"
max-steps = {}
delay-seconds = 0
avoid-revisits = false

[restart]
enabled = {}
range = "4-4"

[driver]
kind = "http"
"#,
        max_steps, restart
    )
}

const RULES: &str = r#"{
  "word_lists": {"keywords": ["boots", "scarves"]},
  "ignore_patterns": [
    {"pattern": "/private/", "type": "contains", "description": "Account pages"}
  ],
  "actions": [
    {
      "name": "search",
      "url_pattern": "shop.example/search",
      "inputs": [{"xpath": "//input[@name='q']", "value_list": "keywords"}],
      "click_element": "//button[@type='submit']",
      "wait_after_click": 0
    }
  ]
}"#;

async fn walk(settings: &Settings, rules: RuleConfig, seed: u64) -> tag_walker::CrawlReport {
    run_walk(
        settings,
        Arc::new(rules),
        site_driver(),
        StdRng::seed_from_u64(seed),
        StopSignal::never(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_walk_from_config_files() {
    let dir = tempfile::tempdir().unwrap();
    let settings_path = write_file(dir.path(), "walker.toml", &settings_toml(30, false));
    let rules_path = write_file(dir.path(), "rules.json", RULES);

    let settings = load_settings(&settings_path).unwrap();
    let (rules, hash) = load_rules_with_hash(&rules_path).unwrap();
    assert_eq!(hash.len(), 64);

    let report = walk(&settings, rules, 1).await;

    assert_eq!(report.termination, Termination::MaxStepsReached);
    assert_eq!(report.steps.len(), 30);
    for entry in &report.steps {
        assert_eq!(entry.domain, "shop.example");
        assert!(!entry.url.contains("/private/"));
        if let Some(selected) = &entry.selected_link {
            assert!(selected.starts_with("https://shop.example/"));
            assert!(!selected.contains("/private/"));
        }
    }

    // Every visit to the search page ran the search action
    let searches = report
        .steps
        .iter()
        .filter(|s| s.url == "https://shop.example/search")
        .count();
    assert_eq!(report.actions.len(), searches);
    assert!(report.actions.iter().all(|a| a.success && a.inputs_total == 1));
}

#[tokio::test]
async fn test_restarts_from_settings() {
    let dir = tempfile::tempdir().unwrap();
    let settings_path = write_file(dir.path(), "walker.toml", &settings_toml(12, true));
    let settings = load_settings(&settings_path).unwrap();

    let report = walk(&settings, parse_rules(RULES).unwrap(), 2).await;

    assert_eq!(report.steps.len(), 12);
    let restart_steps: Vec<u32> = report
        .steps
        .iter()
        .filter(|s| s.restart_occurred)
        .map(|s| s.step)
        .collect();
    assert_eq!(restart_steps, vec![4, 8, 12]);
    assert_eq!(report.restarts.len(), 3);
    assert_eq!(
        report.restarts.iter().map(|r| r.restart_count).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
}

#[tokio::test]
async fn test_seeded_walks_repeat() {
    let dir = tempfile::tempdir().unwrap();
    let settings_path = write_file(dir.path(), "walker.toml", &settings_toml(20, true));
    let settings = load_settings(&settings_path).unwrap();

    let first = walk(&settings, parse_rules(RULES).unwrap(), 42).await;
    let second = walk(&settings, parse_rules(RULES).unwrap(), 42).await;

    assert_eq!(first.followed_links(), second.followed_links());
}

#[tokio::test]
async fn test_stopped_walk_is_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let settings_path = write_file(dir.path(), "walker.toml", &settings_toml(5, false));
    let settings = load_settings(&settings_path).unwrap();

    let (handle, stop) = stop_channel();
    handle.stop();

    let report = run_walk(
        &settings,
        Arc::new(RuleConfig::default()),
        site_driver(),
        StdRng::seed_from_u64(3),
        stop,
    )
    .await
    .unwrap();

    assert_eq!(report.termination, Termination::Cancelled);
    assert!(report.steps.is_empty());
}

#[tokio::test]
async fn test_reports_written() {
    let dir = tempfile::tempdir().unwrap();
    let settings_path = write_file(dir.path(), "walker.toml", &settings_toml(10, true));
    let rules_path = write_file(dir.path(), "rules.json", RULES);
    let settings = load_settings(&settings_path).unwrap();
    let (rules, hash) = load_rules_with_hash(&rules_path).unwrap();

    let context = RunContext::new(&settings, &rules, &hash);
    let report = walk(&settings, rules, 5).await;

    let markdown_path = dir.path().join("history.md");
    MarkdownOutputHandler::new(&markdown_path)
        .write_report(&report, &context)
        .unwrap();
    let markdown = std::fs::read_to_string(&markdown_path).unwrap();
    assert_eq!(markdown, format_markdown_report(&report, &context));
    assert!(markdown.contains(&hash));
    assert!(markdown.contains("- [contains] `/private/`: Account pages"));
    assert!(markdown.contains("## Restart History"));

    let db_path = dir.path().join("walks.db");
    SqliteOutputHandler::new(&db_path)
        .unwrap()
        .write_report(&report, &context)
        .unwrap();
    assert!(db_path.exists());

    let summary = RunSummary::from_report(&report);
    assert_eq!(summary.total_steps, 10);
    assert_eq!(summary.restarts, 2);
}
