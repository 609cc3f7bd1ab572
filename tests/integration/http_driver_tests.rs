//! Integration tests for the HTTP driver
//!
//! These tests use wiremock to serve pages and run the static driver and
//! whole walks against them.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tag_walker::config::{
    CrawlConfig, DriverConfig, OutputConfig, RestartConfig, RuleConfig, RulesConfig, Settings,
};
use tag_walker::crawler::{run_walk, StopSignal};
use tag_walker::driver::{BrowserDriver, DriverError, HttpDriver};
use tag_walker::Termination;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn driver() -> HttpDriver {
    HttpDriver::new("TagWalkerTest/1.0", Duration::from_secs(5)).unwrap()
}

async fn mount_html(server: &MockServer, route: &str, html: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_raw(html.to_string(), "text/html"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_fetch_and_extract_links() {
    let server = MockServer::start().await;
    mount_html(
        &server,
        "/",
        r#"<html><head><title>Home</title>
        <script src="https://connect.facebook.net/en_US/fbevents.js"></script></head>
        <body>
          <a href="/about">About</a>
          <a href="products?page=2">Products</a>
          <a href="https://other.example/">Elsewhere</a>
          <a href="mailto:shop@example.com">Mail</a>
        </body></html>"#,
    )
    .await;

    let mut driver = driver();
    let url = format!("{}/", server.uri());
    let page = driver.fetch_and_render(&url).await.unwrap();

    assert_eq!(page.title.as_deref(), Some("Home"));
    assert!(page.instrumentation_ready);
    assert_eq!(page.detected_tags, vec!["Facebook Pixel"]);

    let links = driver.extract_links(&page).await.unwrap();
    assert_eq!(
        links,
        vec![
            format!("{}/about", server.uri()),
            format!("{}/products?page=2", server.uri()),
            "https://other.example/".to_string(),
        ]
    );
    assert_eq!(driver.current_url().await.unwrap(), url);
}

#[tokio::test]
async fn test_non_html_is_recoverable_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let err = driver()
        .fetch_and_render(&format!("{}/data.json", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::NotHtml { .. }));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_http_error_is_fetch_failure() {
    let server = MockServer::start().await;

    let err = driver()
        .fetch_and_render(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(err, DriverError::Fetch { .. }));
    assert!(!err.is_fatal());
}

#[tokio::test]
async fn test_cookies_are_kept_and_cleared() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "visitor=abc123; Path=/")
                .set_body_raw("<html><body>hi</body></html>", "text/html"),
        )
        .mount(&server)
        .await;

    let mut driver = driver();
    driver
        .fetch_and_render(&format!("{}/", server.uri()))
        .await
        .unwrap();

    assert_eq!(
        driver.cookie_snapshot().await,
        vec![("visitor".to_string(), "abc123".to_string())]
    );

    assert!(driver.clear_session_state().await);
    assert!(driver.cookie_snapshot().await.is_empty());
}

#[tokio::test]
async fn test_walk_over_http_stays_on_host() {
    let server = MockServer::start().await;
    let nav = r#"<a href="/">Home</a> <a href="/a">A</a> <a href="/b">B</a>
                 <a href="https://other.example/">Out</a> <a href="/file.pdf">PDF</a>"#;
    for route in ["/", "/a", "/b"] {
        mount_html(&server, route, &format!("<html><body>{}</body></html>", nav)).await;
    }

    let settings = Settings {
        crawl: CrawlConfig {
            start_url: format!("{}/", server.uri()),
            max_steps: 6,
            delay_seconds: 0.0,
            stay_in_domain: true,
            max_links_per_page: 50,
            fetch_retries: 0,
            avoid_revisits: false,
            log_cookies: false,
        },
        restart: RestartConfig::default(),
        driver: DriverConfig::default(),
        rules: RulesConfig::default(),
        output: OutputConfig::default(),
    };

    let report = run_walk(
        &settings,
        Arc::new(RuleConfig::default()),
        driver(),
        StdRng::seed_from_u64(9),
        StopSignal::never(),
    )
    .await
    .unwrap();

    assert_eq!(report.termination, Termination::MaxStepsReached);
    assert_eq!(report.steps.len(), 6);
    for entry in &report.steps {
        assert!(entry.url.starts_with(&server.uri()));
        assert_eq!(entry.links_discovered, 5);
        assert_eq!(entry.links_found, 3);
    }
}
