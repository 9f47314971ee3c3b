#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

use discourse_qa::collector::browser::{BrowserClient, BrowserConfig};
use discourse_qa::collector::{CollectorConfig, TopicCollector};
use discourse_qa::commands::{CollectOptions, run_collect};
use discourse_qa::config::Config;
use discourse_qa::topics::{TopicLink, load_topics};
use tempfile::{NamedTempFile, TempDir};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING: &str = r#"<!DOCTYPE html>
<html><head><title>TDS Knowledge Base</title></head>
<body>
  <table class="topic-list"><tbody class="topic-list-body">
    <tr class="topic-list-item">
      <td class="main-link"><a href="/t/ga-4-data-sourcing/101" class="title raw-link raw-topic-link">GA 4 data sourcing</a></td>
    </tr>
    <tr class="topic-list-item">
      <td class="main-link"><a href="/t/project-1-model/102" class="title raw-link raw-topic-link">Project 1 model</a></td>
    </tr>
  </tbody></table>
</body></html>"#;

const TOPIC_101: &str = r#"<!DOCTYPE html>
<html><body>
  <div id="topic-title"><h1><a href="/t/ga-4-data-sourcing/101">GA 4 data sourcing</a></h1></div>
  <div class="post" itemprop="text">
    <p>Scrape the <a href="https://www.espncricinfo.com/records">ESPN stats</a> page.</p>
    <img src="/uploads/default/original/table.png" alt="table">
  </div>
</body></html>"#;

const TOPIC_102: &str = r#"<!DOCTYPE html>
<html><body>
  <h1 class="fancy-title">Project 1 model</h1>
  <div class="cooked"><p>Use gpt-4o-mini for project 1.</p></div>
</body></html>"#;

async fn discourse_site() -> MockServer {
    let server = MockServer::start().await;

    for (route, body) in [
        ("/c/courses/tds-kb/34", LISTING),
        ("/t/ga-4-data-sourcing/101", TOPIC_101),
        ("/t/project-1-model/102", TOPIC_102),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;
    }

    server
}

#[tokio::test(flavor = "multi_thread")]
async fn collect_discourse_category_over_http() {
    let server = discourse_site().await;

    let config = CollectorConfig {
        enable_js_rendering: false,
        ..CollectorConfig::default()
    };
    let collector = TopicCollector::new(config).expect("collector should build");
    let collection = collector
        .collect(&format!("{}/c/courses/tds-kb/34", server.uri()))
        .await
        .expect("collection should succeed");

    assert_eq!(collection.stats.discovered, 2);
    assert_eq!(collection.stats.collected, 2);
    assert_eq!(collection.stats.failed, 0);

    let first = &collection.topics[0];
    assert_eq!(first.title, "GA 4 data sourcing");
    assert_eq!(first.content, "Scrape the ESPN stats page.");
    assert_eq!(first.url, format!("{}/t/ga-4-data-sourcing/101", server.uri()));
    assert_eq!(
        first.links,
        [TopicLink {
            url: "https://www.espncricinfo.com/records".to_string(),
            text: "ESPN stats".to_string(),
        }]
    );
    assert_eq!(
        first.images,
        [format!("{}/uploads/default/original/table.png", server.uri())]
    );

    let second = &collection.topics[1];
    assert_eq!(second.title, "Project 1 model");
    assert_eq!(second.content, "Use gpt-4o-mini for project 1.");
    assert!(second.links.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn run_collect_writes_topics_file() {
    let server = discourse_site().await;
    let temp_dir = TempDir::new().expect("temp dir should be created");
    let output = temp_dir.path().join("out").join("discourse_tds_kb.json");

    let options = CollectOptions {
        listing_url: Some(format!("{}/c/courses/tds-kb/34", server.uri())),
        output: Some(output.clone()),
        no_browser: true,
    };
    let stats = run_collect(&Config::default(), options)
        .await
        .expect("collect should succeed");
    assert_eq!(stats.collected, 2);

    let topics = load_topics(&output).expect("topics file should load");
    let titles: Vec<&str> = topics.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["GA 4 data sourcing", "Project 1 model"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_listing_writes_empty_array() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/c/empty/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("temp dir should be created");
    let output = temp_dir.path().join("topics.json");

    let options = CollectOptions {
        listing_url: Some(format!("{}/c/empty/1", server.uri())),
        output: Some(output.clone()),
        no_browser: true,
    };
    let stats = run_collect(&Config::default(), options)
        .await
        .expect("collect should succeed");

    assert_eq!(stats.discovered, 0);
    let content = std::fs::read_to_string(&output).expect("topics file should exist");
    assert_eq!(content.trim(), "[]");
}

// Requires Chrome; skipped when no browser can be launched
#[tokio::test(flavor = "multi_thread")]
async fn browser_renders_scripted_listing() {
    let html = r#"<!DOCTYPE html>
    <html><body>
      <table><tbody class="topic-list-body"></tbody></table>
      <script>
        const row = document.createElement('tr');
        row.className = 'topic-list-item';
        row.innerHTML = '<td><a class="title" href="/t/rendered/1">Rendered</a></td>';
        document.querySelector('.topic-list-body').appendChild(row);
      </script>
    </body></html>"#;

    let temp_file = NamedTempFile::with_suffix(".html").expect("Failed to create temp file");
    std::fs::write(temp_file.path(), html).expect("Failed to write HTML");
    let url = Url::from_file_path(temp_file.path()).expect("temp path should be absolute");

    let config = BrowserConfig {
        navigation_timeout_seconds: 10,
        scroll_pause_ms: 50,
        max_scrolls: 2,
        ..BrowserConfig::default()
    };
    let client = BrowserClient::new(config, "discourse-qa-test".to_string());

    match client.render_page(&url, ".topic-list-item", true).await {
        Ok(content) => {
            assert!(client.is_launched());
            assert!(content.contains("/t/rendered/1"));
        }
        Err(e) => {
            // Launch and DevTools failures depend on the host Chrome install
            println!("Skipping test - browser rendering unavailable: {:#}", e);
        }
    }
}
