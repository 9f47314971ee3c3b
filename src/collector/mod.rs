pub mod browser;
pub mod extractor;


use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use ureq::Agent;
use url::Url;

use self::browser::{BrowserClient, BrowserConfig};
use self::extractor::{TopicSelectors, extract_topic, extract_topic_urls};
use crate::config::ConfigError;
use crate::topics::TopicRecord;

/// CSS selectors used to read Discourse pages.
///
/// `title` and `content` are tried in order; the first selector that matches wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// One row per topic on the category listing
    pub listing_item: String,
    /// Topic link inside a listing row
    pub topic_link: String,
    pub title: Vec<String>,
    pub content: Vec<String>,
    /// Element the browser waits for before reading a listing page
    pub listing_ready: String,
    /// Element the browser waits for before reading a topic page
    pub topic_ready: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing_item: ".topic-list-item".to_string(),
            topic_link: "a.title".to_string(),
            title: vec!["h1.fancy-title".to_string(), "#topic-title h1".to_string()],
            content: vec![
                ".cooked".to_string(),
                "div.post[itemprop='text']".to_string(),
            ],
            listing_ready: ".topic-list-body".to_string(),
            topic_ready: ".post".to_string(),
        }
    }
}

/// Configuration for the topic collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Category listing page to discover topics from
    pub listing_url: String,
    /// Where the collected topics are written
    pub output_path: PathBuf,
    /// User agent string to use for requests
    pub user_agent: String,
    /// Timeout for HTTP requests in seconds
    pub timeout_seconds: u64,
    /// Render pages in headless Chrome, falling back to plain HTTP on failure
    pub enable_js_rendering: bool,
    /// Link texts longer than this many characters are cut
    pub link_text_limit: usize,
    pub selectors: SelectorConfig,
    pub browser: BrowserConfig,
}

impl Default for CollectorConfig {
    #[inline]
    fn default() -> Self {
        Self {
            listing_url: "https://discourse.onlinedegree.iitm.ac.in/c/courses/tds-kb/34"
                .to_string(),
            output_path: PathBuf::from("discourse_tds_kb.json"),
            user_agent: "discourse-qa/0.1.0 (Topic Collector)".to_string(),
            timeout_seconds: 20,
            enable_js_rendering: true,
            link_text_limit: 100,
            selectors: SelectorConfig::default(),
            browser: BrowserConfig::default(),
        }
    }
}

impl CollectorConfig {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url(&self.listing_url)
            .map_err(|_| ConfigError::InvalidUrl(self.listing_url.clone()))?;

        if !(1..=300).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if !(1..=10_000).contains(&self.link_text_limit) {
            return Err(ConfigError::InvalidLinkTextLimit(self.link_text_limit));
        }

        TopicSelectors::compile(&self.selectors)?;

        self.browser
            .validate()
            .map_err(|e| ConfigError::InvalidBrowser(e.to_string()))?;

        Ok(())
    }
}

/// Blocking HTTP fetcher. Each page is requested once; there are no retries.
#[derive(Debug)]
pub struct HttpClient {
    agent: Agent,
}

impl HttpClient {
    #[inline]
    pub fn new(config: &CollectorConfig) -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .user_agent(&config.user_agent)
            .build()
            .into();

        Self { agent }
    }

    /// GET a page and return its body
    #[inline]
    pub fn get(&self, url: &Url) -> Result<String> {
        debug!("Making HTTP GET request to: {}", url);

        match self.agent.get(url.as_str()).call() {
            Ok(mut response) => {
                let text = response
                    .body_mut()
                    .read_to_string()
                    .with_context(|| format!("Failed to read response body from {}", url))?;
                debug!("Read {} bytes from {}", text.len(), url);
                Ok(text)
            }
            Err(ureq::Error::StatusCode(status)) => Err(anyhow!("HTTP error {} for {}", status, url)),
            Err(e) => Err(anyhow::Error::from(e))
                .with_context(|| format!("Failed to make HTTP request to {}", url)),
        }
    }
}

/// Validate a URL and require an http(s) scheme with a host
#[inline]
pub fn validate_url(url_str: &str) -> Result<Url> {
    let url = Url::parse(url_str).with_context(|| format!("Invalid URL format: {}", url_str))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(anyhow!("URL must use HTTP or HTTPS scheme: {}", url_str));
    }

    if url.host_str().is_none() {
        return Err(anyhow!("URL must have a valid host: {}", url_str));
    }

    Ok(url)
}

/// Resolve `href` against the page it appeared on.
///
/// Returns `None` for empty, `mailto:`, `javascript:` and fragment-only links.
#[inline]
pub fn resolve_url(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("javascript:")
    {
        return None;
    }

    match page_url.join(href) {
        Ok(url) => Some(url),
        Err(e) => {
            debug!("Failed to resolve '{}' relative to {}: {}", href, page_url, e);
            None
        }
    }
}

/// Counters for one collection run
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectStats {
    /// Topic URLs found on the listing page
    pub discovered: usize,
    /// Topics turned into records
    pub collected: usize,
    /// Topics skipped after an error
    pub failed: usize,
    pub duration: Duration,
}

/// Output of a collection run
#[derive(Debug, Clone)]
pub struct Collection {
    pub topics: Vec<TopicRecord>,
    pub stats: CollectStats,
}

/// Visits a category listing and every topic on it, one page at a time
pub struct TopicCollector {
    http_client: HttpClient,
    browser_client: Option<BrowserClient>,
    selectors: TopicSelectors,
    config: CollectorConfig,
}

impl TopicCollector {
    #[inline]
    pub fn new(config: CollectorConfig) -> Result<Self> {
        let selectors =
            TopicSelectors::compile(&config.selectors).context("Invalid collector selectors")?;
        let http_client = HttpClient::new(&config);

        let browser_client = if config.enable_js_rendering {
            info!("JavaScript rendering enabled with browser client");
            Some(BrowserClient::new(
                config.browser.clone(),
                config.user_agent.clone(),
            ))
        } else {
            debug!("JavaScript rendering disabled");
            None
        };

        Ok(Self {
            http_client,
            browser_client,
            selectors,
            config,
        })
    }

    /// Collect every topic linked from `listing_url`.
    ///
    /// Failing to read the listing aborts the run; a failing topic is logged and skipped.
    #[inline]
    pub async fn collect(&self, listing_url: &str) -> Result<Collection> {
        let start_time = Instant::now();
        let listing_url = validate_url(listing_url)?;

        info!("Collecting topics from {}", listing_url);

        let listing_html = self
            .fetch(&listing_url, &self.config.selectors.listing_ready, true)
            .await
            .with_context(|| format!("Failed to load topic listing {}", listing_url))?;

        let topic_urls = extract_topic_urls(&listing_html, &listing_url, &self.selectors);
        info!("Found {} topics to process", topic_urls.len());

        let mut stats = CollectStats {
            discovered: topic_urls.len(),
            ..CollectStats::default()
        };
        let mut topics = Vec::with_capacity(topic_urls.len());

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(topic_urls.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Collecting {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            )
        } else {
            ProgressBar::hidden()
        };

        for (position, topic_url) in topic_urls.iter().enumerate() {
            bar.set_message(topic_url.to_string());
            debug!(
                "Processing topic {}/{}: {}",
                position + 1,
                topic_urls.len(),
                topic_url
            );

            match self.collect_topic(topic_url).await {
                Ok(topic) => {
                    debug!("Collected '{}'", topic.title);
                    stats.collected += 1;
                    topics.push(topic);
                }
                Err(e) => {
                    error!(
                        "Skipping topic {}/{} at {}: {:#}",
                        position + 1,
                        topic_urls.len(),
                        topic_url,
                        e
                    );
                    stats.failed += 1;
                }
            }
            bar.inc(1);
        }

        bar.finish_and_clear();
        stats.duration = start_time.elapsed();

        info!(
            "Collection finished: {} collected, {} skipped, took {:?}",
            stats.collected, stats.failed, stats.duration
        );

        Ok(Collection { topics, stats })
    }

    /// Fetch and extract a single topic page
    #[inline]
    pub async fn collect_topic(&self, topic_url: &Url) -> Result<TopicRecord> {
        let html = self
            .fetch(topic_url, &self.config.selectors.topic_ready, false)
            .await?;
        extract_topic(
            &html,
            topic_url,
            &self.selectors,
            self.config.link_text_limit,
        )
    }

    /// Browser rendering when available, plain HTTP otherwise or when rendering fails
    async fn fetch(&self, url: &Url, ready_selector: &str, scroll: bool) -> Result<String> {
        if let Some(browser_client) = &self.browser_client {
            match browser_client.render_page(url, ready_selector, scroll).await {
                Ok(html) => {
                    debug!("Rendered {} with JavaScript", url);
                    return Ok(html);
                }
                Err(e) => {
                    warn!(
                        "Browser rendering failed for {}, falling back to HTTP: {:#}",
                        url, e
                    );
                }
            }
        }

        self.http_client.get(url)
    }
}
