
use anyhow::{Context, Result, anyhow, bail};
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Configuration for browser rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Whether to run the browser in headless mode
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    /// Timeout for page navigation and the ready selector in seconds
    pub navigation_timeout_seconds: u64,
    /// Idle timeout for the launched browser in seconds
    pub launch_timeout_seconds: u64,
    /// Upper bound on scroll steps for a listing page
    pub max_scrolls: u32,
    /// Pause after each scroll so more topics can load
    pub scroll_pause_ms: u64,
    /// Additional Chrome arguments
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    #[inline]
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1280,
            window_height: 720,
            navigation_timeout_seconds: 30,
            launch_timeout_seconds: 60,
            max_scrolls: 50,
            scroll_pause_ms: 2000,
            chrome_args: vec![
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
                "--disable-extensions".to_string(),
            ],
        }
    }
}

impl BrowserConfig {
    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.window_width == 0 || self.window_height == 0 {
            bail!(
                "window size must be non-zero, got {}x{}",
                self.window_width,
                self.window_height
            );
        }
        if !(1..=300).contains(&self.navigation_timeout_seconds) {
            bail!(
                "navigation timeout must be between 1 and 300 seconds, got {}",
                self.navigation_timeout_seconds
            );
        }
        if self.launch_timeout_seconds == 0 {
            bail!("launch timeout must be at least 1 second");
        }
        if self.max_scrolls > 1000 {
            bail!("max_scrolls must be at most 1000, got {}", self.max_scrolls);
        }
        if self.scroll_pause_ms > 60_000 {
            bail!(
                "scroll pause must be at most 60000 ms, got {}",
                self.scroll_pause_ms
            );
        }
        Ok(())
    }
}

/// Renders pages in a single headless Chrome instance, launched on first use
pub struct BrowserClient {
    config: BrowserConfig,
    user_agent: String,
    browser: Mutex<Option<Arc<Browser>>>,
}

impl BrowserClient {
    #[inline]
    pub fn new(config: BrowserConfig, user_agent: String) -> Self {
        Self {
            config,
            user_agent,
            browser: Mutex::new(None),
        }
    }

    /// Whether Chrome has been started yet
    #[inline]
    pub fn is_launched(&self) -> bool {
        self.browser.lock().is_ok_and(|browser| browser.is_some())
    }

    /// Load `url`, wait for `ready_selector`, optionally scroll until the page stops
    /// growing, and return the rendered HTML
    #[inline]
    pub async fn render_page(&self, url: &Url, ready_selector: &str, scroll: bool) -> Result<String> {
        let browser = self.browser()?;
        let tab = browser
            .new_tab()
            .with_context(|| "Failed to create new browser tab")?;

        let result = self.render_in_tab(&tab, url, ready_selector, scroll).await;

        if let Err(e) = tab.close(true) {
            debug!("Failed to close tab for {}: {}", url, e);
        }

        result
    }

    async fn render_in_tab(
        &self,
        tab: &Arc<Tab>,
        url: &Url,
        ready_selector: &str,
        scroll: bool,
    ) -> Result<String> {
        let timeout = Duration::from_secs(self.config.navigation_timeout_seconds);
        tab.set_default_timeout(timeout);
        tab.set_user_agent(&self.user_agent, None, None)
            .with_context(|| "Failed to set user agent")?;

        debug!("Navigating to URL: {}", url);
        tab.navigate_to(url.as_str())
            .with_context(|| format!("Failed to navigate to {}", url))?;
        tab.wait_until_navigated()
            .with_context(|| format!("Navigation to {} did not complete", url))?;
        tab.wait_for_element_with_custom_timeout(ready_selector, timeout)
            .with_context(|| format!("'{}' never appeared on {}", ready_selector, url))?;

        if scroll {
            self.scroll_to_end(tab).await?;
        }

        let content = tab
            .get_content()
            .with_context(|| "Failed to get page content")?;
        debug!("Rendered {} bytes from {}", content.len(), url);
        Ok(content)
    }

    /// Scroll to the bottom repeatedly until the document height stops changing
    async fn scroll_to_end(&self, tab: &Arc<Tab>) -> Result<()> {
        let pause = Duration::from_millis(self.config.scroll_pause_ms);
        let mut last_height = page_height(tab)?;

        for step in 0..self.config.max_scrolls {
            tab.evaluate("window.scrollTo(0, document.body.scrollHeight)", false)
                .with_context(|| "Failed to scroll page")?;
            tokio::time::sleep(pause).await;

            let height = page_height(tab)?;
            if height == last_height {
                debug!("Page stopped growing after {} scrolls", step + 1);
                return Ok(());
            }
            last_height = height;
        }

        warn!(
            "Page still growing after {} scrolls, reading what has loaded",
            self.config.max_scrolls
        );
        Ok(())
    }

    fn browser(&self) -> Result<Arc<Browser>> {
        let mut slot = self
            .browser
            .lock()
            .map_err(|e| anyhow!("Browser lock poisoned: {}", e))?;

        if let Some(browser) = slot.as_ref() {
            return Ok(Arc::clone(browser));
        }

        let args: Vec<&OsStr> = self.config.chrome_args.iter().map(OsStr::new).collect();
        let launch_options = LaunchOptions {
            headless: self.config.headless,
            window_size: Some((self.config.window_width, self.config.window_height)),
            args,
            idle_browser_timeout: Duration::from_secs(self.config.launch_timeout_seconds),
            ..Default::default()
        };

        let browser = Arc::new(
            Browser::new(launch_options).with_context(|| "Failed to launch browser instance")?,
        );
        info!("Launched headless browser");
        *slot = Some(Arc::clone(&browser));
        Ok(browser)
    }
}

fn page_height(tab: &Tab) -> Result<u64> {
    let result = tab
        .evaluate("document.body.scrollHeight", false)
        .with_context(|| "Failed to read page height")?;
    Ok(result
        .value
        .and_then(|value| value.as_u64())
        .unwrap_or_default())
}
