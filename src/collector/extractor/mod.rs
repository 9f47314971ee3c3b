
use anyhow::{Result, anyhow};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use super::{SelectorConfig, resolve_url};
use crate::config::ConfigError;
use crate::topics::{TopicLink, TopicRecord};

const LINK_SELECTOR: &str = "a[href]";
const IMAGE_SELECTOR: &str = "img";

/// Parsed form of [`SelectorConfig`]
#[derive(Debug, Clone)]
pub struct TopicSelectors {
    listing_item: Selector,
    topic_link: Selector,
    title: Vec<Selector>,
    content: Vec<Selector>,
    link: Selector,
    image: Selector,
}

impl TopicSelectors {
    #[inline]
    pub fn compile(config: &SelectorConfig) -> Result<Self, ConfigError> {
        if config.title.is_empty() {
            return Err(ConfigError::InvalidSelector {
                name: "title",
                selector: String::new(),
            });
        }
        if config.content.is_empty() {
            return Err(ConfigError::InvalidSelector {
                name: "content",
                selector: String::new(),
            });
        }

        // Only checked for syntax; the browser consumes these as strings
        parse_selector("listing_ready", &config.listing_ready)?;
        parse_selector("topic_ready", &config.topic_ready)?;

        Ok(Self {
            listing_item: parse_selector("listing_item", &config.listing_item)?,
            topic_link: parse_selector("topic_link", &config.topic_link)?,
            title: config
                .title
                .iter()
                .map(|s| parse_selector("title", s))
                .collect::<Result<_, _>>()?,
            content: config
                .content
                .iter()
                .map(|s| parse_selector("content", s))
                .collect::<Result<_, _>>()?,
            link: parse_selector("link", LINK_SELECTOR)?,
            image: parse_selector("image", IMAGE_SELECTOR)?,
        })
    }
}

fn parse_selector(name: &'static str, selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector).map_err(|_| ConfigError::InvalidSelector {
        name,
        selector: selector.to_string(),
    })
}

/// Topic URLs on a category listing, absolute and in page order.
///
/// Rows without a topic link are skipped, as are repeated URLs.
#[inline]
pub fn extract_topic_urls(html: &str, listing_url: &Url, selectors: &TopicSelectors) -> Vec<Url> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for item in document.select(&selectors.listing_item) {
        let Some(href) = item
            .select(&selectors.topic_link)
            .find_map(|link| link.value().attr("href"))
        else {
            debug!("Listing row without a topic link");
            continue;
        };

        let Some(mut url) = resolve_url(href, listing_url) else {
            continue;
        };
        url.set_fragment(None);

        if seen.insert(url.clone()) {
            urls.push(url);
        }
    }

    urls
}

/// Build a [`TopicRecord`] from a topic page.
///
/// Fails when no title or content element matches.
#[inline]
pub fn extract_topic(
    html: &str,
    topic_url: &Url,
    selectors: &TopicSelectors,
    link_text_limit: usize,
) -> Result<TopicRecord> {
    let document = Html::parse_document(html);

    let title = first_match(&document, &selectors.title)
        .map(element_text)
        .ok_or_else(|| anyhow!("No title element found on {}", topic_url))?;
    let body = first_match(&document, &selectors.content)
        .ok_or_else(|| anyhow!("No content element found on {}", topic_url))?;

    let links = body
        .select(&selectors.link)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let url = resolve_url(href, topic_url)?;
            Some(TopicLink {
                url: url.to_string(),
                text: truncate_chars(&element_text(anchor), link_text_limit),
            })
        })
        .collect();

    let images = body
        .select(&selectors.image)
        .filter_map(|img| {
            let src = ["src", "data-src"]
                .into_iter()
                .filter_map(|attr| img.value().attr(attr))
                .find(|src| !src.trim().is_empty() && !src.starts_with("data:"))?;
            resolve_url(src, topic_url).map(|url| url.to_string())
        })
        .collect();

    Ok(TopicRecord {
        title,
        content: element_text(body),
        url: topic_url.to_string(),
        links,
        images,
    })
}

fn first_match<'a>(document: &'a Html, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors
        .iter()
        .find_map(|selector| document.select(selector).next())
}

/// Visible text of an element: trimmed text nodes joined by single spaces
#[inline]
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cut `text` to at most `limit` characters
#[inline]
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
