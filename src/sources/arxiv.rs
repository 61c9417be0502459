//! arXiv RSS feed source.

use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

use crate::config::FeedConfig;
use crate::models::{AnnounceType, PaperEntry};
use crate::sources::{FeedSource, SourceError};
use crate::utils::{error_for_status, html_to_text, latex_to_text, with_retry, HttpClient, RetryPolicy};

/// Marker that precedes the abstract inside an item description
const ABSTRACT_MARKER: &str = "Abstract:";

/// arXiv subject-category RSS feed
///
/// Fetches the union feed of all configured categories and keeps only the
/// items announced as `new`.
#[derive(Debug, Clone)]
pub struct ArxivFeed {
    client: Arc<HttpClient>,
    base_url: String,
    categories: Vec<String>,
    retry: RetryPolicy,
}

impl ArxivFeed {
    /// Create a feed source from the `[feed]` configuration section
    pub fn new(config: &FeedConfig, client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            categories: config.categories.clone(),
            retry: config.retry.policy(),
        }
    }

    /// Override the retry policy (for testing)
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// URL of the union feed: `{base_url}/{cat1+cat2+...}`
    pub fn feed_url(&self) -> Result<String, SourceError> {
        let categories: Vec<&str> = self
            .categories
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();

        if categories.is_empty() {
            return Err(SourceError::InvalidRequest(
                "No feed categories configured".to_string(),
            ));
        }

        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            categories.join("+")
        );
        Url::parse(&url)?;
        Ok(url)
    }

    async fn fetch_once(client: &HttpClient, url: &str) -> Result<Vec<PaperEntry>, SourceError> {
        let response = client
            .client()
            .get(url)
            .header("Accept", "application/rss+xml")
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch arXiv feed: {}", e)))?;

        let response = error_for_status("arXiv", response).await?;

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))?;

        parse_feed(&body)
    }
}

#[async_trait]
impl FeedSource for ArxivFeed {
    fn id(&self) -> &str {
        "arxiv"
    }

    async fn fetch_new(&self) -> Result<Vec<PaperEntry>, SourceError> {
        let url = self.feed_url()?;
        tracing::info!("Fetching feed from {}", url);

        let client = Arc::clone(&self.client);
        let entries = with_retry(self.retry, "arXiv feed fetch", || {
            let client = Arc::clone(&client);
            let url = url.clone();
            async move { Self::fetch_once(&client, &url).await }
        })
        .await?;

        tracing::debug!(count = entries.len(), "Parsed new announcements");
        Ok(entries)
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: String,

    #[serde(default)]
    link: String,

    #[serde(default)]
    description: String,

    #[serde(rename = "dc:creator", alias = "creator", default)]
    creator: String,

    #[serde(rename = "arxiv:announce_type", alias = "announce_type", default)]
    announce_type: Option<String>,
}

impl Item {
    fn announce_type(&self) -> AnnounceType {
        self.announce_type
            .as_deref()
            .unwrap_or_default()
            .parse()
            .unwrap_or(AnnounceType::Other(String::new()))
    }

    fn into_entry(self) -> Result<PaperEntry, SourceError> {
        let link = self.link.trim().to_string();
        if link.is_empty() {
            return Err(SourceError::Parse(format!(
                "Feed item '{}' has no link",
                self.title.trim()
            )));
        }

        let abstract_text = extract_abstract(&self.description, &link)?;

        Ok(PaperEntry::new(
            link,
            latex_to_text(&self.title),
            latex_to_text(&self.creator),
            abstract_text,
        ))
    }
}

/// Parse an arXiv RSS document into its newly announced entries, in feed order.
///
/// Items with any other announce type (cross-lists, replacements) are skipped
/// without being inspected.
pub fn parse_feed(xml: &str) -> Result<Vec<PaperEntry>, SourceError> {
    let rss: Rss = from_str(xml)
        .map_err(|e| SourceError::Parse(format!("Failed to parse arXiv RSS: {}", e)))?;

    rss.channel
        .items
        .into_iter()
        .filter(|item| item.announce_type().is_new())
        .map(Item::into_entry)
        .collect()
}

/// Text after the first `Abstract:` marker of an HTML description
fn extract_abstract(description: &str, link: &str) -> Result<String, SourceError> {
    let text = html_to_text(description);
    let (_, abstract_text) =
        text.split_once(ABSTRACT_MARKER)
            .ok_or_else(|| SourceError::MissingAbstract {
                link: link.to_string(),
            })?;

    Ok(latex_to_text(abstract_text.trim()))
}
