//! Feed sources and the error type shared by every external service.
//!
//! A [`FeedSource`] turns a subject-category feed into the list of newly
//! announced [`PaperEntry`] values. [`ArxivFeed`] is the production
//! implementation; [`MockFeed`] returns canned entries for tests.

mod arxiv;
pub mod mock;

pub use arxiv::{parse_feed, ArxivFeed};
pub use mock::MockFeed;

use crate::models::PaperEntry;
use async_trait::async_trait;

/// The FeedSource trait defines the interface of the feed fetcher stage.
#[async_trait]
pub trait FeedSource: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g., "arxiv")
    fn id(&self) -> &str;

    /// Fetch the feed and return its newly announced entries, in feed order.
    ///
    /// Implementations retry internally; an error means the source stayed
    /// unreachable or malformed for the whole retry budget.
    async fn fetch_new(&self) -> Result<Vec<PaperEntry>, SourceError>;
}

/// Errors that can occur when talking to an external service
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML, JSON, HTML, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Feed item whose description has no `Abstract:` marker
    #[error("No 'Abstract:' marker in description of {link}")]
    MissingAbstract { link: String },

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication rejected by the service
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// API error from the service
    #[error("API error: {0}")]
    Api(String),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::DeError> for SourceError {
    fn from(err: quick_xml::DeError) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}

impl From<url::ParseError> for SourceError {
    fn from(err: url::ParseError) -> Self {
        SourceError::InvalidRequest(format!("URL: {}", err))
    }
}
