//! One run of the bot: fetch, summarize, publish.

use std::sync::Arc;

use crate::config::{Config, Credentials};
use crate::publisher::{BlueskyClient, PublishReport, Publisher};
use crate::sources::{ArxivFeed, FeedSource, SourceError};
use crate::summarizer::{GeminiClient, SummarizeError, Summarizer};
use crate::utils::HttpClient;

/// Fatal errors of a run
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Failed to fetch feed: {0}")]
    Fetch(#[source] SourceError),

    #[error("Failed to summarize abstracts: {0}")]
    Summarize(#[from] SummarizeError),

    #[error("Failed to set up HTTP client: {0}")]
    Http(#[source] SourceError),
}

/// What a run accomplished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The feed had no new announcements
    NothingToDo,

    /// Entries were summarized and handed to the publisher
    Published(PublishReport),
}

/// Run the production pipeline against the configured services
pub async fn run(config: &Config, credentials: Credentials) -> Result<Outcome, PipelineError> {
    let http = Arc::new(HttpClient::from_config(&config.http).map_err(PipelineError::Http)?);

    let feed = ArxivFeed::new(&config.feed, Arc::clone(&http));
    let gemini = GeminiClient::new(
        &config.summarizer,
        credentials.api_key.clone(),
        Arc::clone(&http),
    );
    let summarizer = Summarizer::new(Arc::new(gemini), config.summarizer.char_budget);
    let bluesky = BlueskyClient::new(&config.publisher, http);
    let publisher = Publisher::new(Arc::new(bluesky), credentials, &config.publisher);

    run_with(&feed, &summarizer, &publisher).await
}

/// Run the pipeline over already constructed components
pub async fn run_with(
    feed: &dyn FeedSource,
    summarizer: &Summarizer,
    publisher: &Publisher,
) -> Result<Outcome, PipelineError> {
    let mut entries = feed.fetch_new().await.map_err(PipelineError::Fetch)?;

    if entries.is_empty() {
        tracing::info!("No new entries");
        return Ok(Outcome::NothingToDo);
    }
    tracing::info!(count = entries.len(), source = feed.id(), "Fetched new entries");

    summarizer.shorten(&mut entries).await?;

    let report = publisher.publish_all(&entries).await;
    tracing::info!(
        posted = report.posted.len(),
        skipped = report.skipped.len(),
        "Run finished"
    );

    Ok(Outcome::Published(report))
}
