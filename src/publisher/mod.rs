//! Posting of summarized entries, paced across a time window.
//!
//! Posts go out one at a time. After each post except the last the publisher
//! sleeps `window / K`, where `K` is the number of entries in the batch, so a
//! batch of any size fills the same window. Every attempt logs in afresh
//! before creating the post; an entry that keeps failing is skipped after the
//! retry budget and the batch carries on.

mod bluesky;
pub mod mock;

pub use bluesky::BlueskyClient;
pub use mock::MockPostingService;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Credentials, PublisherConfig};
use crate::models::{PaperEntry, Post, PostRef, Session};
use crate::sources::SourceError;
use crate::utils::{with_retry, RetryPolicy};

/// A social posting service
#[async_trait]
pub trait PostingService: Send + Sync + std::fmt::Debug {
    /// Identifier for logs (e.g., "bluesky")
    fn id(&self) -> &str;

    /// Open an authenticated session
    async fn login(&self, credentials: &Credentials) -> Result<Session, SourceError>;

    /// Publish one post with its link card
    async fn create_post(&self, session: &Session, post: &Post) -> Result<PostRef, SourceError>;
}

/// Outcome of a publishing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// References of the created posts, in entry order
    pub posted: Vec<PostRef>,

    /// Links of entries abandoned after the retry budget
    pub skipped: Vec<String>,
}

impl PublishReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Publishes entries one by one with pacing and per-post retries
#[derive(Debug, Clone)]
pub struct Publisher {
    service: Arc<dyn PostingService>,
    credentials: Credentials,
    retry: RetryPolicy,
    window: Duration,
    char_limit: usize,
}

impl Publisher {
    /// Create a publisher from the `[publisher]` configuration section
    pub fn new(
        service: Arc<dyn PostingService>,
        credentials: Credentials,
        config: &PublisherConfig,
    ) -> Self {
        Self {
            service,
            credentials,
            retry: config.retry.policy(),
            window: config.window(),
            char_limit: config.char_limit,
        }
    }

    /// Sleep between two consecutive posts of a batch of `count` entries
    pub fn inter_post_delay(&self, count: usize) -> Duration {
        if count == 0 {
            return Duration::ZERO;
        }
        let count = u32::try_from(count).unwrap_or(u32::MAX);
        self.window / count
    }

    /// Post every entry in order.
    ///
    /// Failures never abort the batch; they are logged and reported in
    /// [`PublishReport::skipped`].
    pub async fn publish_all(&self, entries: &[PaperEntry]) -> PublishReport {
        let mut report = PublishReport::default();
        if entries.is_empty() {
            return report;
        }

        let delay = self.inter_post_delay(entries.len());
        tracing::info!(
            count = entries.len(),
            service = self.service.id(),
            "Publishing entries every {:?}",
            delay
        );

        for (idx, entry) in entries.iter().enumerate() {
            let post = Post::for_entry(entry, self.char_limit);
            let paper = entry.arxiv_id().unwrap_or(&entry.link);

            match self.publish_one(&post).await {
                Ok(post_ref) => {
                    tracing::info!(%paper, uri = %post_ref.uri, "Posted");
                    report.posted.push(post_ref);
                }
                Err(e) => {
                    tracing::error!(%paper, "Skipping entry: {}", e);
                    report.skipped.push(entry.link.clone());
                }
            }

            if idx + 1 < entries.len() {
                tokio::time::sleep(delay).await;
            }
        }

        report
    }

    async fn publish_one(&self, post: &Post) -> Result<PostRef, SourceError> {
        let service = &self.service;
        let credentials = &self.credentials;

        with_retry(self.retry, "post", move || async move {
            let session = service.login(credentials).await?;
            service.create_post(&session, post).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::make_entry;
    use crate::utils::char_len;
    use tokio::time::Instant;

    fn credentials() -> Credentials {
        Credentials {
            handle: "bot.bsky.social".to_string(),
            app_password: "app-pass".to_string(),
            api_key: "key".to_string(),
        }
    }

    fn publisher(service: Arc<MockPostingService>, window_secs: u64) -> Publisher {
        let config = PublisherConfig {
            window_secs,
            ..PublisherConfig::default()
        };
        Publisher::new(service, credentials(), &config)
    }

    fn entries(n: usize) -> Vec<PaperEntry> {
        (1..=n)
            .map(|i| {
                let mut entry = make_entry(&format!("2410.0000{}", i), &format!("Paper {}", i));
                entry.shortened_abstract = Some(format!("Summary {}.", i));
                entry
            })
            .collect()
    }

    #[test]
    fn test_inter_post_delay() {
        let service = Arc::new(MockPostingService::new());
        let publisher = publisher(service, 18_000);
        assert_eq!(publisher.inter_post_delay(0), Duration::ZERO);
        assert_eq!(publisher.inter_post_delay(1), Duration::from_secs(18_000));
        assert_eq!(publisher.inter_post_delay(4), Duration::from_secs(4_500));
        assert_eq!(publisher.inter_post_delay(7), Duration::from_secs(18_000) / 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_posts_are_spread_across_the_window() {
        let service = Arc::new(MockPostingService::new());
        let publisher = publisher(service.clone(), 300);
        let entries = entries(3);

        let start = Instant::now();
        let report = publisher.publish_all(&entries).await;

        assert_eq!(start.elapsed(), Duration::from_secs(200));
        assert_eq!(report.posted.len(), 3);
        assert!(report.is_complete());

        let times = service.post_times();
        assert_eq!(times.len(), 3);
        assert_eq!(times[1] - times[0], Duration::from_secs(100));
        assert_eq!(times[2] - times[1], Duration::from_secs(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_entry_does_not_sleep() {
        let service = Arc::new(MockPostingService::new());
        let publisher = publisher(service, 18_000);

        let start = Instant::now();
        let report = publisher.publish_all(&entries(1)).await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(report.posted.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_posts_keep_entry_order_and_content() {
        let service = Arc::new(MockPostingService::new());
        let publisher = publisher(service.clone(), 60);
        let entries = entries(2);

        publisher.publish_all(&entries).await;

        let posts = service.posts();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].text, "Summary 1.");
        assert_eq!(posts[0].card.uri, "https://arxiv.org/abs/2410.00001");
        assert_eq!(posts[0].card.title, "Paper 1");
        assert_eq!(posts[0].card.description, "Test Author");
        assert_eq!(posts[1].text, "Summary 2.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_entry_is_skipped_after_five_attempts() {
        let service = Arc::new(MockPostingService::new());
        service.always_fail("https://arxiv.org/abs/2410.00002");
        let publisher = publisher(service.clone(), 300);
        let entries = entries(3);

        let start = Instant::now();
        let report = publisher.publish_all(&entries).await;

        assert_eq!(report.posted.len(), 2);
        assert_eq!(report.skipped, vec!["https://arxiv.org/abs/2410.00002".to_string()]);
        assert_eq!(service.attempts_for("https://arxiv.org/abs/2410.00002"), 5);
        // One fresh login per attempt: 1 + 5 + 1
        assert_eq!(service.login_count(), 7);
        // Pacing plus four one-minute retry delays
        assert_eq!(start.elapsed(), Duration::from_secs(200 + 4 * 60));

        let texts: Vec<String> = service.posts().into_iter().map(|p| p.text).collect();
        assert_eq!(texts, vec!["Summary 1.", "Summary 3."]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_recovers() {
        let service = Arc::new(MockPostingService::new());
        service.fail_times("https://arxiv.org/abs/2410.00001", 2);
        let publisher = publisher(service.clone(), 60);

        let report = publisher.publish_all(&entries(1)).await;

        assert!(report.is_complete());
        assert_eq!(report.posted.len(), 1);
        assert_eq!(service.attempts_for("https://arxiv.org/abs/2410.00001"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_body_never_exceeds_limit() {
        let service = Arc::new(MockPostingService::new());
        let publisher = publisher(service.clone(), 60);
        let mut entries = entries(2);
        entries[0].shortened_abstract = Some("é".repeat(500));
        entries[1].shortened_abstract = None;
        entries[1].r#abstract = "w".repeat(1200);

        publisher.publish_all(&entries).await;

        for post in service.posts() {
            assert!(char_len(&post.text) <= 300);
        }
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let service = Arc::new(MockPostingService::new());
        let report = publisher(service.clone(), 60).publish_all(&[]).await;
        assert_eq!(report, PublishReport::default());
        assert_eq!(service.login_count(), 0);
    }
}
