//! In-memory posting service for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::time::Instant;

use crate::config::Credentials;
use crate::models::{Post, PostRef, Session};
use crate::publisher::PostingService;
use crate::sources::SourceError;

/// Records every post and can be told to fail for specific links.
#[derive(Debug, Default)]
pub struct MockPostingService {
    logins: AtomicUsize,
    posts: Mutex<Vec<(Instant, Post)>>,
    attempts: Mutex<HashMap<String, u32>>,
    failures: Mutex<HashMap<String, u32>>,
}

impl MockPostingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `times` attempts to post the entry at `link`
    pub fn fail_times(&self, link: &str, times: u32) {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        failures.insert(link.to_string(), times);
    }

    /// Fail every attempt to post the entry at `link`
    pub fn always_fail(&self, link: &str) {
        self.fail_times(link, u32::MAX);
    }

    /// Successfully created posts, in order
    pub fn posts(&self) -> Vec<Post> {
        let posts = self.posts.lock().unwrap_or_else(|e| e.into_inner());
        posts.iter().map(|(_, post)| post.clone()).collect()
    }

    /// Clock readings at which each post was created
    pub fn post_times(&self) -> Vec<Instant> {
        let posts = self.posts.lock().unwrap_or_else(|e| e.into_inner());
        posts.iter().map(|(at, _)| *at).collect()
    }

    /// Number of create attempts for the entry at `link`
    pub fn attempts_for(&self, link: &str) -> u32 {
        let attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        attempts.get(link).copied().unwrap_or(0)
    }

    pub fn login_count(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PostingService for MockPostingService {
    fn id(&self) -> &str {
        "mock"
    }

    async fn login(&self, credentials: &Credentials) -> Result<Session, SourceError> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        Ok(Session {
            did: "did:plc:mock".to_string(),
            handle: credentials.handle.clone(),
            access_jwt: "mock-token".to_string(),
        })
    }

    async fn create_post(&self, _session: &Session, post: &Post) -> Result<PostRef, SourceError> {
        let link = post.card.uri.clone();
        {
            let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
            *attempts.entry(link.clone()).or_insert(0) += 1;
        }

        {
            let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(remaining) = failures.get_mut(&link) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SourceError::Network(format!("simulated failure for {}", link)));
                }
            }
        }

        let mut posts = self.posts.lock().unwrap_or_else(|e| e.into_inner());
        posts.push((Instant::now(), post.clone()));
        Ok(PostRef {
            uri: format!("at://did:plc:mock/app.bsky.feed.post/{}", posts.len()),
            cid: format!("mock-cid-{}", posts.len()),
        })
    }
}
