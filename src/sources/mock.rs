//! Mock feed source for testing purposes.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::PaperEntry;
use crate::sources::{FeedSource, SourceError};

/// A mock feed that returns predefined entries.
#[derive(Debug, Default)]
pub struct MockFeed {
    entries: Mutex<Vec<PaperEntry>>,
}

impl MockFeed {
    /// Create a new mock feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock feed returning `entries`.
    pub fn with_entries(entries: Vec<PaperEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    /// Set the entries to return.
    pub fn set_entries(&self, entries: Vec<PaperEntry>) {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        *guard = entries;
    }
}

#[async_trait]
impl FeedSource for MockFeed {
    fn id(&self) -> &str {
        "mock"
    }

    async fn fetch_new(&self) -> Result<Vec<PaperEntry>, SourceError> {
        let guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }
}

/// Helper function to create a mock entry for testing.
pub fn make_entry(id: &str, title: &str) -> PaperEntry {
    PaperEntry::new(
        format!("https://arxiv.org/abs/{}", id),
        title,
        "Test Author",
        format!("Abstract of {}.", title),
    )
}
