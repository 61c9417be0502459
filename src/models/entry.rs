//! Paper entry model: one announced paper taken from the arXiv feed.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;

/// How the feed announces an item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnnounceType {
    /// First-time announcement of a paper
    New,
    /// Cross-listing from another category
    Cross,
    /// Replacement (new version) of an earlier paper
    Replace,
    /// Replacement of a cross-listed paper
    ReplaceCross,
    #[serde(untagged)]
    Other(String),
}

impl AnnounceType {
    /// Returns the identifier used in the feed
    pub fn as_str(&self) -> &str {
        match self {
            AnnounceType::New => "new",
            AnnounceType::Cross => "cross",
            AnnounceType::Replace => "replace",
            AnnounceType::ReplaceCross => "replace-cross",
            AnnounceType::Other(s) => s,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, AnnounceType::New)
    }
}

impl FromStr for AnnounceType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "new" => AnnounceType::New,
            "cross" => AnnounceType::Cross,
            "replace" => AnnounceType::Replace,
            "replace-cross" => AnnounceType::ReplaceCross,
            other => AnnounceType::Other(other.to_string()),
        })
    }
}

impl std::fmt::Display for AnnounceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A newly announced paper
///
/// All text fields hold plain text (LaTeX and HTML already normalized).
/// Only `shortened_abstract` changes after construction, set once by the
/// summarizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperEntry {
    /// Abstract page URL
    pub link: String,

    /// Paper title
    pub title: String,

    /// Authors as listed in the feed (comma-separated)
    pub authors: String,

    /// Full abstract
    pub r#abstract: String,

    /// Generated, length-bounded summary
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortened_abstract: Option<String>,
}

impl PaperEntry {
    /// Create a new entry with required fields
    pub fn new(
        link: impl Into<String>,
        title: impl Into<String>,
        authors: impl Into<String>,
        abstract_text: impl Into<String>,
    ) -> Self {
        Self {
            link: link.into(),
            title: title.into(),
            authors: authors.into(),
            r#abstract: abstract_text.into(),
            shortened_abstract: None,
        }
    }

    /// Text to publish: the short abstract if the summarizer ran, else the full abstract
    pub fn post_text(&self) -> &str {
        self.shortened_abstract.as_deref().unwrap_or(&self.r#abstract)
    }

    /// arXiv identifier taken from the link (`https://arxiv.org/abs/2410.01234` -> `2410.01234`)
    pub fn arxiv_id(&self) -> Option<&str> {
        self.link
            .split("/abs/")
            .nth(1)
            .map(|id| id.trim_end_matches('/'))
            .filter(|id| !id.is_empty())
    }
}
