//! Post models for the posting service.

use serde::{Deserialize, Serialize};

use super::PaperEntry;
use crate::utils::truncate_chars;

/// External link card attached to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCard {
    pub uri: String,
    pub title: String,
    pub description: String,
}

/// A post ready to publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Post body, never longer than the limit it was built with
    pub text: String,

    /// Link card embed
    pub card: LinkCard,
}

impl Post {
    /// Build the post for an entry, hard-truncating the body to `char_limit`.
    ///
    /// The card carries the entry URL, with the title as card title and the
    /// author string as card description.
    pub fn for_entry(entry: &PaperEntry, char_limit: usize) -> Self {
        Self {
            text: truncate_chars(entry.post_text(), char_limit),
            card: LinkCard {
                uri: entry.link.clone(),
                title: entry.title.clone(),
                description: entry.authors.clone(),
            },
        }
    }
}

/// Authenticated session on the posting service
#[derive(Clone, Serialize, Deserialize)]
pub struct Session {
    /// Account DID, the repo posts are written to
    pub did: String,

    pub handle: String,

    /// Bearer token for write calls
    pub access_jwt: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .field("access_jwt", &"[REDACTED]")
            .finish()
    }
}

/// Reference to a created post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRef {
    pub uri: String,
    pub cid: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::char_len;

    #[test]
    fn test_post_for_entry() {
        let mut entry = PaperEntry::new(
            "https://arxiv.org/abs/2410.01234",
            "Neural Codecs",
            "A. Author, B. Author",
            "Long abstract.",
        );
        entry.shortened_abstract = Some("Short summary.".to_string());

        let post = Post::for_entry(&entry, 300);
        assert_eq!(post.text, "Short summary.");
        assert_eq!(post.card.uri, "https://arxiv.org/abs/2410.01234");
        assert_eq!(post.card.title, "Neural Codecs");
        assert_eq!(post.card.description, "A. Author, B. Author");
    }

    #[test]
    fn test_post_body_is_truncated() {
        let mut entry = PaperEntry::new("https://arxiv.org/abs/1", "t", "a", "x");
        entry.shortened_abstract = Some("ü".repeat(450));

        let post = Post::for_entry(&entry, 300);
        assert_eq!(char_len(&post.text), 300);
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let session = Session {
            did: "did:plc:abc".to_string(),
            handle: "bot.bsky.social".to_string(),
            access_jwt: "secret-token".to_string(),
        };
        let debug = format!("{:?}", session);
        assert!(debug.contains("did:plc:abc"));
        assert!(!debug.contains("secret-token"));
    }
}
