//! Abstract summarization through a generative-text service.
//!
//! All entries go to the service in one prompt; the reply must hold exactly
//! one summary per line, in entry order. Summaries over the character budget
//! are sent back once, in the same conversation, for revision, and whatever
//! is still too long afterwards is hard-truncated.
//!
//! Pairing replies with entries relies on line counts, so a reply with more
//! or fewer non-blank lines than requested fails with
//! [`SummarizeError::CountMismatch`] instead of silently shifting summaries
//! onto the wrong papers.

mod gemini;

pub use gemini::GeminiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::PaperEntry;
use crate::sources::SourceError;
use crate::utils::{char_len, nonblank_lines, truncate_chars};

const BATCH_INSTRUCTION: &str = "Below are the titles of several academic papers, each followed by its \
abstract. Summarize every paper. Focus each summary on what the title does not already say. Respond \
with exactly one summary per line, in the same order as the papers. Include methods and results. \
Write in a curt, abrupt style without boilerplate.\n\n";

const REVISION_INSTRUCTION: &str = "Revise the following summaries to be shorter. Keep exactly \
one summary per line, in the same order:\n\n";

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One message of a conversation with the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// A generative-text service that answers the last user turn of a conversation.
#[async_trait]
pub trait TextGenerator: Send + Sync + std::fmt::Debug {
    /// Identifier for logs (e.g., "gemini")
    fn id(&self) -> &str;

    /// Generate the reply to `turns`, whose last element is a user turn
    async fn generate(&self, turns: &[ChatTurn]) -> Result<String, SourceError>;
}

/// Conversation state kept across the batch and revision requests
#[derive(Debug)]
pub struct Conversation<'a> {
    generator: &'a dyn TextGenerator,
    turns: Vec<ChatTurn>,
}

impl<'a> Conversation<'a> {
    pub fn new(generator: &'a dyn TextGenerator) -> Self {
        Self {
            generator,
            turns: Vec::new(),
        }
    }

    /// Send a user message and record the reply in the history
    pub async fn send(&mut self, message: impl Into<String>) -> Result<String, SourceError> {
        self.turns.push(ChatTurn::user(message));
        let reply = self.generator.generate(&self.turns).await?;
        self.turns.push(ChatTurn::model(reply.clone()));
        Ok(reply)
    }
}

/// Which request produced a malformed reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Batch,
    Revision,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Batch => write!(f, "summary batch"),
            Stage::Revision => write!(f, "revision"),
        }
    }
}

/// Summarization errors
#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("Summarization service failed: {0}")]
    Service(#[from] SourceError),

    #[error("{stage} reply has {received} non-blank lines, expected {expected}")]
    CountMismatch {
        stage: Stage,
        expected: usize,
        received: usize,
    },
}

/// Produces length-bounded summaries for a batch of entries
#[derive(Debug, Clone)]
pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
    char_budget: usize,
}

impl Summarizer {
    /// Create a summarizer over `generator`, bounding summaries to `char_budget` characters
    pub fn new(generator: Arc<dyn TextGenerator>, char_budget: usize) -> Self {
        Self {
            generator,
            char_budget,
        }
    }

    /// Set `shortened_abstract` on every entry.
    ///
    /// An empty slice is a no-op. On error no entry is modified.
    pub async fn shorten(&self, entries: &mut [PaperEntry]) -> Result<(), SummarizeError> {
        if entries.is_empty() {
            return Ok(());
        }

        tracing::info!(
            count = entries.len(),
            service = self.generator.id(),
            "Summarizing abstracts"
        );

        let mut chat = Conversation::new(self.generator.as_ref());
        let reply = chat.send(build_batch_prompt(entries)).await?;
        let mut summaries = nonblank_lines(&reply);
        check_count(Stage::Batch, entries.len(), summaries.len())?;

        let too_long: Vec<(usize, String)> = summaries
            .iter()
            .enumerate()
            .filter(|(_, summary)| char_len(summary) > self.char_budget)
            .map(|(idx, summary)| (idx, summary.clone()))
            .collect();

        if !too_long.is_empty() {
            tracing::info!(
                count = too_long.len(),
                budget = self.char_budget,
                "Requesting revision of over-long summaries"
            );

            let originals: Vec<&str> = too_long.iter().map(|(_, s)| s.as_str()).collect();
            let reply = chat.send(build_revision_prompt(&originals)).await?;
            let revisions = nonblank_lines(&reply);
            check_count(Stage::Revision, too_long.len(), revisions.len())?;

            for ((idx, _), revision) in too_long.iter().zip(revisions) {
                if char_len(&revision) > self.char_budget {
                    tracing::warn!(
                        index = idx,
                        length = char_len(&revision),
                        "Revised summary still too long, truncating"
                    );
                }
                summaries[*idx] = truncate_chars(&revision, self.char_budget);
            }
        }

        for (entry, summary) in entries.iter_mut().zip(summaries) {
            entry.shortened_abstract = Some(summary);
        }

        Ok(())
    }
}

fn check_count(stage: Stage, expected: usize, received: usize) -> Result<(), SummarizeError> {
    if expected != received {
        tracing::error!(%stage, expected, received, "Summary count does not match request");
        return Err(SummarizeError::CountMismatch {
            stage,
            expected,
            received,
        });
    }
    Ok(())
}

/// Instruction followed by one `title\nabstract\n` block per entry
pub fn build_batch_prompt(entries: &[PaperEntry]) -> String {
    let papers = entries
        .iter()
        .map(|entry| format!("{}\n{}\n", entry.title, entry.r#abstract))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}{}", BATCH_INSTRUCTION, papers)
}

/// Revision instruction followed by the summaries, separated by blank lines
pub fn build_revision_prompt(summaries: &[&str]) -> String {
    format!("{}{}", REVISION_INSTRUCTION, summaries.join("\n\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::make_entry;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies with canned responses and records every request
    #[derive(Debug, Default)]
    struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, SourceError>>>,
        requests: Mutex<Vec<Vec<ChatTurn>>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<&str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: SourceError) -> Self {
            Self {
                replies: Mutex::new(VecDeque::from([Err(error)])),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<Vec<ChatTurn>> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        fn id(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, turns: &[ChatTurn]) -> Result<String, SourceError> {
            self.requests.lock().unwrap().push(turns.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(SourceError::Other("no scripted reply left".to_string())))
        }
    }

    fn entries(n: usize) -> Vec<PaperEntry> {
        (1..=n)
            .map(|i| make_entry(&format!("2410.0000{}", i), &format!("Paper {}", i)))
            .collect()
    }

    #[tokio::test]
    async fn test_summaries_are_aligned_with_entries() {
        let generator = Arc::new(ScriptedGenerator::new(vec!["First summary.\n\nSecond summary.\n"]));
        let summarizer = Summarizer::new(generator.clone(), 300);
        let mut entries = entries(2);

        summarizer.shorten(&mut entries).await.unwrap();

        assert_eq!(entries[0].shortened_abstract.as_deref(), Some("First summary."));
        assert_eq!(entries[1].shortened_abstract.as_deref(), Some("Second summary."));

        let requests = generator.requests();
        assert_eq!(requests.len(), 1);
        let prompt = &requests[0][0].text;
        assert!(prompt.starts_with(BATCH_INSTRUCTION));
        assert!(prompt.contains("Paper 1\nAbstract of Paper 1.\n\nPaper 2\nAbstract of Paper 2.\n"));
    }

    #[tokio::test]
    async fn test_over_long_summaries_are_revised_and_truncated() {
        let long_a = "a".repeat(350);
        let long_c = "c".repeat(320);
        let still_long = "z".repeat(400);
        let batch_reply = format!("{}\nshort b\n{}\n", long_a, long_c);
        let revision_reply = format!("revised a\n\n{}\n", still_long);

        let generator = Arc::new(ScriptedGenerator::new(vec![batch_reply.as_str(), revision_reply.as_str()]));
        let summarizer = Summarizer::new(generator.clone(), 300);
        let mut entries = entries(3);

        summarizer.shorten(&mut entries).await.unwrap();

        assert_eq!(entries[0].shortened_abstract.as_deref(), Some("revised a"));
        assert_eq!(entries[1].shortened_abstract.as_deref(), Some("short b"));
        assert_eq!(
            entries[2].shortened_abstract.as_deref(),
            Some("z".repeat(300).as_str())
        );

        let requests = generator.requests();
        assert_eq!(requests.len(), 2);
        // Revision continues the same conversation
        let revision = &requests[1];
        assert_eq!(revision.len(), 3);
        assert_eq!(revision[1], ChatTurn::model(batch_reply.clone()));
        assert_eq!(
            revision[2].text,
            format!("{}{}\n\n{}", REVISION_INSTRUCTION, long_a, long_c)
        );
        assert!(!revision[2].text.contains("short b"));
    }

    #[tokio::test]
    async fn test_no_summary_exceeds_budget() {
        let batch_reply = format!("{}\n{}\n", "x".repeat(1000), "y".repeat(301));
        let revision_reply = format!("{}\n{}\n", "p".repeat(999), "q".repeat(300));
        let generator = Arc::new(ScriptedGenerator::new(vec![batch_reply.as_str(), revision_reply.as_str()]));
        let summarizer = Summarizer::new(generator, 300);
        let mut entries = entries(2);

        summarizer.shorten(&mut entries).await.unwrap();

        for entry in &entries {
            assert!(char_len(entry.shortened_abstract.as_deref().unwrap()) <= 300);
        }
    }

    #[tokio::test]
    async fn test_too_many_lines_is_a_count_mismatch() {
        let generator = Arc::new(ScriptedGenerator::new(vec!["one\ntwo\nthree\n"]));
        let summarizer = Summarizer::new(generator, 300);
        let mut entries = entries(2);

        let result = summarizer.shorten(&mut entries).await;
        assert!(matches!(
            result,
            Err(SummarizeError::CountMismatch {
                stage: Stage::Batch,
                expected: 2,
                received: 3
            })
        ));
        assert!(entries.iter().all(|e| e.shortened_abstract.is_none()));
    }

    #[tokio::test]
    async fn test_blank_reply_is_a_count_mismatch() {
        let generator = Arc::new(ScriptedGenerator::new(vec!["\n   \n\n"]));
        let summarizer = Summarizer::new(generator, 300);
        let mut entries = entries(2);

        let result = summarizer.shorten(&mut entries).await;
        assert!(matches!(
            result,
            Err(SummarizeError::CountMismatch {
                expected: 2,
                received: 0,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_revision_count_mismatch() {
        let batch_reply = format!("{}\nfine\n", "a".repeat(301));
        let generator = Arc::new(ScriptedGenerator::new(vec![batch_reply.as_str(), "r1\nr2\n"]));
        let summarizer = Summarizer::new(generator, 300);
        let mut entries = entries(2);

        let result = summarizer.shorten(&mut entries).await;
        assert!(matches!(
            result,
            Err(SummarizeError::CountMismatch {
                stage: Stage::Revision,
                expected: 1,
                received: 2
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let generator = Arc::new(ScriptedGenerator::new(vec![]));
        let summarizer = Summarizer::new(generator.clone(), 300);

        summarizer.shorten(&mut []).await.unwrap();
        assert!(generator.requests().is_empty());
    }

    #[tokio::test]
    async fn test_service_errors_propagate() {
        let generator = Arc::new(ScriptedGenerator::failing(SourceError::Api(
            "quota exceeded".to_string(),
        )));
        let summarizer = Summarizer::new(generator, 300);
        let mut entries = entries(1);

        let result = summarizer.shorten(&mut entries).await;
        assert!(matches!(
            result,
            Err(SummarizeError::Service(SourceError::Api(_)))
        ));
    }

    #[test]
    fn test_error_message() {
        let err = SummarizeError::CountMismatch {
            stage: Stage::Revision,
            expected: 3,
            received: 1,
        };
        assert_eq!(
            err.to_string(),
            "revision reply has 1 non-blank lines, expected 3"
        );
    }
}
