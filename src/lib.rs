//! # arXiv Courier
//!
//! A bot that announces newly published arXiv papers on Bluesky.
//!
//! ## Architecture
//!
//! One run is a straight pipeline:
//!
//! - [`sources`]: fetch the subject-category RSS feed and keep the new announcements
//! - [`summarizer`]: condense every abstract with a generative-text service
//! - [`publisher`]: post each summary with a link card, spread across a time window
//! - [`pipeline`]: wire the three together from explicit configuration
//! - [`models`]: entries, posts and sessions passed between the stages
//! - [`config`]: layered configuration and environment credentials
//! - [`utils`]: HTTP client, fixed-backoff retry and text normalization

pub mod config;
pub mod models;
pub mod pipeline;
pub mod publisher;
pub mod sources;
pub mod summarizer;
pub mod utils;

// Re-export commonly used types
pub use models::PaperEntry;
pub use pipeline::{run, Outcome, PipelineError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
