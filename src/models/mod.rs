//! Core data models: feed entries and the posts built from them.

mod entry;
mod post;

pub use entry::{AnnounceType, PaperEntry};
pub use post::{LinkCard, Post, PostRef, Session};
