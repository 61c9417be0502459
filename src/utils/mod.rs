//! Utility modules supporting the courier pipeline.
//!
//! - [`HttpClient`]: shared reqwest client built from the `[http]` config section
//! - [`RetryPolicy`] / [`with_retry`]: fixed-backoff retries for feed fetches and posts
//! - [`latex_to_text`] / [`html_to_text`]: normalize feed fields to plain text
//! - [`truncate_chars`]: hard length cut used to enforce post size limits
//!
//! # Retry with fixed backoff
//!
//! ```rust,no_run
//! use arxiv_courier::utils::{with_retry, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn fetch_data() -> Result<String, String> { Ok("data".to_string()) }
//! # #[tokio::main]
//! # async fn main() -> Result<(), String> {
//! let policy = RetryPolicy::new(5, Duration::from_secs(60));
//! let data = with_retry(policy, "fetch data", || fetch_data()).await?;
//! # Ok(())
//! # }
//! ```

mod http;
mod retry;
pub mod text;

pub use http::{default_user_agent, HttpClient};
pub(crate) use http::error_for_status;
pub use retry::{with_retry, RetryPolicy};
pub use text::{char_len, html_to_text, latex_to_text, nonblank_lines, truncate_chars};
