//! OpenAI chat-completions adapter for the [`ModelClient`] port.
//!
//! [`ModelClient`]: crate::domain::ports::ModelClient

pub mod client;
pub mod rate_limiter;
pub mod types;

pub use client::{OpenAiClient, OpenAiClientConfig};
pub use rate_limiter::TokenBucketRateLimiter;
