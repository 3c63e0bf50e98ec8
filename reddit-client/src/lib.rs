//! Reddit access for the bot: script-app login, rate-limited JSON calls,
//! and polling streams of new comments and submissions.

pub mod api;
pub mod auth;
pub mod client;
pub mod rate_limiter;
pub mod retry;
pub mod stream;

pub use api::{RedditApiClient, RedditCommentData, RedditPostData, RedditUserData};
pub use auth::{Authenticator, RedditCredentials, RedditToken};
pub use client::{RedditClient, RedditConnector, StreamSettings};
pub use rate_limiter::{RateLimitConfig, RateLimiter};
pub use retry::{RetryConfig, RetryExecutor};
pub use stream::RedditStream;
