use crate::api::{
    flatten_comments, RedditActionResponse, RedditApiClient, RedditCommentData, RedditListing,
    RedditListingChild, RedditPostData, RedditThing, RedditUserData,
};
use crate::auth::{Authenticator, RedditCredentials, RedditToken};
use crate::retry::{RetryConfig, RetryExecutor};
use crate::stream::RedditStream;
use bot_core::{
    Connector, CoreError, Event, EventKind, Identity, Platform, PostedReply, Publisher,
    RedditApiError, RedditConfig, ThreadReplies,
};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Deepest reply nesting fetched when checking a thread for our own replies.
const REPLY_TREE_DEPTH: &str = "10";
const REPLY_TREE_LIMIT: &str = "500";

/// Where the live streams of a session read from.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    pub subreddit: String,
    pub skip_existing: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            subreddit: "all".to_string(),
            skip_existing: false,
        }
    }
}

/// Authenticated Reddit session for one bot account.
#[derive(Debug)]
pub struct RedditClient {
    api: RedditApiClient,
    authenticator: Authenticator,
    token: RwLock<Option<RedditToken>>,
    retry: RetryExecutor,
    streams: StreamSettings,
}

impl RedditClient {
    pub fn new(credentials: RedditCredentials) -> Result<Self, CoreError> {
        let api = RedditApiClient::new(credentials.user_agent.clone())?;
        let authenticator = Authenticator::new(credentials, api.http_client().clone())?;

        Ok(Self {
            api,
            authenticator,
            token: RwLock::new(None),
            retry: RetryExecutor::new(RetryConfig::reddit()),
            streams: StreamSettings::default(),
        })
    }

    pub fn with_stream_settings(mut self, streams: StreamSettings) -> Self {
        self.streams = streams;
        self
    }

    /// Logs in and confirms the token belongs to the configured account.
    pub async fn authenticate(&self) -> Result<RedditUserData, CoreError> {
        let token = self.authenticator.request_token().await?;
        *self.token.write().await = Some(token);

        let me = self.me().await?;
        if !me.name.eq_ignore_ascii_case(self.authenticator.username()) {
            return Err(CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: format!(
                    "token belongs to /u/{}, expected /u/{}",
                    me.name,
                    self.authenticator.username()
                ),
            }));
        }

        info!("Authenticated as /u/{} ({} comment karma)", me.name, me.comment_karma);
        Ok(me)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .await
            .as_ref()
            .map_or(false, |token| !token.is_expired())
    }

    async fn access_token(&self) -> Result<String, CoreError> {
        {
            let token = self.token.read().await;
            if let Some(token) = token.as_ref().filter(|t| !t.needs_refresh()) {
                return Ok(token.access_token.clone());
            }
        }

        let mut token = self.token.write().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(current) = token.as_ref().filter(|t| !t.needs_refresh()) {
            return Ok(current.access_token.clone());
        }

        debug!("Access token missing or about to expire, refreshing");
        let fresh = self.authenticator.request_token().await?;
        let access_token = fresh.access_token.clone();
        *token = Some(fresh);
        Ok(access_token)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        operation_name: &str,
        endpoint: &str,
        query_params: &[(&str, &str)],
    ) -> Result<T, CoreError> {
        self.retry
            .execute(operation_name, || async move {
                let token = self.access_token().await?;
                self.api
                    .get_json::<T>(endpoint, &token, Some(query_params))
                    .await
            })
            .await
    }

    async fn post_action(
        &self,
        endpoint: &str,
        form: &[(&str, &str)],
    ) -> Result<reqwest::Response, CoreError> {
        let token = self.access_token().await?;
        self.api.post_form(endpoint, &token, form).await
    }

    pub async fn me(&self) -> Result<RedditUserData, CoreError> {
        self.get("me", "/api/v1/me", &[]).await
    }

    /// Newest comments of a subreddit, newest first.
    pub async fn new_comments(
        &self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<RedditCommentData>, CoreError> {
        let endpoint = format!("/r/{}/comments", subreddit);
        let limit = limit.to_string();
        let listing: RedditListing<RedditListingChild<RedditCommentData>> = self
            .get("new_comments", &endpoint, &[("limit", limit.as_str()), ("raw_json", "1")])
            .await?;

        Ok(listing.data.children.into_iter().map(|c| c.data).collect())
    }

    /// Newest submissions of a subreddit, newest first.
    pub async fn new_submissions(
        &self,
        subreddit: &str,
        limit: u32,
    ) -> Result<Vec<RedditPostData>, CoreError> {
        let endpoint = format!("/r/{}/new", subreddit);
        let limit = limit.to_string();
        let listing: RedditListing<RedditListingChild<RedditPostData>> = self
            .get("new_submissions", &endpoint, &[("limit", limit.as_str()), ("raw_json", "1")])
            .await?;

        Ok(listing.data.children.into_iter().map(|c| c.data).collect())
    }

    /// Every reply below `event`, flattened.
    pub async fn replies_below(&self, event: &Event) -> Result<Vec<RedditCommentData>, CoreError> {
        let endpoint = match event {
            Event::Comment(c) => format!("/comments/{}/_/{}", c.thread_id, c.id),
            Event::Submission(s) => format!("/comments/{}", s.id),
        };

        let listings: Vec<RedditListing<RedditThing>> = self
            .get(
                "replies_below",
                &endpoint,
                &[("depth", REPLY_TREE_DEPTH), ("limit", REPLY_TREE_LIMIT)],
            )
            .await?;

        let comments = listings
            .into_iter()
            .nth(1)
            .map(|listing| flatten_comments(listing.data.children))
            .unwrap_or_default();

        // The permalink view of a comment includes the comment itself
        Ok(match event {
            Event::Comment(c) => comments.into_iter().filter(|r| r.id != c.id).collect(),
            Event::Submission(_) => comments,
        })
    }
}

impl ThreadReplies for RedditClient {
    async fn reply_authors(&self, event: &Event) -> Result<Vec<String>, CoreError> {
        Ok(self
            .replies_below(event)
            .await?
            .into_iter()
            .map(|reply| reply.author)
            .collect())
    }
}

impl Publisher for RedditClient {
    async fn reply(&self, event: &Event, text: &str) -> Result<String, CoreError> {
        let thing_id = event.fullname();
        let response = self
            .post_action(
                "/api/comment",
                &[("api_type", "json"), ("thing_id", thing_id.as_str()), ("text", text)],
            )
            .await?;

        let body: RedditActionResponse = response.json().await.map_err(|e| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse comment response: {}", e),
            })
        })?;

        if let Some((code, message)) = body.json.first_error() {
            warn!("Reddit rejected reply to {}: {} {}", thing_id, code, message);
            return Err(CoreError::RedditApi(if code == "RATELIMIT" {
                RedditApiError::RateLimitExceeded {
                    retry_after: parse_ratelimit_message(&message),
                }
            } else {
                RedditApiError::ActionRejected { code, message }
            }));
        }

        body.json
            .data
            .and_then(|data| data.things.into_iter().next())
            .map(|thing| PostedReply::from(thing.data).fullname)
            .ok_or_else(|| {
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: "Comment response carried no thing".to_string(),
                })
            })
    }

    async fn upvote(&self, fullname: &str) -> Result<(), CoreError> {
        self.post_action("/api/vote", &[("id", fullname), ("dir", "1")])
            .await?;
        Ok(())
    }

    async fn retract(&self, fullname: &str) -> Result<(), CoreError> {
        self.post_action("/api/del", &[("id", fullname)]).await?;
        Ok(())
    }
}

impl Identity for RedditClient {
    fn username(&self) -> &str {
        self.authenticator.username()
    }

    async fn recent_replies(&self, limit: u32) -> Result<Vec<PostedReply>, CoreError> {
        let endpoint = format!("/user/{}/comments", self.username());
        let limit = limit.to_string();
        let listing: RedditListing<RedditListingChild<RedditCommentData>> = self
            .get(
                "recent_replies",
                &endpoint,
                &[("sort", "new"), ("limit", limit.as_str())],
            )
            .await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|c| PostedReply::from(c.data))
            .collect())
    }
}

impl Platform for RedditClient {
    type Stream<'a> = RedditStream<'a>;

    fn stream(&self, kind: EventKind) -> RedditStream<'_> {
        RedditStream::new(
            self,
            kind,
            &self.streams.subreddit,
            self.streams.skip_existing,
        )
    }
}

/// Opens a freshly authenticated [`RedditClient`] on every connect.
#[derive(Debug, Clone)]
pub struct RedditConnector {
    credentials: RedditCredentials,
    streams: StreamSettings,
}

impl RedditConnector {
    pub fn new(credentials: RedditCredentials, streams: StreamSettings) -> Self {
        Self {
            credentials,
            streams,
        }
    }

    pub fn from_config(config: &RedditConfig) -> Result<Self, CoreError> {
        Ok(Self::new(
            RedditCredentials::from_config(config)?,
            StreamSettings {
                subreddit: config.subreddit.clone(),
                skip_existing: config.skip_existing,
            },
        ))
    }
}

impl Connector for RedditConnector {
    type Platform = RedditClient;

    async fn connect(&self) -> Result<RedditClient, CoreError> {
        let client = RedditClient::new(self.credentials.clone())?
            .with_stream_settings(self.streams.clone());
        client.authenticate().await?;
        Ok(client)
    }
}

/// Turns "you are doing that too much. try again in 9 minutes." into seconds.
pub fn parse_ratelimit_message(message: &str) -> u64 {
    let words: Vec<&str> = message.split_whitespace().collect();
    words
        .windows(2)
        .find_map(|pair| {
            let amount = pair[0].parse::<u64>().ok()?;
            let unit = pair[1].trim_end_matches('.');
            match unit {
                u if u.starts_with("second") => Some(amount),
                u if u.starts_with("minute") => Some(amount * 60),
                _ => None,
            }
        })
        .unwrap_or(60)
}
