use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use bot_core::{CommentEvent, CoreError, PostedReply, RedditApiError, SubmissionEvent};
use reqwest::{Client, Method, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";
const REDDIT_SHORTLINK_BASE: &str = "https://redd.it";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<T>,
    pub after: Option<String>,
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

/// Heterogeneous listing entry as it appears in comment trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum RedditThing {
    #[serde(rename = "t1")]
    Comment(RedditCommentData),
    #[serde(rename = "t3")]
    Link(RedditPostData),
    #[serde(rename = "more")]
    More(serde_json::Value),
}

/// `replies` is an empty string on leaf comments and a listing otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RedditReplies {
    Listing(Box<RedditListing<RedditThing>>),
    Empty(String),
}

impl Default for RedditReplies {
    fn default() -> Self {
        RedditReplies::Empty(String::new())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subreddit: String,
    /// Fullname of the submission, `t3_…`
    #[serde(default)]
    pub link_id: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub replies: RedditReplies,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: u32,
    #[serde(default)]
    pub locked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditUserData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub comment_karma: i64,
}

/// Envelope of `api_type=json` write endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct RedditActionResponse {
    pub json: RedditActionBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditActionBody {
    #[serde(default)]
    pub errors: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    pub data: Option<RedditActionData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditActionData {
    #[serde(default)]
    pub things: Vec<RedditListingChild<RedditCommentData>>,
}

impl RedditActionBody {
    /// First error Reddit reported, as `(code, message)`.
    pub fn first_error(&self) -> Option<(String, String)> {
        self.errors.first().map(|entry| {
            let field = |i: usize| {
                entry
                    .get(i)
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            (field(0), field(1))
        })
    }
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    user_agent: String,
    base_url: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RateLimitConfig::reddit_oauth())),
            user_agent,
            base_url: REDDIT_API_BASE.to_string(),
        })
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, CoreError> {
        Url::parse(&self.base_url)
            .and_then(|base| base.join(endpoint))
            .map_err(|e| CoreError::InvalidInput {
                message: format!("Invalid endpoint {}: {}", endpoint, e),
            })
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
        form: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let url = self.endpoint_url(endpoint)?;

        let permit = self.rate_limiter.acquire_permit().await;
        debug!(
            "Acquired rate limit permit for {} {} after {:?}",
            method, endpoint, permit.queue_wait_time
        );

        let mut request_builder = self
            .http_client
            .request(method.clone(), url)
            .bearer_auth(access_token);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }
        if let Some(fields) = form {
            request_builder = request_builder.form(fields);
        }

        debug!("Making Reddit API request: {} {}", method, endpoint);
        let response = match request_builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    return Err(CoreError::RedditApi(RedditApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        self.rate_limiter.observe_headers(response.headers()).await;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        let error = match status.as_u16() {
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            401 => RedditApiError::InvalidToken,
            403 => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            },
            404 => RedditApiError::NotFound {
                resource: endpoint.to_string(),
            },
            code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
            code => RedditApiError::InvalidResponse {
                details: format!("Unexpected status {} for {}", code, endpoint),
            },
        };

        Err(CoreError::RedditApi(error))
    }

    pub async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        access_token: &str,
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<T, CoreError> {
        let response = self
            .make_request(Method::GET, endpoint, access_token, query_params, None)
            .await?;

        response.json().await.map_err(|e| {
            error!("Failed to parse response from {}: {}", endpoint, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse response from {}", endpoint),
            })
        })
    }

    pub async fn post_form(
        &self,
        endpoint: &str,
        access_token: &str,
        form: &[(&str, &str)],
    ) -> Result<Response, CoreError> {
        self.make_request(Method::POST, endpoint, access_token, None, Some(form))
            .await
    }
}

/// Strips the `t1_`/`t3_` type prefix off a fullname.
pub fn strip_kind_prefix(fullname: &str) -> &str {
    match fullname.split_once('_') {
        Some((kind, id)) if kind.len() == 2 && kind.starts_with('t') => id,
        _ => fullname,
    }
}

/// Flattens a comment tree, depth first, skipping "load more" stubs.
pub fn flatten_comments(things: Vec<RedditThing>) -> Vec<RedditCommentData> {
    let mut flattened = Vec::new();
    let mut stack: Vec<RedditThing> = things.into_iter().rev().collect();

    while let Some(thing) = stack.pop() {
        if let RedditThing::Comment(mut comment) = thing {
            let replies = std::mem::take(&mut comment.replies);
            if let RedditReplies::Listing(listing) = replies {
                stack.extend(listing.data.children.into_iter().rev());
            }
            flattened.push(comment);
        }
    }

    flattened
}

impl From<RedditCommentData> for CommentEvent {
    fn from(comment: RedditCommentData) -> Self {
        Self {
            thread_id: strip_kind_prefix(&comment.link_id).to_string(),
            id: comment.id,
            author: comment.author,
            subreddit: comment.subreddit,
            body: comment.body,
            permalink: comment.permalink,
        }
    }
}

impl From<RedditPostData> for SubmissionEvent {
    fn from(post: RedditPostData) -> Self {
        Self {
            permalink: format!("{}/{}", REDDIT_SHORTLINK_BASE, post.id),
            id: post.id,
            author: post.author,
            subreddit: post.subreddit,
            title: post.title,
            selftext: post.selftext,
        }
    }
}

impl From<RedditCommentData> for PostedReply {
    fn from(comment: RedditCommentData) -> Self {
        Self {
            fullname: if comment.name.is_empty() {
                format!("t1_{}", comment.id)
            } else {
                comment.name
            },
            permalink: comment.permalink,
            score: comment.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMENT_TREE: &str = r#"[
        {"kind": "Listing", "data": {"after": null, "before": null, "children": [
            {"kind": "t3", "data": {"id": "abc", "title": "Sushi grade?", "author": "op"}}
        ]}},
        {"kind": "Listing", "data": {"after": null, "before": null, "children": [
            {"kind": "t1", "data": {
                "id": "c1", "author": "alice", "body": "top", "link_id": "t3_abc",
                "replies": {"kind": "Listing", "data": {"after": null, "before": null, "children": [
                    {"kind": "t1", "data": {"id": "c2", "author": "sushi-grade-bot", "body": "facts", "link_id": "t3_abc", "replies": ""}},
                    {"kind": "more", "data": {"count": 3, "children": ["c9"]}}
                ]}}
            }},
            {"kind": "t1", "data": {"id": "c3", "author": "bob", "body": "other", "link_id": "t3_abc", "replies": ""}}
        ]}}
    ]"#;

    #[test]
    fn test_api_client_creation() {
        let client = RedditApiClient::new("test-user-agent/1.0".to_string()).unwrap();
        assert_eq!(client.user_agent(), "test-user-agent/1.0");
    }

    #[test]
    fn test_endpoint_url() {
        let client = RedditApiClient::new("test-user-agent/1.0".to_string()).unwrap();

        let url = tokio_test::assert_ok!(client.endpoint_url("/r/all/comments"));
        assert_eq!(url.as_str(), "https://oauth.reddit.com/r/all/comments");
    }

    #[test]
    fn test_comment_tree_parsing_and_flattening() {
        let listings: Vec<RedditListing<RedditThing>> = serde_json::from_str(COMMENT_TREE).unwrap();
        assert_eq!(listings.len(), 2);

        let comments = flatten_comments(listings[1].data.children.clone());
        let ids: Vec<&str> = comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
        assert_eq!(comments[1].author, "sushi-grade-bot");
    }

    #[test]
    fn test_strip_kind_prefix() {
        assert_eq!(strip_kind_prefix("t3_abc"), "abc");
        assert_eq!(strip_kind_prefix("t1_c_1"), "c_1");
        assert_eq!(strip_kind_prefix("abc"), "abc");
    }

    #[test]
    fn test_comment_event_conversion() {
        let data: RedditCommentData = serde_json::from_str(
            r#"{"id": "c1", "name": "t1_c1", "author": "alice", "subreddit": "sushi",
                "body": "sashimi grade salmon?", "link_id": "t3_abc",
                "permalink": "/r/sushi/comments/abc/x/c1/", "score": 4}"#,
        )
        .unwrap();

        let event: CommentEvent = data.into();
        assert_eq!(event.id, "c1");
        assert_eq!(event.thread_id, "abc");
        assert_eq!(event.subreddit, "sushi");
    }

    #[test]
    fn test_submission_event_conversion() {
        let data: RedditPostData = serde_json::from_str(
            r#"{"id": "abc", "title": "Costco salmon for sushi", "selftext": "",
                "author": "op", "subreddit": "Cooking"}"#,
        )
        .unwrap();

        let event: SubmissionEvent = data.into();
        assert_eq!(event.permalink, "https://redd.it/abc");
        assert_eq!(event.title, "Costco salmon for sushi");
    }

    #[test]
    fn test_posted_reply_conversion_builds_fullname() {
        let data: RedditCommentData =
            serde_json::from_str(r#"{"id": "c7", "score": -3, "permalink": "/r/x/c7/"}"#).unwrap();
        let reply: PostedReply = data.into();
        assert_eq!(reply.fullname, "t1_c7");
        assert_eq!(reply.score, -3);
    }

    #[test]
    fn test_action_response_errors() {
        let body: RedditActionResponse = serde_json::from_str(
            r#"{"json": {"errors": [["RATELIMIT", "you are doing that too much. try again in 9 minutes.", "ratelimit"]]}}"#,
        )
        .unwrap();
        let (code, message) = body.json.first_error().unwrap();
        assert_eq!(code, "RATELIMIT");
        assert!(message.contains("9 minutes"));

        let ok: RedditActionResponse = serde_json::from_str(
            r#"{"json": {"errors": [], "data": {"things": [{"kind": "t1", "data": {"id": "new1", "name": "t1_new1"}}]}}}"#,
        )
        .unwrap();
        assert!(ok.json.first_error().is_none());
        assert_eq!(ok.json.data.unwrap().things[0].data.name, "t1_new1");
    }
}
