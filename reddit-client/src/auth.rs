use bot_core::{ConfigError, CoreError, RedditApiError, RedditConfig};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError,
    ResourceOwnerPassword, ResourceOwnerUsername, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tracing::{debug, error, info};

const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Refresh this long before Reddit would start rejecting the token.
pub const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Script-app credentials for the bot account.
#[derive(Debug, Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
}

impl RedditCredentials {
    pub fn new(
        client_id: String,
        client_secret: String,
        username: String,
        password: String,
        user_agent: String,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            username,
            password,
            user_agent,
        }
    }

    pub fn from_config(config: &RedditConfig) -> Result<Self, ConfigError> {
        let required = |field: &str, value: &Option<String>| {
            value
                .clone()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingField {
                    field: format!("reddit.{}", field),
                })
        };

        Ok(Self::new(
            required("client_id", &config.client_id)?,
            required("client_secret", &config.client_secret)?,
            required("username", &config.username)?,
            required("password", &config.password)?,
            config.user_agent(),
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: SystemTime,
    pub scope: Vec<String>,
}

impl RedditToken {
    pub fn is_expired(&self) -> bool {
        SystemTime::now() >= self.expires_at
    }

    pub fn needs_refresh(&self) -> bool {
        SystemTime::now() + TOKEN_REFRESH_MARGIN >= self.expires_at
    }
}

/// Performs the OAuth2 password grant Reddit uses for script apps.
#[derive(Debug)]
pub struct Authenticator {
    oauth_client: BasicClient,
    http_client: reqwest::Client,
    credentials: RedditCredentials,
}

impl Authenticator {
    pub fn new(
        credentials: RedditCredentials,
        http_client: reqwest::Client,
    ) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| CoreError::Internal {
            message: format!("Invalid auth URL: {e}"),
        })?;
        let token_url =
            TokenUrl::new(REDDIT_TOKEN_URL.to_string()).map_err(|e| CoreError::Internal {
                message: format!("Invalid token URL: {e}"),
            })?;

        let oauth_client = BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(credentials.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        Ok(Self {
            oauth_client,
            http_client,
            credentials,
        })
    }

    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    pub async fn request_token(&self) -> Result<RedditToken, CoreError> {
        info!("Requesting Reddit access token for /u/{}", self.credentials.username);

        let http_client = self.http_client.clone();
        let response = self
            .oauth_client
            .exchange_password(
                &ResourceOwnerUsername::new(self.credentials.username.clone()),
                &ResourceOwnerPassword::new(self.credentials.password.clone()),
            )
            .request_async(|request| send_token_request(http_client, request))
            .await
            .map_err(|e| match e {
                RequestTokenError::Request(network_error) => CoreError::Network(network_error),
                RequestTokenError::ServerResponse(response) => {
                    error!("Reddit refused the password grant: {}", response);
                    CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                        reason: response.to_string(),
                    })
                }
                other => CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                    reason: other.to_string(),
                }),
            })?;

        let expires_in = response.expires_in().unwrap_or(Duration::from_secs(3600));
        let scope = response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default();

        debug!("Access token valid for {:?}", expires_in);
        Ok(RedditToken {
            access_token: response.access_token().secret().clone(),
            expires_at: SystemTime::now() + expires_in,
            scope,
        })
    }
}

// Runs the token exchange through our own client so Reddit sees the bot's
// User-Agent on the login request too.
async fn send_token_request(
    http_client: reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = http_client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;

    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}
