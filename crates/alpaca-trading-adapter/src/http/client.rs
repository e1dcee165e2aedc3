/*
[INPUT]:  HTTP configuration (base URL, timeouts, retry policy, credentials)
[OUTPUT]: Configured reqwest client ready for API calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::fmt;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::http::{AlpacaError, Result};
use crate::types::Environment;

/// Base URLs for the trading API
const TRADING_PAPER_URL: &str = "https://paper-api.alpaca.markets";
const TRADING_LIVE_URL: &str = "https://api.alpaca.markets";
const API_VERSION: &str = "v2";
const CLIENT_USER_AGENT: &str = concat!("alpaca-trading-adapter/", env!("CARGO_PKG_VERSION"));

const ENV_KEY_ID: &str = "APCA_API_KEY_ID";
const ENV_SECRET_KEY: &str = "APCA_API_SECRET_KEY";

/// Retry behaviour for throttled or gateway-timeout responses
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub wait: Duration,
    pub retry_codes: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            wait: Duration::from_secs(3),
            retry_codes: vec![429, 504],
        }
    }
}

impl RetryPolicy {
    /// Never retry
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn should_retry(&self, status: u16, attempt: u32) -> bool {
        attempt < self.max_retries && self.retry_codes.contains(&status)
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

/// API key pair shared by the REST client and the trading stream
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let secret_key = secret_key.into();
        if api_key.trim().is_empty() {
            return Err(AlpacaError::Credentials("api key must not be empty".to_string()));
        }
        if secret_key.trim().is_empty() {
            return Err(AlpacaError::Credentials(
                "secret key must not be empty".to_string(),
            ));
        }
        Ok(Self {
            api_key,
            secret_key,
        })
    }

    /// Read `APCA_API_KEY_ID` / `APCA_API_SECRET_KEY`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(ENV_KEY_ID)
            .map_err(|_| AlpacaError::Credentials(format!("{ENV_KEY_ID} is not set")))?;
        let secret_key = std::env::var(ENV_SECRET_KEY)
            .map_err(|_| AlpacaError::Credentials(format!("{ENV_SECRET_KEY} is not set")))?;
        Self::new(api_key, secret_key)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// How requests are authorized
#[derive(Debug, Clone)]
pub enum Authorization {
    ApiKey(Credentials),
    OAuth { token: String },
}

impl Authorization {
    pub fn oauth(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(AlpacaError::Credentials(
                "oauth token must not be empty".to_string(),
            ));
        }
        Ok(Authorization::OAuth { token })
    }

    fn apply(&self, builder: RequestBuilder) -> RequestBuilder {
        match self {
            Authorization::ApiKey(credentials) => builder
                .header("APCA-API-KEY-ID", &credentials.api_key)
                .header("APCA-API-SECRET-KEY", &credentials.secret_key),
            Authorization::OAuth { token } => {
                builder.header(AUTHORIZATION, format!("Bearer {token}"))
            }
        }
    }
}

impl From<Credentials> for Authorization {
    fn from(credentials: Credentials) -> Self {
        Authorization::ApiKey(credentials)
    }
}

/// Main HTTP client for the trading API
#[derive(Debug)]
pub struct AlpacaClient {
    http_client: Client,
    base_url: Url,
    authorization: Authorization,
    retry: RetryPolicy,
}

impl AlpacaClient {
    /// Create a new client with default configuration
    pub fn new(authorization: impl Into<Authorization>, environment: Environment) -> Result<Self> {
        Self::with_config(authorization, environment, ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(
        authorization: impl Into<Authorization>,
        environment: Environment,
        config: ClientConfig,
    ) -> Result<Self> {
        let base_url = match environment {
            Environment::Paper => TRADING_PAPER_URL,
            Environment::Live => TRADING_LIVE_URL,
        };
        Self::with_config_and_base_url(authorization, config, base_url)
    }

    /// Create a client against an explicit base URL
    pub fn with_config_and_base_url(
        authorization: impl Into<Authorization>,
        config: ClientConfig,
        base_url: &str,
    ) -> Result<Self> {
        // Redirects are never followed; a misconfigured http:// base URL fails fast.
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            http_client,
            base_url: normalize_base_url(base_url)?,
            authorization: authorization.into(),
            retry: config.retry,
        })
    }

    /// Base URL requests are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build full URL for a versioned endpoint
    fn endpoint_url(&self, endpoint: &str) -> std::result::Result<Url, url::ParseError> {
        let relative = format!("{API_VERSION}/{}", endpoint.trim_start_matches('/'));
        self.base_url.join(&relative)
    }

    /// Build an authorized request builder for a versioned endpoint
    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.endpoint_url(endpoint)?;
        let builder = self
            .http_client
            .request(method, url)
            .header(USER_AGENT, CLIENT_USER_AGENT);
        Ok(self.authorization.apply(builder))
    }

    /// Send and decode a JSON response body
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let body = self.send_with_retry(builder).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Send a request whose success response carries no body
    pub(crate) async fn send_empty(&self, builder: RequestBuilder) -> Result<()> {
        self.send_with_retry(builder).await.map(|_| ())
    }

    async fn send_with_retry(&self, builder: RequestBuilder) -> Result<String> {
        let mut attempt: u32 = 0;
        loop {
            let request = builder.try_clone().ok_or_else(|| {
                AlpacaError::InvalidRequest("request body cannot be retried".to_string())
            })?;
            let response = request.send().await?;
            let status = response.status();
            debug!(status = status.as_u16(), attempt, url = %response.url(), "http response");

            if status.is_success() {
                return Ok(response.text().await?);
            }

            if self.retry.should_retry(status.as_u16(), attempt) {
                attempt += 1;
                warn!(
                    status = status.as_u16(),
                    attempt,
                    max_retries = self.retry.max_retries,
                    wait_ms = self.retry.wait.as_millis() as u64,
                    "retrying request"
                );
                tokio::time::sleep(self.retry.wait).await;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(AlpacaError::api_error(status, &body));
        }
    }
}

fn normalize_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let url = Url::parse(&format!("{trimmed}/"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AlpacaError::Config(format!(
            "unsupported base url scheme: {}",
            url.scheme()
        )));
    }
    Ok(url)
}
