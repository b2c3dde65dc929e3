use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::*;
use crate::{http, rest, Result};

/// The base URL of the Courier API.
pub const DEFAULT_BASE_URL: &str = "https://api.courier.com";

/// The environment variable holding the Courier auth token.
pub const AUTH_TOKEN_ENV: &str = "COURIER_AUTH_TOKEN";

/// The environment variable overriding the Courier API base URL.
pub const BASE_URL_ENV: &str = "COURIER_BASE_URL";

/// Client options for initialising a Courier client.
#[derive(Clone)]
pub struct ClientOptions {
    /// The Courier auth token, sent as a bearer token.
    pub(crate) auth_token: Option<String>,

    /// The base URL that request paths are resolved against. Defaults to
    /// https://api.courier.com.
    pub(crate) base_url: String,

    /// How long to wait for a TCP connection to be established. Defaults to
    /// 4s.
    pub(crate) http_open_timeout: Duration,

    /// How long to wait for a HTTP request to be sent and a response to be
    /// received. Defaults to 10s.
    pub(crate) http_request_timeout: Duration,

    /// The User-Agent header sent with every request.
    pub(crate) user_agent: String,

    error: Option<ErrorInfo>,
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("http_open_timeout", &self.http_open_timeout)
            .field("http_request_timeout", &self.http_request_timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientOptions {
    /// Returns ClientOptions with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns ClientOptions initialised from the COURIER_AUTH_TOKEN and
    /// COURIER_BASE_URL environment variables.
    pub fn from_env() -> Self {
        let mut options = Self::new();

        if let Ok(token) = env::var(AUTH_TOKEN_ENV) {
            options = options.auth_token(token);
        }

        if let Ok(base_url) = env::var(BASE_URL_ENV) {
            options = options.base_url(base_url);
        }

        options
    }

    /// Sets the auth token.
    ///
    /// # Example
    ///
    /// ```
    /// # fn main() -> courier::Result<()> {
    /// let client = courier::ClientOptions::new()
    ///     .auth_token("pk_prod_XXXXXXXX")
    ///     .client()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();

        if token.is_empty() {
            self.error = Some(error!(ErrorKind::Config, "auth token must not be empty"));
        } else {
            self.auth_token = Some(token);
        }

        self
    }

    /// Sets the base URL.
    ///
    /// # Errors
    ///
    /// [`client`] fails if the base URL is not a valid http or https URL.
    ///
    /// [`client`]: ClientOptions::client
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn http_open_timeout(mut self, timeout: Duration) -> Self {
        self.http_open_timeout = timeout;
        self
    }

    pub fn http_request_timeout(mut self, timeout: Duration) -> Self {
        self.http_request_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Parse and check the base URL.
    fn parse_base_url(&self) -> Result<reqwest::Url> {
        let url = reqwest::Url::parse(&self.base_url)?;

        match url.scheme() {
            "http" | "https" if url.has_host() => Ok(url),
            _ => Err(error!(
                ErrorKind::Config,
                format!("invalid base URL: {}", self.base_url)
            )),
        }
    }

    /// Returns a Courier client using the ClientOptions.
    ///
    /// # Errors
    ///
    /// This method fails if the ClientOptions are not valid:
    ///
    /// - an auth token must be provided
    /// - the base URL must be a valid http or https URL
    pub fn client(&self) -> Result<rest::Courier> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        let auth_token = self
            .auth_token
            .clone()
            .ok_or_else(|| error!(ErrorKind::Config, "must provide an auth token"))?;

        let base_url = self.parse_base_url()?;

        let mut default_headers = http::HeaderMap::new();
        default_headers.insert(
            reqwest::header::USER_AGENT,
            http::HeaderValue::from_str(&self.user_agent)?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(self.http_request_timeout)
            .connect_timeout(self.http_open_timeout)
            .build()?;

        let transport = http::Client::new(http_client, base_url, auth_token);

        let client = rest::Client::new(Arc::new(transport));

        Ok(rest::Courier::with_client(client))
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            auth_token: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            http_open_timeout: Duration::from_secs(4),
            http_request_timeout: Duration::from_secs(10),
            user_agent: format!("courier-rust/{}", env!("CARGO_PKG_VERSION")),
            error: None,
        }
    }
}

impl From<&str> for ClientOptions {
    /// Returns ClientOptions initialised with the given auth token.
    ///
    /// # Example
    ///
    /// ```
    /// let options = courier::ClientOptions::from("pk_prod_XXXXXXXX");
    /// ```
    fn from(s: &str) -> Self {
        Self::new().auth_token(s)
    }
}
