use std::fmt;
use std::future::Future;
use std::pin::Pin;

use log::{debug, trace, warn};
pub use reqwest::header::{HeaderMap, HeaderValue};
pub use reqwest::Method;
use serde::Serialize;

use super::error::{ApiError, ErrorInfo, ErrorKind};
use super::Result;

/// The future returned by [`Transport::execute`], resolving to the raw
/// response body.
pub type ResponseFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>>;

/// Executes requests against the [Courier API].
///
/// The transport owns base URL resolution, authentication and status
/// checking: an implementation must resolve to `Ok` only for successful
/// responses. [`Client`] is the reqwest implementation; tests substitute
/// their own.
///
/// [Courier API]: https://www.courier.com/docs/reference/
pub trait Transport: fmt::Debug + Send + Sync {
    fn execute(&self, req: Request) -> ResponseFuture<'_>;
}

/// A HTTP request relative to the transport's base URL.
#[derive(Clone, Debug, PartialEq)]
pub struct Request {
    pub method: Method,
    pub path:   String,
    pub params: Vec<(String, String)>,
    pub body:   Option<serde_json::Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Request {
        Request {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Request {
        Self::new(Method::GET, path)
    }

    /// Add a query param.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Request {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Add a query param only if the value is non-empty.
    pub fn param_if_set(self, key: impl Into<String>, value: &str) -> Request {
        if value.is_empty() {
            self
        } else {
            self.param(key, value)
        }
    }

    /// Set the JSON request body.
    pub fn body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Request> {
        self.body = Some(serde_json::to_value(body).map_err(|err| {
            error!(
                ErrorKind::RequestConstruction,
                format!("invalid request body: {}", err)
            )
        })?);
        Ok(self)
    }
}

/// A low-level HTTP client for the [Courier API].
///
/// [Courier API]: https://www.courier.com/docs/reference/
#[derive(Clone)]
pub struct Client {
    inner:      reqwest::Client,
    base_url:   reqwest::Url,
    auth_token: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn new(inner: reqwest::Client, base_url: reqwest::Url, auth_token: String) -> Client {
        Client {
            inner,
            base_url,
            auth_token,
        }
    }

    /// Resolve the full URL of a request: the base URL's path joined with the
    /// request path, plus the query params. No `?` is emitted when there are
    /// no params.
    pub(crate) fn url(&self, req: &Request) -> Result<reqwest::Url> {
        let mut url = self.base_url.clone();
        let path = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            req.path.trim_start_matches('/')
        );
        url.set_path(&path);
        url.set_query(None);

        if !req.params.is_empty() {
            url.query_pairs_mut().extend_pairs(req.params.iter());
        }

        Ok(url)
    }

    async fn send(&self, req: Request) -> Result<Vec<u8>> {
        let url = self.url(&req)?;
        debug!("{} {}", req.method, url.path());

        let mut builder = self
            .inner
            .request(req.method.clone(), url)
            .bearer_auth(&self.auth_token)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = &req.body {
            builder = builder.json(body);
        }

        let res = builder.send().await?;
        let status = res.status();
        trace!("{} {} -> {}", req.method, req.path, status);

        // Return the body if the response was successful, otherwise try to
        // decode a JSON error from it, falling back to a generic error if
        // decoding fails.
        if status.is_success() {
            return Ok(res.bytes().await?.to_vec());
        }

        warn!("{} {} failed with status {}", req.method, req.path, status);
        let status_code = Some(status.as_u16() as u32);
        let body = res.bytes().await.unwrap_or_default();
        Err(match serde_json::from_slice::<ApiError>(&body) {
            Ok(ApiError {
                message: Some(message),
                error_type,
            }) => error!(ErrorKind::HttpStatus, message, status_code).with_error_type(error_type),
            _ => error!(
                ErrorKind::HttpStatus,
                format!("Unexpected HTTP status: {}", status),
                status_code
            ),
        })
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(&self, req: Request) -> ResponseFuture<'_> {
        (**self).execute(req)
    }
}

impl Transport for Client {
    fn execute(&self, req: Request) -> ResponseFuture<'_> {
        Box::pin(self.send(req))
    }
}
