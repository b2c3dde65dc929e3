use std::fmt;

use serde::Deserialize;

/// Creates an [`ErrorInfo`] with the given kind and message.
///
/// [`ErrorInfo`]: courier::ErrorInfo
macro_rules! error {
    ($kind:expr, $message:expr) => {
        ErrorInfo::new($kind, $message, None)
    };
    ($kind:expr, $message:expr, $status_code:expr) => {
        ErrorInfo::new($kind, $message, $status_code)
    };
}

/// The broad category of an [`ErrorInfo`], used by callers to tell an
/// unreachable server apart from one which returned an unexpected body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request could not be built (malformed URL, invalid header value,
    /// missing message ID).
    RequestConstruction,

    /// The request failed on the network (connection refused, DNS, timeout).
    Transport,

    /// The server responded with a non-success status code.
    HttpStatus,

    /// The response body was not valid JSON or did not match the expected
    /// shape.
    Decode,

    /// The call was cancelled through its [`Context`].
    ///
    /// [`Context`]: crate::context::Context
    Cancelled,

    /// The deadline of the call's [`Context`] elapsed.
    ///
    /// [`Context`]: crate::context::Context
    DeadlineExceeded,

    /// The [`ClientOptions`] were invalid.
    ///
    /// [`ClientOptions`]: crate::ClientOptions
    Config,
}

/// A Courier client error.
#[derive(Clone, Debug)]
pub struct ErrorInfo {
    pub kind: ErrorKind,

    /// Additional message information, where available.
    pub message: String,

    /// HTTP Status Code corresponding to this error, where applicable.
    pub status_code: Option<u32>,

    /// The error type reported by the Courier API in the response body, e.g.
    /// `invalid_request_error`.
    pub error_type: Option<String>,
}

impl ErrorInfo {
    /// Returns an ErrorInfo with the given kind, message, and status_code.
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S, status_code: Option<u32>) -> Self {
        ErrorInfo {
            kind,
            message: message.into(),
            status_code,
            error_type: None,
        }
    }

    pub(crate) fn with_error_type(mut self, error_type: Option<String>) -> Self {
        self.error_type = error_type;
        self
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(status) => write!(f, "{:?} ({}): {}", self.kind, status, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for ErrorInfo {}

/// The error body returned by the Courier API for unsuccessful requests.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ApiError {
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}

impl From<reqwest::Error> for ErrorInfo {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return error!(
                ErrorKind::RequestConstruction,
                format!("Invalid HTTP request: {}", err)
            );
        }
        if err.is_decode() {
            return error!(
                ErrorKind::Decode,
                format!("Invalid response body: {}", err)
            );
        }
        match err.status() {
            Some(s) => error!(
                ErrorKind::HttpStatus,
                format!("Unexpected HTTP status: {}", s),
                Some(s.as_u16() as u32)
            ),
            None => error!(
                ErrorKind::Transport,
                format!("Unexpected HTTP error: {}", err)
            ),
        }
    }
}

impl From<serde_json::Error> for ErrorInfo {
    fn from(err: serde_json::Error) -> Self {
        error!(
            ErrorKind::Decode,
            format!("Invalid JSON response: {}", err)
        )
    }
}

impl From<url::ParseError> for ErrorInfo {
    fn from(err: url::ParseError) -> Self {
        error!(
            ErrorKind::RequestConstruction,
            format!("Invalid URL: {}", err)
        )
    }
}

impl From<reqwest::header::InvalidHeaderValue> for ErrorInfo {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        error!(
            ErrorKind::RequestConstruction,
            format!("Invalid header value: {}", err)
        )
    }
}

impl From<log::SetLoggerError> for ErrorInfo {
    fn from(err: log::SetLoggerError) -> Self {
        error!(ErrorKind::Config, format!("Failed to set logger: {}", err))
    }
}
