//! Error types for API calls.
//!
//! Every failure a call can produce is a variant of [`Error`]. The variants
//! that come from the server (`Unauthorized`, `RequestFailed`) keep the HTTP
//! status and the message the server declared, so callers can log or branch
//! on them without re-reading the response.

use http::StatusCode;

/// The main error type for API calls.
///
/// # Examples
///
/// ```no_run
/// use reqtry::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// match client.get::<serde_json::Value>("/endpoint").await {
///     Ok(response) => println!("Success: {:?}", response.data),
///     Err(Error::Unauthorized { message, .. }) => eprintln!("Login again: {}", message),
///     Err(Error::RequestFailed { status, message, .. }) => {
///         eprintln!("Request failed with {}: {}", status, message);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection refused, DNS failure, TLS handshake, ...).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// An attempt did not finish within the per-attempt timeout.
    #[error("Request timed out")]
    Timeout,

    /// The caller cancelled the operation.
    #[error("Request cancelled")]
    Cancelled,

    /// The server answered 401.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// The HTTP status code (always 401)
        status: StatusCode,
        /// `"{status} {error}"` as computed by the validator
        message: String,
    },

    /// The server answered with a non-success status, or declared an error in
    /// the body of a successful one.
    ///
    /// `message` is `"{status} {error}"`, where `error` comes from the response
    /// envelope (`errorMessage`, `error`, field errors) or the raw body.
    #[error("{message}")]
    RequestFailed {
        /// The HTTP status code
        status: StatusCode,
        /// Human readable message embedding the numeric status
        message: String,
        /// The raw response body
        raw_response: String,
    },

    /// The body was not valid JSON, a result path segment was missing or null,
    /// or the value did not fit the requested type.
    #[error("Cannot parse response: {message}")]
    DeserializationFailed {
        /// What went wrong
        message: String,
        /// The text that failed to parse
        raw_response: String,
    },

    /// A typed operation finished without producing a value.
    #[error("Empty result")]
    Empty,

    /// Invalid configuration: no action registered, relative base URL, bad header, ...
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize a request body or query object.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Reading a file for upload failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if the pipeline keeps retrying after this error.
    ///
    /// Everything that can happen inside an attempt is retryable, including
    /// 401 and deserialization failures. Cancellation and errors raised before
    /// the first attempt are not.
    ///
    /// # Examples
    ///
    /// ```
    /// use reqtry::Error;
    /// use http::StatusCode;
    ///
    /// let err = Error::Unauthorized {
    ///     status: StatusCode::UNAUTHORIZED,
    ///     message: "401 token expired".to_string(),
    /// };
    /// assert!(err.is_retryable());
    /// assert!(!Error::Cancelled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Timeout => true,
            Error::Unauthorized { .. } => true,
            Error::RequestFailed { .. } => true,
            Error::DeserializationFailed { .. } => true,
            Error::Empty => true,
            Error::Cancelled => false,
            Error::ConfigurationError(_) => false,
            Error::SerializationFailed(_) => false,
            Error::InvalidUrl(_) => false,
            Error::Io(_) => false,
        }
    }

    /// Returns `true` for the 401 failure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Unauthorized { .. })
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Unauthorized { status, .. } => Some(*status),
            Error::RequestFailed { status, .. } => Some(*status),
            Error::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::RequestFailed { raw_response, .. } => Some(raw_response),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for API calls.
pub type Result<T> = std::result::Result<T, Error>;
