//! Per-request settings.

use crate::{query, Error, Result, RetryPolicy};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Everything about one request except its body.
///
/// # Examples
///
/// ```
/// use reqtry::metadata::RequestMetadata;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Page { page: u32, size: u32 }
///
/// let metadata = RequestMetadata::get("/activities")
///     .with_query(&Page { page: 2, size: 50 })
///     .unwrap()
///     .with_result_path("data.items");
///
/// assert_eq!(metadata.query, "?page=2&size=50");
/// assert_eq!(metadata.result_path, "data.items");
/// ```
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The request path, relative to the base URL, or an absolute URL.
    pub path: String,

    /// Rendered query string, including the leading `?`, or empty.
    pub query: String,

    /// Dotted path of the JSON subtree to deserialize. Empty for the whole body.
    pub result_path: String,

    /// Additional headers for this request.
    pub headers: HeaderMap,

    /// Overrides the client's retry policy for this request.
    pub retry_policy: Option<RetryPolicy>,

    /// Cancels the request, including pending retries.
    pub cancellation: Option<CancellationToken>,
}

impl RequestMetadata {
    /// Creates a new `RequestMetadata` with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: String::new(),
            result_path: String::new(),
            headers: HeaderMap::new(),
            retry_policy: None,
            cancellation: None,
        }
    }

    /// A GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// A POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// A PUT request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// A DELETE request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Sets the query string from any serializable value.
    ///
    /// See [`query`](crate::query) for the rendering rules.
    ///
    /// # Errors
    ///
    /// Returns an error if `params` cannot be serialized.
    pub fn with_query<Q: Serialize + ?Sized>(mut self, params: &Q) -> Result<Self> {
        self.query = query::query_string(params)?;
        Ok(self)
    }

    /// Appends one query parameter. Empty values are skipped.
    pub fn with_query_param(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let value = value.as_ref();
        if value.is_empty() {
            return self;
        }
        self.query.push(if self.query.is_empty() { '?' } else { '&' });
        self.query.push_str(key.as_ref());
        self.query.push('=');
        self.query.push_str(value);
        self
    }

    /// Deserializes the subtree at `path` instead of the whole body.
    pub fn with_result_path(mut self, path: impl Into<String>) -> Self {
        self.result_path = path.into();
        self
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Runs this request under `policy` instead of the client's.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Attaches a cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new(Method::GET, "")
    }
}

/// A file sent as `multipart/form-data`.
///
/// # Examples
///
/// ```
/// use reqtry::metadata::FileUpload;
///
/// let upload = FileUpload::new("report.csv")
///     .with_field_name("document")
///     .with_parameter("year", "2024");
/// assert_eq!(upload.file_name(), "report.csv");
/// ```
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// The file to read.
    pub path: PathBuf,
    /// Form field holding the file. Defaults to `file`.
    pub field_name: String,
    /// Extra text fields, in order.
    pub parameters: Vec<(String, String)>,
}

impl FileUpload {
    /// Uploads the file at `path` in the `file` field.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            field_name: "file".to_string(),
            parameters: Vec::new(),
        }
    }

    /// Sets the form field name.
    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// Adds a text field.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// The file name sent with the part.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.field_name.clone())
    }
}
