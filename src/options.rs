//! Client configuration.
//!
//! [`ApiOptions`] and [`AuthOptions`] can be built in code or deserialized
//! from a configuration file. Keys use PascalCase (`ApiUrl`, `RetryCount`,
//! ...) and every key is optional.
//!
//! ```
//! use reqtry::{ApiOptions, AuthOptions};
//!
//! let options: ApiOptions = serde_json::from_str(
//!     r#"{ "ApiUrl": "https://api.example.com", "RetryCount": 3, "Delay": 250 }"#,
//! ).unwrap();
//! assert_eq!(options.retry_policy().attempts, 3);
//! assert!(options.error_on_fail);
//!
//! let auth: AuthOptions = serde_json::from_str(
//!     r#"{ "ApiKey": { "Name": "X-Api-Key", "Key": "secret" } }"#,
//! ).unwrap();
//! assert!(!format!("{:?}", auth).contains("secret"));
//! ```

use crate::retry::{RetryPolicy, DEFAULT_TIMEOUT};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Endpoint and retry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ApiOptions {
    /// Base address. Must be absolute when relative paths are requested.
    pub api_url: String,
    /// Disables TLS certificate validation.
    pub ignore_ssl_errors: bool,
    /// Total attempts per call.
    pub retry_count: usize,
    /// Pause between attempts, in milliseconds.
    pub delay: u64,
    /// Whether exhausting all attempts is reported as an error.
    pub error_on_fail: bool,
    /// Per-attempt and transport timeout, in milliseconds. Zero means the default.
    pub timeout: u64,
}

impl ApiOptions {
    /// Creates options for `api_url` with default retry settings.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    /// The transport timeout.
    pub fn timeout(&self) -> Duration {
        if self.timeout == 0 {
            DEFAULT_TIMEOUT
        } else {
            Duration::from_millis(self.timeout)
        }
    }

    /// The retry policy calls made with these options run under.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_count)
            .with_delay(Duration::from_millis(self.delay))
            .with_fail_on_exhaustion(self.error_on_fail)
            .with_timeout(self.timeout())
    }
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            ignore_ssl_errors: false,
            retry_count: 1,
            delay: 0,
            error_on_fail: true,
            timeout: 30_000,
        }
    }
}

/// Credentials attached to every request.
///
/// When several schemes are configured only one is applied, in the order
/// basic user, API key, bearer token. Cookies are independent of the scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AuthOptions {
    /// Basic authentication.
    pub api_user: Option<ApiUser>,
    /// A named header holding a raw key.
    pub api_key: Option<ApiKey>,
    /// Bearer token, without the `Bearer ` prefix.
    pub bearer_token: Option<BearerToken>,
    /// Cookies sent to the base address.
    pub cookies: Vec<Cookie>,
}

/// The authentication scheme [`AuthOptions`] resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme<'a> {
    /// `Authorization: Basic ...`
    Basic(&'a ApiUser),
    /// `<name>: <key>`
    ApiKey(&'a ApiKey),
    /// `Authorization: Bearer ...`
    Bearer(&'a BearerToken),
}

impl AuthOptions {
    /// Returns the scheme that wins by precedence, if any.
    pub fn scheme(&self) -> Option<AuthScheme<'_>> {
        if let Some(user) = &self.api_user {
            return Some(AuthScheme::Basic(user));
        }
        if let Some(key) = &self.api_key {
            return Some(AuthScheme::ApiKey(key));
        }
        self.bearer_token.as_ref().map(AuthScheme::Bearer)
    }
}

/// User name and password for basic authentication.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiUser {
    /// User name
    pub name: String,
    /// Password
    pub password: String,
}

impl ApiUser {
    /// Creates basic credentials.
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for ApiUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiUser")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A key sent in a named header.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiKey {
    /// Header name, e.g. `X-Api-Key`
    pub name: String,
    /// Header value
    pub key: String,
}

impl ApiKey {
    /// Creates an API key credential.
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("name", &self.name)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// A bearer token.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(pub String);

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// A cookie set on the base address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Cookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
}

impl Cookie {
    /// Creates a cookie.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}
