//! What a successful typed call hands back.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A deserialized value together with the exchange it came from.
///
/// Derefs to `T`. When a result path was set, `data` is the selected subtree
/// while `raw_body` is still the whole document.
///
/// # Examples
///
/// ```no_run
/// use reqtry::{Client, RequestMetadata};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Activity {
///     activity: String,
/// }
///
/// # async fn example() -> Result<(), reqtry::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .retry_count(3)
///     .build()?;
///
/// let metadata = RequestMetadata::get("activity").with_result_path("data");
/// let activity = client.call::<(), Activity>(metadata, None).await?;
/// if activity.was_retried() {
///     println!("{} needed {} attempts", activity.activity, activity.attempts);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The deserialized value.
    pub data: T,

    /// Body text as received.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time since the first attempt started, delays between attempts included.
    pub latency: Duration,

    /// 1-based number of the attempt that succeeded.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Consumes the response and returns the value.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// `true` when an earlier attempt failed.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// A response header as text. `None` when absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Keeps the exchange details and replaces the value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Response<U> {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}
