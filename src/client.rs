//! HTTP client with retry logic, envelope validation and result-path extraction.
//!
//! The [`Client`] type is the main entry point for making HTTP requests.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    execution::Execution,
    json::{self, JsonOptions},
    metadata::{FileUpload, RequestMetadata},
    options::{ApiKey, ApiOptions, ApiUser, AuthOptions, AuthScheme, BearerToken, Cookie},
    query, validate, Error, Response, Result, RetryPolicy,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use serde::{de::DeserializeOwned, Serialize};
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use url::Url;

/// A raw response body, chunk by chunk.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

type RequestHook = Arc<dyn Fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&Error) + Send + Sync>;

/// An HTTP client for JSON APIs with retries and rich error handling.
///
/// The client is cheap to clone and designed to be shared. The underlying
/// `reqwest` client is built on first use and reused by every call until the
/// configuration is replaced with [`Client::configure`].
///
/// # Examples
///
/// ```no_run
/// use reqtry::{metadata::RequestMetadata, Client};
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Serialize)]
/// struct Filter {
///     #[serde(rename = "type")]
///     kind: String,
/// }
///
/// #[derive(Deserialize)]
/// struct Activity {
///     activity: String,
/// }
///
/// # async fn example() -> Result<(), reqtry::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com/api")?
///     .retry_count(3)
///     .delay(Duration::from_millis(200))
///     .bearer_token("token")
///     .build()?;
///
/// let metadata = RequestMetadata::get("activity")
///     .with_query(&Filter { kind: "education".to_string() })?
///     .with_result_path("data");
///
/// let activity = client.call::<(), Activity>(metadata, None).await?;
/// println!("{}", activity.activity);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    provider: RwLock<Arc<Provider>>,
    json: JsonOptions,
    configure_request: Option<RequestHook>,
    on_error: Option<ErrorHook>,
}

/// One generation of configuration together with the transport built from it.
struct Provider {
    options: ApiOptions,
    auth: AuthOptions,
    default_headers: HeaderMap,
    transport: OnceCell<reqwest::Client>,
}

impl Provider {
    fn new(options: ApiOptions, auth: AuthOptions, default_headers: HeaderMap) -> Self {
        Self {
            options,
            auth,
            default_headers,
            transport: OnceCell::new(),
        }
    }

    /// Returns the transport, building it on first use.
    async fn transport(&self) -> Result<reqwest::Client> {
        self.transport
            .get_or_try_init(|| async { self.build_transport() })
            .await
            .cloned()
    }

    fn build_transport(&self) -> Result<reqwest::Client> {
        let mut headers = self.default_headers.clone();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Some((name, value)) = auth_header(&self.auth)? {
            headers.insert(name, value);
        }

        let timeout = self.options.timeout();
        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout);

        if self.options.ignore_ssl_errors {
            tracing::warn!(
                api_url = %self.options.api_url,
                "TLS certificate validation disabled"
            );
            builder = builder.danger_accept_invalid_certs(true);
        }

        if !self.auth.cookies.is_empty() {
            builder = builder.cookie_provider(Arc::new(self.cookie_jar()));
        }

        tracing::debug!(
            api_url = %self.options.api_url,
            timeout_ms = timeout.as_millis(),
            "Building HTTP client"
        );

        builder.build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })
    }

    fn cookie_jar(&self) -> reqwest::cookie::Jar {
        let jar = reqwest::cookie::Jar::default();
        match Url::parse(&self.options.api_url) {
            Ok(url) => {
                for cookie in &self.auth.cookies {
                    jar.add_cookie_str(&format!("{}={}", cookie.name, cookie.value), &url);
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    api_url = %self.options.api_url,
                    "Cookies configured without a valid base URL, not sending them"
                );
            }
        }
        jar
    }

    fn url_for(&self, metadata: &RequestMetadata) -> Result<Url> {
        let url = query::join_url(&self.options.api_url, &metadata.path, &metadata.query)?;
        Ok(Url::parse(&url)?)
    }
}

/// Builds the authorization header for the scheme that wins by precedence.
fn auth_header(auth: &AuthOptions) -> Result<Option<(HeaderName, HeaderValue)>> {
    let (name, value) = match auth.scheme() {
        None => return Ok(None),
        Some(AuthScheme::Basic(user)) => {
            let credentials = BASE64.encode(format!("{}:{}", user.name, user.password));
            (header::AUTHORIZATION, format!("Basic {}", credentials))
        }
        Some(AuthScheme::ApiKey(key)) => {
            let name = HeaderName::try_from(key.name.as_str()).map_err(|e| {
                Error::ConfigurationError(format!("Invalid API key header name: {}", e))
            })?;
            (name, key.key.clone())
        }
        Some(AuthScheme::Bearer(token)) => (header::AUTHORIZATION, format!("Bearer {}", token.0)),
    };

    let mut value = HeaderValue::try_from(value).map_err(|e| {
        Error::ConfigurationError(format!("Invalid credential header value: {}", e))
    })?;
    value.set_sensitive(true);
    Ok(Some((name, value)))
}

/// Request body, prepared once and replayed on every attempt.
enum Payload {
    Empty,
    Json(Bytes),
    Multipart {
        field_name: String,
        file_name: String,
        content: Bytes,
        parameters: Vec<(String, String)>,
    },
}

impl Payload {
    fn json<B: Serialize + ?Sized>(body: Option<&B>, options: &JsonOptions) -> Result<Self> {
        match body {
            Some(body) => Ok(Payload::Json(Bytes::from(json::to_body(body, options)?))),
            None => Ok(Payload::Empty),
        }
    }

    async fn upload(upload: &FileUpload) -> Result<Self> {
        let content = tokio::fs::read(&upload.path).await?;
        Ok(Payload::Multipart {
            field_name: upload.field_name.clone(),
            file_name: upload.file_name(),
            content: Bytes::from(content),
            parameters: upload.parameters.clone(),
        })
    }

    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Payload::Empty => request,
            Payload::Json(body) => request
                .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
                .body(body.clone()),
            Payload::Multipart {
                field_name,
                file_name,
                content,
                parameters,
            } => {
                let part = reqwest::multipart::Part::bytes(content.to_vec())
                    .file_name(file_name.clone());
                let form = parameters.iter().fold(
                    reqwest::multipart::Form::new().part(field_name.clone(), part),
                    |form, (name, value)| form.text(name.clone(), value.clone()),
                );
                request.multipart(form)
            }
        }
    }
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client from options, without authentication.
    pub fn new(options: ApiOptions) -> Self {
        Self::from_parts(
            Provider::new(options, AuthOptions::default(), HeaderMap::new()),
            JsonOptions::default(),
            None,
            None,
        )
    }

    fn from_parts(
        provider: Provider,
        json: JsonOptions,
        configure_request: Option<RequestHook>,
        on_error: Option<ErrorHook>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                provider: RwLock::new(Arc::new(provider)),
                json,
                configure_request,
                on_error,
            }),
        }
    }

    fn provider(&self) -> Arc<Provider> {
        let guard = self
            .inner
            .provider
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn replace_provider(&self, next: impl FnOnce(&Provider) -> Provider) {
        let mut guard = self
            .inner
            .provider
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(next(&guard));
    }

    /// Returns the current options.
    pub fn options(&self) -> ApiOptions {
        self.provider().options.clone()
    }

    /// Replaces the options.
    ///
    /// Calls already in flight finish with the previous configuration. The
    /// next call builds a fresh transport.
    pub fn configure(&self, options: ApiOptions) {
        tracing::info!(api_url = %options.api_url, "Reconfiguring client");
        self.replace_provider(|current| {
            Provider::new(options, current.auth.clone(), current.default_headers.clone())
        });
    }

    /// Replaces the credentials. Same rules as [`configure`](Self::configure).
    pub fn configure_auth(&self, auth: AuthOptions) {
        self.replace_provider(|current| {
            Provider::new(current.options.clone(), auth, current.default_headers.clone())
        });
    }

    /// Returns the retry policy calls run under unless a request overrides it.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.provider().options.retry_policy()
    }

    /// Returns the underlying `reqwest` client, building it on first use.
    ///
    /// Concurrent first calls wait for a single construction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if the credentials cannot be
    /// turned into headers or the TLS backend fails to initialize.
    pub async fn http_client(&self) -> Result<reqwest::Client> {
        self.provider().transport().await
    }

    /// Builds the full URL for `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if `path` is relative and the
    /// base URL is not absolute.
    ///
    /// # Examples
    ///
    /// ```
    /// use reqtry::{ApiOptions, Client};
    ///
    /// let client = Client::new(ApiOptions::new("https://host/api"));
    /// assert_eq!(client.api_url("activity").unwrap(), "https://host/api/activity");
    /// ```
    pub fn api_url(&self, path: &str) -> Result<String> {
        query::join_url(&self.provider().options.api_url, path, "")
    }

    /// Builds the full URL for `path` with a query string rendered from `params`.
    ///
    /// # Examples
    ///
    /// ```
    /// use reqtry::{ApiOptions, Client};
    ///
    /// let client = Client::new(ApiOptions::new("https://host/api"));
    /// let url = client
    ///     .api_url_with_query("activity", &serde_json::json!({ "type": "education", "price": 0 }))
    ///     .unwrap();
    /// assert_eq!(url, "https://host/api/activity?type=education&price=0");
    /// ```
    pub fn api_url_with_query<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        params: &Q,
    ) -> Result<String> {
        let query = query::query_string(params)?;
        query::join_url(&self.provider().options.api_url, path, &query)
    }

    /// Makes a typed request.
    ///
    /// The response is validated, the subtree at `metadata.result_path` is
    /// selected, and deserialized into `Res`. Every step runs inside the retry
    /// pipeline.
    ///
    /// # Errors
    ///
    /// * Configuration and serialization errors, before any attempt.
    /// * The last attempt's error once attempts are exhausted.
    /// * [`Error::Empty`] if exhaustion was reported to the `on_error`
    ///   observer or is configured to be silent.
    pub async fn call<Req, Res>(
        &self,
        metadata: RequestMetadata,
        body: Option<&Req>,
    ) -> Result<Response<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned + Send,
    {
        let payload = Payload::json(body, &self.inner.json)?;
        self.fetch(metadata, payload).await
    }

    /// Makes a request and discards the body after validating it.
    pub async fn execute<Req>(&self, metadata: RequestMetadata, body: Option<&Req>) -> Result<()>
    where
        Req: Serialize + ?Sized,
    {
        let payload = Payload::json(body, &self.inner.json)?;
        self.send_validated(metadata, payload).await
    }

    /// Uploads a file as `multipart/form-data` and deserializes the response.
    ///
    /// The file is read once, before the first attempt.
    pub async fn upload<Res>(
        &self,
        metadata: RequestMetadata,
        upload: &FileUpload,
    ) -> Result<Response<Res>>
    where
        Res: DeserializeOwned + Send,
    {
        let payload = Payload::upload(upload).await?;
        self.fetch(metadata, payload).await
    }

    /// Uploads a file and discards the body after validating it.
    pub async fn upload_execute(
        &self,
        metadata: RequestMetadata,
        upload: &FileUpload,
    ) -> Result<()> {
        let payload = Payload::upload(upload).await?;
        self.send_validated(metadata, payload).await
    }

    /// Makes a request and returns the raw body as a stream.
    ///
    /// Only the status code is checked; the body is not inspected.
    pub async fn stream<Req>(
        &self,
        metadata: RequestMetadata,
        body: Option<&Req>,
    ) -> Result<ByteStream>
    where
        Req: Serialize + ?Sized,
    {
        let payload = Payload::json(body, &self.inner.json)?;
        let provider = self.provider();
        let url = provider.url_for(&metadata)?;
        let (provider_ref, metadata_ref, url_ref, payload_ref) =
            (&*provider, &metadata, &url, &payload);

        self.pipeline(provider_ref, metadata_ref)
            .action(move |attempt| async move {
                let response = self
                    .send_once(provider_ref, metadata_ref, url_ref, payload_ref, attempt)
                    .await?;

                let status = response.status();
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(validate::failure(status, String::new(), &body));
                }

                let stream: ByteStream =
                    Box::pin(response.bytes_stream().map(|chunk| chunk.map_err(Error::from)));
                Ok(stream)
            })
            .get_result_not_empty()
            .await
    }

    /// Makes a GET request to the specified path.
    pub async fn get<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned + Send,
    {
        self.call::<(), Res>(RequestMetadata::new(Method::GET, path), None)
            .await
    }

    /// Makes a DELETE request to the specified path.
    pub async fn delete<Res>(&self, path: impl Into<String>) -> Result<Response<Res>>
    where
        Res: DeserializeOwned + Send,
    {
        self.call::<(), Res>(RequestMetadata::new(Method::DELETE, path), None)
            .await
    }

    /// Makes a POST request to the specified path with a JSON body.
    pub async fn post<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned + Send,
    {
        self.call(RequestMetadata::new(Method::POST, path), Some(body))
            .await
    }

    /// Makes a PUT request to the specified path with a JSON body.
    pub async fn put<Req, Res>(&self, path: impl Into<String>, body: &Req) -> Result<Response<Res>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned + Send,
    {
        self.call(RequestMetadata::new(Method::PUT, path), Some(body))
            .await
    }

    async fn fetch<Res>(&self, metadata: RequestMetadata, payload: Payload) -> Result<Response<Res>>
    where
        Res: DeserializeOwned + Send,
    {
        let provider = self.provider();
        let url = provider.url_for(&metadata)?;
        let start = Instant::now();
        let json = &self.inner.json;
        let (provider_ref, metadata_ref, url_ref, payload_ref) =
            (&*provider, &metadata, &url, &payload);

        self.pipeline(provider_ref, metadata_ref)
            .action(move |attempt| async move {
                let response = self
                    .send_once(provider_ref, metadata_ref, url_ref, payload_ref, attempt)
                    .await?;
                let validated = validate::validate(response).await?;
                let data = json::deserialize(&validated.body, &metadata_ref.result_path, json)?;

                let latency = start.elapsed();
                tracing::info!(
                    status = validated.status.as_u16(),
                    latency_ms = latency.as_millis(),
                    attempts = attempt,
                    "Received HTTP response"
                );

                Ok(Response {
                    data,
                    raw_body: validated.body,
                    status: validated.status,
                    headers: validated.headers,
                    latency,
                    attempts: attempt,
                })
            })
            .get_result_not_empty()
            .await
    }

    async fn send_validated(&self, metadata: RequestMetadata, payload: Payload) -> Result<()> {
        let provider = self.provider();
        let url = provider.url_for(&metadata)?;
        let (provider_ref, metadata_ref, url_ref, payload_ref) =
            (&*provider, &metadata, &url, &payload);

        self.pipeline(provider_ref, metadata_ref)
            .action(move |attempt| async move {
                let response = self
                    .send_once(provider_ref, metadata_ref, url_ref, payload_ref, attempt)
                    .await?;
                validate::validate(response).await?;
                Ok(())
            })
            .execute()
            .await
    }

    /// Creates the pipeline for one call: policy, cancellation and the
    /// client-level observer.
    fn pipeline<'a, T: Send + 'a>(
        &'a self,
        provider: &Provider,
        metadata: &RequestMetadata,
    ) -> Execution<'a, T> {
        let policy = metadata
            .retry_policy
            .clone()
            .unwrap_or_else(|| provider.options.retry_policy());

        let mut execution = Execution::new(policy);
        if let Some(token) = &metadata.cancellation {
            execution = execution.with_cancellation(token.clone());
        }
        if let Some(hook) = &self.inner.on_error {
            execution = execution.on_error(move |error| {
                hook(error);
                Ok(())
            });
        }
        execution
    }

    /// Executes a single attempt.
    async fn send_once(
        &self,
        provider: &Provider,
        metadata: &RequestMetadata,
        url: &Url,
        payload: &Payload,
        attempt: usize,
    ) -> Result<reqwest::Response> {
        let http = provider.transport().await?;

        tracing::debug!(
            method = %metadata.method,
            url = %url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let mut request = http.request(metadata.method.clone(), url.clone());
        for (name, value) in &metadata.headers {
            request = request.header(name, value);
        }
        request = payload.apply(request);

        if let Some(hook) = &self.inner.configure_request {
            request = hook(request);
        }

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::Network(e)
            }
        })
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use reqtry::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), reqtry::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(10))
///     .retry_count(3)
///     .api_key("X-Api-Key", "secret")
///     .default_header("User-Agent", "my-app/1.0")?
///     .configure_request(|request| request.header("X-Correlation-Id", "42"))
///     .on_error(|error| eprintln!("giving up: {}", error))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    options: ApiOptions,
    auth: AuthOptions,
    default_headers: HeaderMap,
    json: JsonOptions,
    configure_request: Option<RequestHook>,
    on_error: Option<ErrorHook>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            options: ApiOptions::default(),
            auth: AuthOptions::default(),
            default_headers: HeaderMap::new(),
            json: JsonOptions::default(),
            configure_request: None,
            on_error: None,
        }
    }

    /// Replaces all options at once.
    pub fn options(mut self, options: ApiOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the base URL for relative paths.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        Url::parse(url.as_ref())?;
        self.options.api_url = url.as_ref().to_string();
        Ok(self)
    }

    /// Sets the per-attempt and transport timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the total number of attempts per call.
    pub fn retry_count(mut self, attempts: usize) -> Self {
        self.options.retry_count = attempts;
        self
    }

    /// Sets the pause between attempts.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.options.delay = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets whether exhausting all attempts is reported.
    pub fn error_on_fail(mut self, fail: bool) -> Self {
        self.options.error_on_fail = fail;
        self
    }

    /// Disables TLS certificate validation.
    pub fn ignore_ssl_errors(mut self, ignore: bool) -> Self {
        self.options.ignore_ssl_errors = ignore;
        self
    }

    /// Replaces all credentials at once.
    pub fn auth(mut self, auth: AuthOptions) -> Self {
        self.auth = auth;
        self
    }

    /// Uses basic authentication.
    pub fn basic_auth(mut self, name: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth.api_user = Some(ApiUser::new(name, password));
        self
    }

    /// Sends `key` in the header `name`.
    pub fn api_key(mut self, name: impl Into<String>, key: impl Into<String>) -> Self {
        self.auth.api_key = Some(ApiKey::new(name, key));
        self
    }

    /// Uses bearer authentication.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth.bearer_token = Some(BearerToken(token.into()));
        self
    }

    /// Adds a cookie sent to the base URL.
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.auth.cookies.push(Cookie::new(name, value));
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the JSON reading and writing policy.
    pub fn json_options(mut self, json: JsonOptions) -> Self {
        self.json = json;
        self
    }

    /// Sets a hook that can modify every outgoing request.
    pub fn configure_request<F>(mut self, hook: F) -> Self
    where
        F: Fn(reqwest::RequestBuilder) -> reqwest::RequestBuilder + Send + Sync + 'static,
    {
        self.configure_request = Some(Arc::new(hook));
        self
    }

    /// Sets an observer for calls that exhausted their attempts.
    ///
    /// With an observer, the final error is passed to it instead of being
    /// returned. Typed calls then fail with [`Error::Empty`]; untyped calls
    /// succeed.
    ///
    /// Errors that are not retryable, such as [`Error::Cancelled`] or a
    /// [`Error::ConfigurationError`] from building the transport, skip the
    /// observer and are returned directly.
    pub fn on_error<F>(mut self, observer: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(observer));
        self
    }

    /// Builds the configured `Client`.
    ///
    /// The transport itself is built lazily, on the first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials cannot be sent as headers.
    pub fn build(self) -> Result<Client> {
        auth_header(&self.auth)?;

        if !self.options.api_url.is_empty() && Url::parse(&self.options.api_url).is_err() {
            tracing::warn!(
                api_url = %self.options.api_url,
                "Base URL is not absolute, only absolute paths can be requested"
            );
        }

        Ok(Client::from_parts(
            Provider::new(self.options, self.auth, self.default_headers),
            self.json,
            self.configure_request,
            self.on_error,
        ))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_url() {
        let client = Client::new(ApiOptions::new("https://www.boredapi.com/api"));

        assert_eq!(
            client.api_url("activity").unwrap(),
            "https://www.boredapi.com/api/activity"
        );
        assert_eq!(
            client
                .api_url_with_query(
                    "activity",
                    &serde_json::json!({ "type": "education", "price": 0 })
                )
                .unwrap(),
            "https://www.boredapi.com/api/activity?type=education&price=0"
        );
    }

    #[test]
    fn test_api_url_relative_base() {
        let client = Client::new(ApiOptions::new("www.boredapi.com/api"));
        assert!(matches!(
            client.api_url("activity"),
            Err(Error::ConfigurationError(_))
        ));
        assert_eq!(
            client.api_url("https://other/x").unwrap(),
            "https://other/x"
        );
    }

    #[test]
    fn test_basic_auth_header() {
        let auth = AuthOptions {
            api_user: Some(ApiUser::new("user", "pw")),
            bearer_token: Some(BearerToken("ignored".into())),
            ..AuthOptions::default()
        };
        let (name, value) = auth_header(&auth).unwrap().unwrap();
        assert_eq!(name, header::AUTHORIZATION);
        assert_eq!(value, "Basic dXNlcjpwdw==");
        assert!(value.is_sensitive());
    }

    #[test]
    fn test_api_key_header() {
        let auth = AuthOptions {
            api_key: Some(ApiKey::new("X-Api-Key", "k1")),
            bearer_token: Some(BearerToken("ignored".into())),
            ..AuthOptions::default()
        };
        let (name, value) = auth_header(&auth).unwrap().unwrap();
        assert_eq!(name.as_str(), "x-api-key");
        assert_eq!(value, "k1");
    }

    #[test]
    fn test_bearer_header() {
        let auth = AuthOptions {
            bearer_token: Some(BearerToken("t0k".into())),
            ..AuthOptions::default()
        };
        let (_, value) = auth_header(&auth).unwrap().unwrap();
        assert_eq!(value, "Bearer t0k");
        assert!(auth_header(&AuthOptions::default()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_api_key_name_fails_build() {
        let result = Client::builder().api_key("bad name", "k").build();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[tokio::test]
    async fn test_transport_built_once() {
        let client = Client::new(ApiOptions::new("https://host"));
        let provider = client.provider();
        assert!(!provider.transport.initialized());

        let (a, b) = tokio::join!(client.http_client(), client.http_client());
        assert!(a.is_ok() && b.is_ok());
        assert!(provider.transport.initialized());
        assert!(Arc::ptr_eq(&provider, &client.provider()));
    }

    #[tokio::test]
    async fn test_ignore_ssl_errors_builds_transport() {
        let client = Client::builder()
            .base_url("https://self-signed.example")
            .unwrap()
            .ignore_ssl_errors(true)
            .cookie("session", "abc")
            .build()
            .unwrap();

        assert!(client.options().ignore_ssl_errors);
        assert!(client.http_client().await.is_ok());
        assert!(client.provider().transport.initialized());
    }

    #[tokio::test]
    async fn test_configure_replaces_provider() {
        let client = Client::new(ApiOptions::new("https://first"));
        client.http_client().await.unwrap();
        let before = client.provider();

        client.configure(ApiOptions::new("https://second"));

        let after = client.provider();
        assert!(!Arc::ptr_eq(&before, &after));
        assert!(!after.transport.initialized());
        assert_eq!(client.api_url("x").unwrap(), "https://second/x");
        assert_eq!(client.options().api_url, "https://second");
    }

    #[test]
    fn test_builder_maps_durations() {
        let client = Client::builder()
            .timeout(Duration::from_millis(1500))
            .delay(Duration::from_millis(20))
            .retry_count(4)
            .error_on_fail(false)
            .build()
            .unwrap();

        let policy = client.retry_policy();
        assert_eq!(policy.attempts, 4);
        assert_eq!(policy.delay, Duration::from_millis(20));
        assert_eq!(policy.timeout, Duration::from_millis(1500));
        assert!(!policy.fail_on_exhaustion);
    }
}
