//! # Reqtry - A retrying JSON HTTP client
//!
//! Reqtry wraps `reqwest` with the plumbing most JSON API clients end up
//! writing by hand: a retry pipeline with per-attempt timeouts, query strings
//! built from plain structs, credentials applied once per client, response
//! validation that understands error envelopes in the body, and
//! deserialization of a nested subtree selected by a dotted path.
//!
//! ## Quick Start
//!
//! ```no_run
//! use reqtry::{metadata::RequestMetadata, Client};
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct Search {
//!     #[serde(rename = "type")]
//!     kind: String,
//!     price: u32,
//! }
//!
//! #[derive(Deserialize)]
//! struct Activity {
//!     activity: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reqtry::Error> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com/api")?
//!         .retry_count(3)
//!         .delay(Duration::from_millis(250))
//!         .bearer_token("secret")
//!         .build()?;
//!
//!     // GET /api/activity?type=education&price=0, reading `result` from the body
//!     let metadata = RequestMetadata::get("activity")
//!         .with_query(&Search { kind: "education".into(), price: 0 })?
//!         .with_result_path("result");
//!     let activity = client.call::<(), Activity>(metadata, None).await?;
//!     println!("{} after {} attempt(s)", activity.activity, activity.attempts);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Failures keep the status and raw body around for debugging:
//!
//! ```no_run
//! use reqtry::{Client, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::builder().base_url("https://api.example.com")?.build()?;
//! match client.get::<serde_json::Value>("endpoint").await {
//!     Ok(response) => println!("Success: {:?}", response.data),
//!     Err(Error::Unauthorized { message, .. }) => eprintln!("Log in again: {}", message),
//!     Err(Error::RequestFailed { status, message, raw_response }) => {
//!         eprintln!("{} failed: {} ({})", status, message, raw_response);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Retry Pipelines
//!
//! The pipeline behind every call is usable on its own:
//!
//! ```no_run
//! use reqtry::{Error, Execution, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Error> {
//! let policy = RetryPolicy::new(3).with_delay(Duration::from_millis(100));
//! let value = Execution::new(policy)
//!     .action(|attempt| async move {
//!         if attempt < 2 { Err(Error::Timeout) } else { Ok("ready") }
//!     })
//!     .get_result_not_empty()
//!     .await?;
//! assert_eq!(value, "ready");
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! [`ApiOptions`] and [`AuthOptions`] deserialize from PascalCase keys, so
//! they can be loaded straight from a settings file and passed to
//! [`ClientBuilder::options`] and [`ClientBuilder::auth`].

mod client;
mod error;
pub mod execution;
pub mod json;
pub mod metadata;
pub mod options;
pub mod query;
mod response;
pub mod retry;
pub mod validate;

pub use client::{ByteStream, Client, ClientBuilder};
pub use error::{Error, Result};
pub use execution::Execution;
pub use json::JsonOptions;
pub use metadata::{FileUpload, RequestMetadata};
pub use options::{ApiKey, ApiOptions, ApiUser, AuthOptions, BearerToken, Cookie};
pub use query::QueryParams;
pub use response::Response;
pub use retry::RetryPolicy;
