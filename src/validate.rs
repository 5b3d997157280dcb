//! Response validation.
//!
//! Servers often report failures in the body, sometimes with a 200 status.
//! [`validate`] reads the body once, looks for the common error envelope
//!
//! ```json
//! { "message": "...", "errorMessage": "...", "error": "...", "errors": [{ "field": ["..."] }] }
//! ```
//!
//! and turns the response into either the body text or a typed [`Error`].

use crate::{Error, Result};
use http::{HeaderMap, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};

/// The error/success shape a server may declare in any response body.
///
/// Keys are accepted in camelCase or PascalCase.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResultEnvelope {
    /// Informational message on success
    #[serde(alias = "SuccessMessage")]
    pub success_message: Option<String>,
    /// General message; not treated as an error
    #[serde(alias = "Message")]
    pub message: Option<String>,
    /// Preferred error text
    #[serde(alias = "ErrorMessage")]
    pub error_message: Option<String>,
    /// Fallback error text
    #[serde(alias = "Error")]
    pub error: Option<String>,
    /// Field errors, each entry mapping a field name to its messages.
    #[serde(alias = "Errors")]
    pub errors: Option<Vec<Map<String, Value>>>,
}

impl ResultEnvelope {
    /// Parses an envelope out of `body`. Never fails: anything that does not
    /// look like an envelope yields an empty one.
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// The error the envelope declares, or an empty string.
    ///
    /// `errorMessage` wins over `error`; field errors are appended as
    /// `"field: [a, b]. "`.
    pub fn error_text(&self) -> String {
        let mut text = self
            .error_message
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| self.error.clone())
            .unwrap_or_default();

        for entry in self.errors.iter().flatten() {
            for (field, messages) in entry {
                if !text.is_empty() && !text.ends_with(' ') {
                    text.push(' ');
                }
                text.push_str(&format!("{}: [{}]. ", field, render_messages(messages)));
            }
        }
        text
    }
}

fn render_messages(messages: &Value) -> String {
    match messages {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A response that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedBody {
    /// The HTTP status code
    pub status: StatusCode,
    /// The response headers
    pub headers: HeaderMap,
    /// The full body text
    pub body: String,
}

/// Reads `response` to the end and checks it for failure.
///
/// # Errors
///
/// * [`Error::Unauthorized`] for 401.
/// * [`Error::RequestFailed`] for any other non-2xx status, or a 2xx status
///   whose body declares an error.
/// * [`Error::Network`] if the body cannot be read.
pub async fn validate(response: reqwest::Response) -> Result<ValidatedBody> {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await?;

    check(status, &body)?;

    Ok(ValidatedBody {
        status,
        headers,
        body,
    })
}

/// The status/envelope check behind [`validate`].
pub fn check(status: StatusCode, body: &str) -> Result<()> {
    let declared = ResultEnvelope::parse(body).error_text();

    if status.is_success() && declared.is_empty() {
        return Ok(());
    }

    Err(failure(status, declared, body))
}

/// Builds the error for a failed response.
///
/// The message is `"{status} {error}"`, where an empty `error` falls back to
/// the raw body and then to the status reason.
pub(crate) fn failure(status: StatusCode, declared: String, body: &str) -> Error {
    let detail = if !declared.is_empty() {
        declared
    } else if !body.trim().is_empty() {
        body.trim().to_string()
    } else {
        status.canonical_reason().unwrap_or_default().to_string()
    };
    let message = format!("{} {}", status.as_u16(), detail);

    if status == StatusCode::UNAUTHORIZED {
        tracing::error!(status = status.as_u16(), "Unauthorized");
        return Error::Unauthorized { status, message };
    }

    if status.is_client_error() {
        tracing::error!(status = status.as_u16(), response = %body, "Client error (4xx)");
    } else if status.is_server_error() {
        tracing::warn!(status = status.as_u16(), response = %body, "Server error (5xx)");
    } else {
        tracing::warn!(status = status.as_u16(), error = %message, "Server declared an error");
    }

    Error::RequestFailed {
        status,
        message,
        raw_response: body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_without_error() {
        assert!(check(StatusCode::OK, r#"{"message":"done","id":1}"#).is_ok());
        assert!(check(StatusCode::CREATED, "").is_ok());
        assert!(check(StatusCode::OK, "[1,2,3]").is_ok());
        assert!(check(StatusCode::OK, "not json").is_ok());
    }

    #[test]
    fn test_unauthorized() {
        match check(StatusCode::UNAUTHORIZED, "whatever") {
            Err(Error::Unauthorized { status, message }) => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(message, "401 whatever");
            }
            other => panic!("Expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_declared_error_on_success_status() {
        match check(StatusCode::OK, r#"{"errorMessage":"quota exceeded"}"#) {
            Err(Error::RequestFailed {
                status, message, ..
            }) => {
                assert_eq!(status, StatusCode::OK);
                assert_eq!(message, "200 quota exceeded");
            }
            other => panic!("Expected RequestFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_error_message_precedence() {
        let envelope = ResultEnvelope::parse(r#"{"ErrorMessage":"first","Error":"second"}"#);
        assert_eq!(envelope.error_text(), "first");

        let envelope = ResultEnvelope::parse(r#"{"error":"second"}"#);
        assert_eq!(envelope.error_text(), "second");
    }

    #[test]
    fn test_field_errors_appended() {
        let body = concat!(
            r#"{"error":"invalid","errors":"#,
            r#"[{"name":["required","too short"]},{"age":["negative"]}]}"#
        );
        let envelope = ResultEnvelope::parse(body);
        assert_eq!(
            envelope.error_text(),
            "invalid name: [required, too short]. age: [negative]. "
        );
        assert!(check(StatusCode::OK, body).is_err());
    }

    #[test]
    fn test_non_success_falls_back_to_body() {
        match check(StatusCode::NOT_FOUND, "Not found") {
            Err(Error::RequestFailed {
                message,
                raw_response,
                ..
            }) => {
                assert_eq!(message, "404 Not found");
                assert_eq!(raw_response, "Not found");
            }
            other => panic!("Expected RequestFailed, got {:?}", other),
        }

        match check(StatusCode::BAD_GATEWAY, "") {
            Err(e) => assert_eq!(e.to_string(), "502 Bad Gateway"),
            Ok(()) => panic!("Expected failure"),
        }
    }

    #[test]
    fn test_malformed_envelope_is_ignored() {
        let envelope = ResultEnvelope::parse(r#"{"error":{"code":5}}"#);
        assert_eq!(envelope, ResultEnvelope::default());
    }
}
