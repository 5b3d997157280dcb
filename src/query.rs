//! Query string construction.
//!
//! Any `Serialize` value can be turned into a query string. Struct fields
//! are emitted in declaration order; `#[serde(skip)]` excludes a field and
//! `#[serde(rename = "...")]` renames it. For ad-hoc parameters without a
//! struct, use [`QueryParams`].
//!
//! Rendering rules for each field:
//!
//! - `null` and empty strings are omitted.
//! - Strings that parse as a date/time are rendered as
//!   `YYYY-MM-DDTHH:mm:ss.fffZ` in UTC. Values without an offset are taken as
//!   local time. Dates in year 1 or earlier are omitted.
//! - Other strings, numbers and booleans are appended verbatim.
//! - Arrays are joined with commas into a single value (`ids=1,2,3`). Empty
//!   arrays are omitted.
//! - Nested objects are rendered as compact JSON.
//!
//! A top-level string longer than one character is a pre-built fragment and
//! is appended after `?` as-is.

use crate::{Error, Result};
use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// Format used for date/time values.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

const NAIVE_DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Renders `params` as a query string, including the leading `?`.
///
/// Returns an empty string when no key/value pair was produced.
///
/// # Errors
///
/// Returns [`Error::SerializationFailed`] if `params` cannot be serialized.
///
/// # Examples
///
/// ```
/// use reqtry::query::query_string;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Filter {
///     #[serde(rename = "type")]
///     kind: &'static str,
///     price: u32,
///     tags: Vec<&'static str>,
///     cursor: Option<String>,
/// }
///
/// let filter = Filter { kind: "education", price: 0, tags: vec!["a", "b"], cursor: None };
/// assert_eq!(query_string(&filter).unwrap(), "?type=education&price=0&tags=a,b");
///
/// assert_eq!(query_string(&None::<Filter>).unwrap(), "");
/// assert_eq!(query_string("parameter=T").unwrap(), "?parameter=T");
/// ```
pub fn query_string<Q: Serialize + ?Sized>(params: &Q) -> Result<String> {
    match to_value(params)? {
        Value::String(raw) if raw.chars().count() > 1 => Ok(format!("?{}", raw)),
        Value::String(_) => Ok(String::new()),
        value => Ok(render(&pairs_of(&value))),
    }
}

/// Returns the ordered key/value pairs `params` renders to.
///
/// Only maps and structs produce pairs; anything else yields an empty list.
pub fn to_pairs<Q: Serialize + ?Sized>(params: &Q) -> Result<Vec<(String, String)>> {
    Ok(pairs_of(&to_value(params)?))
}

/// Joins a base URL, a path and a rendered query string.
///
/// An absolute `path` (`http://` or `https://`) is used as-is. Otherwise
/// `base` must be absolute, and `path` is appended to it with exactly one `/`
/// between them.
///
/// # Errors
///
/// Returns [`Error::ConfigurationError`] if `path` is relative and `base` is
/// not an absolute URL.
///
/// # Examples
///
/// ```
/// use reqtry::query::join_url;
///
/// assert_eq!(
///     join_url("https://host/api", "activity", "?type=education").unwrap(),
///     "https://host/api/activity?type=education"
/// );
/// assert!(join_url("", "activity", "").is_err());
/// ```
pub fn join_url(base: &str, path: &str, query: &str) -> Result<String> {
    let mut url = if is_absolute(path) {
        path.to_string()
    } else {
        if !is_absolute(base) {
            return Err(Error::ConfigurationError(format!(
                "base URL must be absolute (http:// or https://), got {:?}",
                base
            )));
        }
        let base = base.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{}{}", base, path)
        } else {
            format!("{}/{}", base, path)
        }
    };

    match query.strip_prefix('?') {
        Some(rest) if url.contains('?') => {
            url.push('&');
            url.push_str(rest);
        }
        _ => url.push_str(query),
    }
    Ok(url)
}

fn is_absolute(url: &str) -> bool {
    let has_prefix = |prefix: &str| {
        url.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    has_prefix("http://") || has_prefix("https://")
}

fn to_value<Q: Serialize + ?Sized>(params: &Q) -> Result<Value> {
    serde_json::to_value(params).map_err(|e| Error::SerializationFailed(e.to_string()))
}

fn pairs_of(value: &Value) -> Vec<(String, String)> {
    let Value::Object(fields) = value else {
        return Vec::new();
    };

    fields
        .iter()
        .filter_map(|(key, value)| format_value(value).map(|text| (key.clone(), text)))
        .collect()
}

fn render(pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }

    let joined = pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");
    format!("?{}", joined)
}

fn format_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => format_text(text),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().filter_map(format_value).collect();
            if items.is_empty() {
                None
            } else {
                Some(items.join(","))
            }
        }
        Value::Object(_) => Some(value.to_string()),
    }
}

fn format_text(text: &str) -> Option<String> {
    match parse_date(text) {
        Some(date) if date.year() > 1 => {
            Some(date.with_timezone(&Utc).format(DATE_FORMAT).to_string())
        }
        Some(_) => None,
        None => Some(text.to_string()),
    }
}

/// Recognizes RFC 3339 timestamps, offset-less date-times and plain dates.
fn parse_date(text: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date);
    }

    let naive = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })?;

    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|date| date.fixed_offset())
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive).fixed_offset());
    Some(local)
}

/// An ordered list of query parameters.
///
/// Empty values are skipped on insertion, so optional parameters can be
/// pushed unconditionally.
///
/// # Examples
///
/// ```
/// use reqtry::query::{query_string, QueryParams};
///
/// let params = QueryParams::new()
///     .with("page", 2)
///     .with("search", "")
///     .with("sort", "name");
///
/// assert_eq!(params.to_query_string(), "?page=2&sort=name");
/// assert_eq!(query_string(&params).unwrap(), "?page=2&sort=name");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    /// Appends a parameter unless its value renders empty.
    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        let value = value.to_string();
        if !value.is_empty() {
            self.pairs.push((key.into(), value));
        }
    }

    /// Returns `true` if no parameter was added.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates over the parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders the parameters verbatim, without date reformatting.
    pub fn to_query_string(&self) -> String {
        render(&self.pairs)
    }
}

impl Serialize for QueryParams {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (key, value) in &self.pairs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
