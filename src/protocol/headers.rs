//! Header composition for synthesized responses.
//!
//! This module merges new header values into a response's header map under an
//! explicit policy. Names are lower-cased before lookup and storage.
//!
//! # Composition Policy
//!
//! | Option | Default | Effect |
//! |--------|---------|--------|
//! | `append` | `false` | Join the new value onto an existing one |
//! | `separator` | `","` | Joiner used when appending |
//! | `override` | `true` | When `false`, an existing value always wins |
//! | `duplicate` | `true` | When `false`, appending a token already present is a no-op |
//!
//! Two headers are special-cased:
//!
//! - `set-cookie` accumulates as an ordered list of values and is never
//!   joined into one string.
//! - `vary` never goes through the policy above. It follows [`apply_vary`],
//!   where `*` is absorbing.
//!
//! # Examples
//!
//! ```
//! use route_harness::protocol::{set_header, HeaderMap, HeaderOptions};
//!
//! let mut headers = HeaderMap::new();
//! set_header(&mut headers, "Cache-Control", "no-cache", &HeaderOptions::default()).unwrap();
//! set_header(&mut headers, "cache-control", "private", &HeaderOptions::append()).unwrap();
//!
//! assert_eq!(headers["cache-control"].as_str(), Some("no-cache,private"));
//! ```

use crate::error::{HarnessError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

/// Well-known header names, lower-cased.
pub mod names {
    /// `content-type`
    pub const CONTENT_TYPE: &str = "content-type";
    /// `content-length`
    pub const CONTENT_LENGTH: &str = "content-length";
    /// `location`
    pub const LOCATION: &str = "location";
    /// `etag`
    pub const ETAG: &str = "etag";
    /// `last-modified`
    pub const LAST_MODIFIED: &str = "last-modified";
    /// `vary`
    pub const VARY: &str = "vary";
    /// `set-cookie`
    pub const SET_COOKIE: &str = "set-cookie";
    /// `if-none-match`
    pub const IF_NONE_MATCH: &str = "if-none-match";
    /// `if-modified-since`
    pub const IF_MODIFIED_SINCE: &str = "if-modified-since";
    /// `accept-encoding`
    pub const ACCEPT_ENCODING: &str = "accept-encoding";
    /// `host`
    pub const HOST: &str = "host";
    /// `referer`
    pub const REFERER: &str = "referer";
    /// `referrer`
    pub const REFERRER: &str = "referrer";
    /// `origin`
    pub const ORIGIN: &str = "origin";
}

/// Response header map keyed by lower-cased header name.
pub type HeaderMap = BTreeMap<String, FieldValue>;

/// Value stored for a single response header.
///
/// Most headers hold one string. `set-cookie` holds an ordered list so each
/// cookie stays a separate field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    /// A single (possibly separator-joined) value
    Single(String),
    /// An ordered list of values, one per field line
    Multiple(Vec<String>),
}

impl FieldValue {
    /// The value as a string slice, if this is a single value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Single(value) => Some(value),
            FieldValue::Multiple(_) => None,
        }
    }

    /// All values as a list of string slices.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::Single(value) => vec![value.as_str()],
            FieldValue::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Single(value) => f.write_str(value),
            FieldValue::Multiple(values) => f.write_str(&values.join(", ")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Single(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Single(value)
    }
}

/// Policy for merging a header value into an existing header map.
///
/// Deserializes from the JSON shape `{ "append", "separator", "override",
/// "duplicate" }`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderOptions {
    /// Join onto an existing value instead of replacing it
    pub append: bool,
    /// Joiner used in append mode
    pub separator: String,
    /// When `false`, an existing value is never touched
    #[serde(rename = "override")]
    pub override_existing: bool,
    /// When `false`, appending a token already present is a no-op
    pub duplicate: bool,
}

impl Default for HeaderOptions {
    fn default() -> Self {
        Self {
            append: false,
            separator: ",".to_string(),
            override_existing: true,
            duplicate: true,
        }
    }
}

impl HeaderOptions {
    /// Append mode with the default separator.
    #[must_use]
    pub fn append() -> Self {
        Self {
            append: true,
            ..Self::default()
        }
    }

    /// Use a custom separator.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Leave existing values untouched.
    #[must_use]
    pub fn without_override(mut self) -> Self {
        self.override_existing = false;
        self
    }

    /// Skip appending a token that is already present.
    #[must_use]
    pub fn without_duplicates(mut self) -> Self {
        self.duplicate = false;
        self
    }

    /// Reject option combinations the composer cannot resolve.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Assertion`] when append mode is requested with
    /// an empty separator.
    pub fn validate(&self) -> Result<()> {
        if self.append && self.separator.is_empty() {
            return Err(HarnessError::Assertion(
                "header append requires a non-empty separator".to_string(),
            ));
        }
        Ok(())
    }
}

/// Merge `value` into `headers` under `name` following `options`.
///
/// The name is lower-cased. `vary` is routed to [`apply_vary`] and the
/// caller's options are ignored for it.
///
/// # Errors
///
/// Returns [`HarnessError::Assertion`] if `options` fail
/// [`HeaderOptions::validate`].
///
/// # Examples
///
/// ```
/// use route_harness::protocol::{set_header, FieldValue, HeaderMap, HeaderOptions};
///
/// let mut headers = HeaderMap::new();
/// set_header(&mut headers, "Set-Cookie", "a=1", &HeaderOptions::default()).unwrap();
/// set_header(&mut headers, "set-cookie", "b=2", &HeaderOptions::append()).unwrap();
///
/// assert_eq!(
///     headers["set-cookie"],
///     FieldValue::Multiple(vec!["a=1".into(), "b=2".into()])
/// );
/// ```
pub fn set_header(
    headers: &mut HeaderMap,
    name: &str,
    value: impl Into<String>,
    options: &HeaderOptions,
) -> Result<()> {
    options.validate()?;

    let key = name.to_ascii_lowercase();
    if key == names::VARY {
        apply_vary(headers, value);
    } else {
        compose(headers, key, value.into(), options);
    }
    Ok(())
}

/// Apply the `vary` rule.
///
/// `*` replaces whatever is present and can never be narrowed afterwards.
/// Any other value is appended once, without duplicates.
pub fn apply_vary(headers: &mut HeaderMap, value: impl Into<String>) {
    let value = value.into();

    let absorbed = match headers.get(names::VARY) {
        Some(existing) => existing.as_str() == Some("*"),
        None => false,
    };

    if value == "*" {
        headers.insert(names::VARY.to_string(), FieldValue::Single(value));
    } else if absorbed {
        tracing::trace!(value = %value, "vary is '*', ignoring narrower value");
    } else {
        compose(
            headers,
            names::VARY.to_string(),
            value,
            &HeaderOptions::append().without_duplicates(),
        );
    }
}

/// The composition decision table. `key` must already be lower-cased and
/// `options` already validated.
pub(crate) fn compose(headers: &mut HeaderMap, key: String, value: String, options: &HeaderOptions) {
    let replace = !options.append && options.override_existing;
    if replace || !headers.contains_key(&key) {
        headers.insert(key, FieldValue::Single(value));
        return;
    }

    if !options.override_existing {
        tracing::trace!(header = %key, "existing header kept");
        return;
    }

    let Some(existing) = headers.get_mut(&key) else {
        return;
    };

    if key == names::SET_COOKIE {
        match existing {
            FieldValue::Multiple(values) => values.push(value),
            FieldValue::Single(first) => {
                let first = std::mem::take(first);
                *existing = FieldValue::Multiple(vec![first, value]);
            }
        }
        return;
    }

    let joined = match existing {
        FieldValue::Single(current) => current.clone(),
        FieldValue::Multiple(values) => values.join(&options.separator),
    };

    if !options.duplicate && joined.split(options.separator.as_str()).any(|token| token == value) {
        tracing::trace!(header = %key, value = %value, "duplicate header token skipped");
        return;
    }

    *existing = FieldValue::Single(format!("{}{}{}", joined, options.separator, value));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(headers: &HeaderMap, name: &str) -> Option<String> {
        headers.get(name).and_then(|v| v.as_str()).map(str::to_string)
    }

    #[test]
    fn test_set_replaces_by_default() {
        let mut headers = HeaderMap::new();
        set_header(&mut headers, "X-Test", "one", &HeaderOptions::default()).unwrap();
        set_header(&mut headers, "x-test", "two", &HeaderOptions::default()).unwrap();
        assert_eq!(single(&headers, "x-test").as_deref(), Some("two"));
    }

    #[test]
    fn test_name_is_lowercased() {
        let mut headers = HeaderMap::new();
        set_header(&mut headers, "X-UPPER", "v", &HeaderOptions::default()).unwrap();
        assert!(headers.contains_key("x-upper"));
        assert!(!headers.contains_key("X-UPPER"));
    }

    #[test]
    fn test_append_with_separator() {
        let mut headers = HeaderMap::new();
        set_header(&mut headers, "x-list", "a", &HeaderOptions::default()).unwrap();
        let options = HeaderOptions::append().with_separator(";");
        set_header(&mut headers, "x-list", "b", &options).unwrap();
        assert_eq!(single(&headers, "x-list").as_deref(), Some("a;b"));
    }

    #[test]
    fn test_append_without_existing_sets() {
        let mut headers = HeaderMap::new();
        set_header(&mut headers, "x-list", "a", &HeaderOptions::append()).unwrap();
        assert_eq!(single(&headers, "x-list").as_deref(), Some("a"));
    }

    #[test]
    fn test_append_duplicates_by_default() {
        let mut headers = HeaderMap::new();
        set_header(&mut headers, "x-list", "a", &HeaderOptions::append()).unwrap();
        set_header(&mut headers, "x-list", "a", &HeaderOptions::append()).unwrap();
        assert_eq!(single(&headers, "x-list").as_deref(), Some("a,a"));
    }

    #[test]
    fn test_append_without_duplicates_is_idempotent() {
        let options = HeaderOptions::append().without_duplicates();
        let mut once = HeaderMap::new();
        set_header(&mut once, "x-list", "a", &HeaderOptions::default()).unwrap();
        set_header(&mut once, "x-list", "b", &options).unwrap();

        let mut twice = once.clone();
        set_header(&mut twice, "x-list", "b", &options).unwrap();

        assert_eq!(once, twice);
        assert_eq!(single(&twice, "x-list").as_deref(), Some("a,b"));
    }

    #[test]
    fn test_no_override_keeps_existing() {
        let mut headers = HeaderMap::new();
        set_header(&mut headers, "x-keep", "first", &HeaderOptions::default()).unwrap();
        let options = HeaderOptions::default().without_override();
        set_header(&mut headers, "x-keep", "second", &options).unwrap();
        let appending = HeaderOptions::append().without_override();
        set_header(&mut headers, "x-keep", "fourth", &appending).unwrap();
        assert_eq!(single(&headers, "x-keep").as_deref(), Some("first"));
    }

    #[test]
    fn test_no_override_sets_when_absent() {
        let mut headers = HeaderMap::new();
        let options = HeaderOptions::default().without_override();
        set_header(&mut headers, "x-new", "value", &options).unwrap();
        assert_eq!(single(&headers, "x-new").as_deref(), Some("value"));
    }

    #[test]
    fn test_set_cookie_accumulates_list() {
        let mut headers = HeaderMap::new();
        set_header(&mut headers, "set-cookie", "a=1", &HeaderOptions::append()).unwrap();
        set_header(&mut headers, "set-cookie", "b=2", &HeaderOptions::append()).unwrap();
        set_header(&mut headers, "set-cookie", "c=3", &HeaderOptions::append()).unwrap();
        assert_eq!(headers["set-cookie"].values(), vec!["a=1", "b=2", "c=3"]);
    }

    #[test]
    fn test_set_cookie_replace_without_append() {
        let mut headers = HeaderMap::new();
        set_header(&mut headers, "set-cookie", "a=1", &HeaderOptions::append()).unwrap();
        set_header(&mut headers, "set-cookie", "b=2", &HeaderOptions::append()).unwrap();
        set_header(&mut headers, "set-cookie", "c=3", &HeaderOptions::default()).unwrap();
        assert_eq!(headers["set-cookie"], FieldValue::Single("c=3".into()));
    }

    #[test]
    fn test_vary_ignores_caller_options() {
        let mut headers = HeaderMap::new();
        set_header(&mut headers, "Vary", "accept", &HeaderOptions::default()).unwrap();
        set_header(&mut headers, "vary", "origin", &HeaderOptions::default()).unwrap();
        set_header(&mut headers, "vary", "origin", &HeaderOptions::append()).unwrap();
        assert_eq!(single(&headers, "vary").as_deref(), Some("accept,origin"));
    }

    #[test]
    fn test_vary_star_is_absorbing() {
        let mut headers = HeaderMap::new();
        apply_vary(&mut headers, "accept");
        apply_vary(&mut headers, "*");
        apply_vary(&mut headers, "origin");
        apply_vary(&mut headers, "accept-encoding");
        assert_eq!(single(&headers, "vary").as_deref(), Some("*"));
    }

    #[test]
    fn test_empty_separator_is_rejected() {
        let mut headers = HeaderMap::new();
        let options = HeaderOptions::append().with_separator("");
        let result = set_header(&mut headers, "x-list", "a", &options);
        assert!(matches!(result, Err(HarnessError::Assertion(_))));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_options_from_json() {
        let options: HeaderOptions =
            serde_json::from_str(r#"{"append": true, "override": false}"#).unwrap();
        assert!(options.append);
        assert!(!options.override_existing);
        assert!(options.duplicate);
        assert_eq!(options.separator, ",");
    }

    #[test]
    fn test_field_value_display() {
        let value = FieldValue::Multiple(vec!["a=1".into(), "b=2".into()]);
        assert_eq!(value.to_string(), "a=1, b=2");
        assert_eq!(value.as_str(), None);
    }
}
