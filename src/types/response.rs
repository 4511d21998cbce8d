//! In-memory representation of a reply that has not been transmitted.
//!
//! A [`Response`] records the status code, the composed headers, the raw
//! source the handler replied with and its [`Variety`], plus free-form
//! settings (charset, encoding, ttl, message, stringify hints) that a real
//! transmitter would apply. Nothing here serializes a body.
//!
//! # Default Content Type
//!
//! | Source | Variety | `content-type` |
//! |--------|---------|----------------|
//! | binary buffer | `buffer` | `application/octet-stream` |
//! | byte stream | `stream` | none |
//! | deferred value | `promise` | none |
//! | text | `plain` | `text/html` |
//! | other value | `plain` | `application/json` |
//! | nothing | `plain` | none |
//!
//! # Examples
//!
//! ```
//! use route_harness::{Request, RequestOptions, Response, Variety};
//!
//! let request = Request::from_options(&RequestOptions::default()).unwrap();
//! let mut response = Response::new(vec![0u8, 1, 2], &request);
//! response.code(202).header("X-Request-Id", "r1");
//!
//! assert_eq!(response.variety(), Variety::Buffer);
//! assert_eq!(response.status_code(), 202);
//! assert_eq!(response.header_str("content-type"), Some("application/octet-stream"));
//! assert_eq!(response.header_str("x-request-id"), Some("r1"));
//! ```

use crate::error::{HarnessError, Result};
use crate::protocol::headers::{self, names, FieldValue, HeaderMap, HeaderOptions};
use crate::types::redirect::Redirect;
use crate::types::request::{Request, RequestInner, StateOptions};
use crate::types::source::{Source, Variety};
use http::Method;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Weak};

/// Serialization replacer hint.
#[derive(Clone)]
pub enum Replacer {
    /// Keep only these keys
    Keys(Vec<String>),
    /// Map each key/value pair; `None` drops the pair
    Function(Arc<dyn Fn(&str, &Value) -> Option<Value> + Send + Sync>),
}

impl fmt::Debug for Replacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Replacer::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            Replacer::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Stringify hints for plain sources. Stored, never applied here.
#[derive(Clone, Debug, Default)]
pub struct StringifyOptions {
    /// Key filter or mapper
    pub replacer: Option<Replacer>,
    /// Indentation width
    pub space: Option<usize>,
    /// Text appended after serialization
    pub suffix: Option<String>,
}

/// Free-form transmission settings.
#[derive(Clone, Debug, Default)]
pub struct ResponseSettings {
    /// Body charset
    pub charset: Option<String>,
    /// Body encoding
    pub encoding: Option<String>,
    /// Custom status message
    pub message: Option<String>,
    /// Client cache ttl in milliseconds
    pub ttl: Option<u64>,
    /// Whether the etag should vary with content encoding
    pub vary_etag: bool,
    /// Stringify hints
    pub stringify: Option<StringifyOptions>,
}

/// Options for [`Response::etag`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EtagOptions {
    /// Emit a weak validator (`W/` prefix)
    pub weak: bool,
    /// Vary the etag with content encoding; defaults to `true`
    pub vary: Option<bool>,
}

/// A synthesized, not-yet-transmitted response.
pub struct Response {
    status_code: u16,
    headers: HeaderMap,
    source: Source,
    variety: Variety,
    settings: ResponseSettings,
    redirect: bool,
    request: Weak<RequestInner>,
}

impl Response {
    /// Build a response for `request` from a reply source.
    ///
    /// Classifies the source and applies the default content type for its
    /// variety.
    pub fn new(source: impl Into<Source>, request: &Request) -> Self {
        Self::build(source.into(), request.downgrade())
    }

    fn build(source: Source, request: Weak<RequestInner>) -> Self {
        let variety = source.variety();
        let mut response = Response {
            status_code: 200,
            headers: HeaderMap::new(),
            source,
            variety,
            settings: ResponseSettings::default(),
            redirect: false,
            request,
        };

        let content_type = match (&response.source, variety) {
            (_, Variety::Buffer) => Some("application/octet-stream"),
            (Source::Null, _) => None,
            (Source::Text(_), Variety::Plain) => Some("text/html"),
            (_, Variety::Plain) => Some("application/json"),
            _ => None,
        };
        if let Some(content_type) = content_type {
            response.content_type(content_type);
        }

        response
    }

    pub(crate) fn build_redirect(uri: &str, request: Weak<RequestInner>) -> Self {
        let mut response = Self::build(Source::Text(uri.to_string()), request);
        response.location(uri).code(302);
        response.redirect = true;
        response
    }

    /// HTTP status code.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// All composed headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header by name (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&FieldValue> {
        self.headers.get(&name.to_ascii_lowercase())
    }

    /// A single-valued header by name (case-insensitive).
    #[must_use]
    pub fn header_str(&self, name: &str) -> Option<&str> {
        self.header_value(name).and_then(FieldValue::as_str)
    }

    /// The raw reply source.
    #[must_use]
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Take the reply source, e.g. to await a deferred value.
    #[must_use]
    pub fn into_source(self) -> Source {
        self.source
    }

    /// Classification of the source.
    #[must_use]
    pub fn variety(&self) -> Variety {
        self.variety
    }

    /// Transmission settings.
    #[must_use]
    pub fn settings(&self) -> &ResponseSettings {
        &self.settings
    }

    /// The request this response was built for, if it is still alive.
    #[must_use]
    pub fn request(&self) -> Option<Request> {
        Request::upgrade(&self.request)
    }

    /// Whether this response is a redirect.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.redirect
    }

    /// View this response as a redirect, if it is one.
    pub fn as_redirect(&mut self) -> Option<Redirect<'_>> {
        if self.redirect {
            Some(Redirect::new(self))
        } else {
            None
        }
    }

    /// Set the status code.
    pub fn code(&mut self, status_code: u16) -> &mut Self {
        self.status_code = status_code;
        self
    }

    /// Set a header with the default policy (replace).
    ///
    /// `vary` is routed to the vary rule.
    pub fn header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let key = name.to_ascii_lowercase();
        if key == names::VARY {
            return self.vary(value);
        }
        headers::compose(&mut self.headers, key, value.into(), &HeaderOptions::default());
        self
    }

    /// Set a header with an explicit policy.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Assertion`] for options the composer cannot
    /// resolve.
    pub fn header_with(
        &mut self,
        name: &str,
        value: impl Into<String>,
        options: &HeaderOptions,
    ) -> Result<&mut Self> {
        headers::set_header(&mut self.headers, name, value, options)?;
        Ok(self)
    }

    /// Add a value to `vary`; `*` absorbs everything.
    pub fn vary(&mut self, value: impl Into<String>) -> &mut Self {
        headers::apply_vary(&mut self.headers, value);
        self
    }

    /// Set `content-length`.
    pub fn bytes(&mut self, length: usize) -> &mut Self {
        self.set_raw(names::CONTENT_LENGTH, length.to_string())
    }

    /// Set the body charset; an empty charset clears it.
    pub fn charset(&mut self, charset: &str) -> &mut Self {
        self.settings.charset = (!charset.is_empty()).then(|| charset.to_string());
        self
    }

    /// Set the body encoding.
    pub fn encoding(&mut self, encoding: &str) -> &mut Self {
        self.settings.encoding = Some(encoding.to_string());
        self
    }

    /// Set a custom status message.
    pub fn message(&mut self, message: &str) -> &mut Self {
        self.settings.message = Some(message.to_string());
        self
    }

    /// Set the client cache ttl in milliseconds.
    pub fn ttl(&mut self, msec: u64) -> &mut Self {
        self.settings.ttl = Some(msec);
        self
    }

    /// Set `content-type`.
    pub fn content_type(&mut self, mime_type: &str) -> &mut Self {
        self.set_raw(names::CONTENT_TYPE, mime_type.to_string())
    }

    /// Set `location`.
    pub fn location(&mut self, uri: &str) -> &mut Self {
        self.set_raw(names::LOCATION, uri.to_string())
    }

    /// Set a quoted `etag`, weak when requested.
    pub fn etag(&mut self, tag: &str, options: EtagOptions) -> &mut Self {
        let prefix = if options.weak { "W/" } else { "" };
        self.set_raw(names::ETAG, format!("{}\"{}\"", prefix, tag));
        self.settings.vary_etag = options.vary != Some(false) && !options.weak;
        self
    }

    /// Set the json replacer hint.
    pub fn replacer(&mut self, replacer: Replacer) -> &mut Self {
        self.stringify().replacer = Some(replacer);
        self
    }

    /// Set the json indentation hint.
    pub fn spaces(&mut self, count: usize) -> &mut Self {
        self.stringify().space = Some(count);
        self
    }

    /// Set the json suffix hint.
    pub fn suffix(&mut self, suffix: &str) -> &mut Self {
        self.stringify().suffix = Some(suffix.to_string());
        self
    }

    /// Set a cookie on the owning request.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidOperation`] if the response is not bound
    /// to a live request or `options.auto_value` is set.
    pub fn state(
        &mut self,
        name: &str,
        value: impl Into<Value>,
        options: Option<StateOptions>,
    ) -> Result<&mut Self> {
        self.bound_request()?.set_state(name, value, options)?;
        Ok(self)
    }

    /// Clear a cookie on the owning request.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidOperation`] if the response is not bound
    /// to a live request.
    pub fn unstate(&mut self, name: &str, options: Option<StateOptions>) -> Result<&mut Self> {
        self.bound_request()?.clear_state(name, options);
        Ok(self)
    }

    /// Mark a resource as created at `uri` (201 + `location`).
    ///
    /// Only POST and PUT requests may create resources.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidOperation`] for any other method, or if
    /// the response is not bound to a live request.
    pub fn created(&mut self, uri: &str) -> Result<&mut Self> {
        let request = self.bound_request()?;
        let method = request.method();

        if *method != Method::POST && *method != Method::PUT {
            tracing::debug!(method = %method, "created() rejected");
            return Err(HarnessError::InvalidOperation(format!(
                "cannot create resource on {}",
                method
            )));
        }

        self.status_code = 201;
        Ok(self.location(uri))
    }

    /// Replace this response with a redirect to `uri` bound to the same
    /// request.
    pub fn redirect(&mut self, uri: &str) -> Redirect<'_> {
        *self = Response::build_redirect(uri, self.request.clone());
        Redirect::new(self)
    }

    fn set_raw(&mut self, key: &str, value: String) -> &mut Self {
        headers::compose(&mut self.headers, key.to_string(), value, &HeaderOptions::default());
        self
    }

    fn stringify(&mut self) -> &mut StringifyOptions {
        self.settings.stringify.get_or_insert_with(StringifyOptions::default)
    }

    fn bound_request(&self) -> Result<Request> {
        self.request().ok_or_else(|| {
            HarnessError::InvalidOperation("response is not bound to a live request".to_string())
        })
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status_code", &self.status_code)
            .field("headers", &self.headers)
            .field("source", &self.source)
            .field("variety", &self.variety)
            .field("settings", &self.settings)
            .field("redirect", &self.redirect)
            .finish_non_exhaustive()
    }
}
