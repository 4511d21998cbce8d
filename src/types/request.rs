//! Synthesized inbound request.
//!
//! A [`Request`] is built fresh for every injection from a flat
//! [`RequestOptions`] record, with defaults coalesced from the route the
//! session was created for. It is a cheap-to-clone handle: the handler, the
//! reply protocol and any response built for it all refer to the same
//! request. Only the cookie jar (`set_state` / `clear_state`) and the bound
//! response slot are mutable.
//!
//! # Examples
//!
//! ```
//! use route_harness::{Request, RequestOptions};
//! use std::collections::BTreeMap;
//!
//! let mut headers = BTreeMap::new();
//! headers.insert("Content-Type".to_string(), "text/plain".to_string());
//!
//! let request = Request::from_options(&RequestOptions {
//!     headers: Some(headers),
//!     url: Some("/items?page=2".to_string()),
//!     ..Default::default()
//! })
//! .unwrap();
//!
//! assert_eq!(request.header("content-type"), Some("text/plain"));
//! assert_eq!(request.mime(), "text/plain");
//! assert_eq!(request.query().get("page").map(String::as_str), Some("2"));
//! ```

use crate::error::{HarnessError, Result};
use crate::protocol::headers::names;
use crate::types::Response;
use http::Method;
use parking_lot::{ReentrantMutex, RwLock};
use serde::Deserialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::SystemTime;

/// Methods a route (and a synthesized request) may use.
pub const ALLOWED_METHODS: [&str; 9] = [
    "get", "head", "put", "post", "patch", "delete", "trace", "options", "connect",
];

/// Parse a method name against [`ALLOWED_METHODS`], case-insensitively.
pub(crate) fn parse_method(value: &str) -> Result<Method> {
    let lower = value.to_ascii_lowercase();
    if !ALLOWED_METHODS.contains(&lower.as_str()) {
        return Err(HarnessError::Config(format!(
            "method must be one of {}, got '{}'",
            ALLOWED_METHODS.join(", "),
            value
        )));
    }

    Method::from_bytes(lower.to_ascii_uppercase().as_bytes())
        .map_err(|e| HarnessError::Config(format!("invalid method '{}': {}", value, e)))
}

/// Flat record of request fields, all optional.
///
/// Unknown keys are rejected when deserializing, which is how malformed
/// request overrides are caught before a handler runs.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct RequestOptions {
    /// Request identifier; a random UUID when omitted
    pub id: Option<String>,
    /// Authentication record, opaque to the harness
    pub auth: Option<Value>,
    /// Inbound headers; names are lower-cased on build
    pub headers: Option<BTreeMap<String, String>>,
    /// Host the request was addressed to
    pub host: Option<String>,
    /// Request method; defaults to the route's method
    pub method: Option<String>,
    /// Path parameters
    pub params: Option<BTreeMap<String, String>>,
    /// Parsed payload
    pub payload: Option<Value>,
    /// Port the request was addressed to
    pub port: Option<u16>,
    /// Query parameters; derived from `url` when omitted
    pub query: Option<BTreeMap<String, String>>,
    /// Inbound cookies, name to value
    pub state: Option<BTreeMap<String, Value>>,
    /// Request url (path and query)
    pub url: Option<String>,
    /// Request path; derived from `url`, then the route path, when omitted
    pub path: Option<String>,
    /// Client address
    pub remote_address: Option<String>,
    /// Client port
    pub remote_port: Option<u16>,
    /// Matched route descriptor
    pub route: Option<RouteDescriptor>,
}

impl RequestOptions {
    /// Build request options from the head of a real `http` request.
    ///
    /// Header names are lower-cased and values that are not visible ASCII are
    /// skipped. The query string is decoded into `query`.
    #[must_use]
    pub fn from_parts(parts: &http::request::Parts) -> Self {
        let mut headers = BTreeMap::new();
        for (name, value) in parts.headers.iter() {
            if let Ok(value_str) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), value_str.to_string());
            }
        }

        let url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        RequestOptions {
            headers: Some(headers),
            host: parts.uri.host().map(str::to_string),
            method: Some(parts.method.as_str().to_ascii_lowercase()),
            port: parts.uri.port_u16(),
            path: Some(parts.uri.path().to_string()),
            query: parts.uri.query().map(parse_query),
            url: Some(url),
            ..Default::default()
        }
    }
}

/// Route fields of [`RequestOptions`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouteDescriptor {
    /// Route method
    pub method: Option<String>,
    /// Route path template
    pub path: Option<String>,
    /// Virtual host the route is bound to
    pub vhost: Option<String>,
    /// Route fingerprint; defaults to the route path
    pub fingerprint: Option<String>,
    /// Auth access predicate; defaults to always-allow
    #[serde(skip)]
    pub access: Option<AccessCheck>,
}

/// Auth access predicate attached to a route.
#[derive(Clone)]
pub struct AccessCheck(Arc<dyn Fn(&Request) -> bool + Send + Sync>);

impl AccessCheck {
    /// Wrap a predicate.
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        AccessCheck(Arc::new(check))
    }

    /// A predicate that grants every request.
    #[must_use]
    pub fn allow_all() -> Self {
        AccessCheck::new(|_| true)
    }

    /// Evaluate the predicate.
    #[must_use]
    pub fn access(&self, request: &Request) -> bool {
        (self.0)(request)
    }
}

impl fmt::Debug for AccessCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessCheck(..)")
    }
}

/// Resolved route of a request.
#[derive(Clone, Debug)]
pub struct RouteInfo {
    /// Route method
    pub method: Method,
    /// Route path template
    pub path: String,
    /// Virtual host, if any
    pub vhost: Option<String>,
    /// Route fingerprint
    pub fingerprint: String,
    /// Auth access predicate
    pub auth: AccessCheck,
}

/// Connection details derived from headers and options.
#[derive(Clone, Debug)]
pub struct RequestInfo {
    /// `accept-encoding` header, or empty
    pub accept_encoding: String,
    /// Whether an `origin` header was sent
    pub cors_origin_match: bool,
    /// `host` header, or empty
    pub host: String,
    /// Host without port
    pub hostname: String,
    /// `referrer` / `referer` header, or empty
    pub referrer: String,
    /// Client address, or empty
    pub remote_address: String,
    /// Client port
    pub remote_port: u16,
    /// When the request was synthesized
    pub received: SystemTime,
}

/// Options attached to a cookie in the jar.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct StateOptions {
    /// Time to live in milliseconds; `0` expires the cookie
    pub ttl: Option<u64>,
    /// Cookie path
    pub path: Option<String>,
    /// Cookie domain
    pub domain: Option<String>,
    /// `Secure` attribute
    pub is_secure: Option<bool>,
    /// `HttpOnly` attribute
    pub is_http_only: Option<bool>,
    /// `SameSite` attribute
    pub is_same_site: Option<String>,
    /// Value encoding
    pub encoding: Option<String>,
    /// Reserved for downstream state serialization; rejected by `set_state`
    pub auto_value: Option<Value>,
}

/// A cookie in the request's jar.
#[derive(Clone, Debug, PartialEq)]
pub struct StateEntry {
    /// Cookie name
    pub name: String,
    /// Cookie value; `None` once cleared
    pub value: Option<Value>,
    /// Cookie options, if any were given
    pub options: Option<StateOptions>,
}

pub(crate) struct RequestInner {
    id: String,
    method: Method,
    path: String,
    url: String,
    headers: BTreeMap<String, String>,
    query: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
    payload: Option<Value>,
    auth: Value,
    mime: String,
    info: RequestInfo,
    route: RouteInfo,
    state: RwLock<BTreeMap<String, StateEntry>>,
    response: ReentrantMutex<RefCell<Option<Response>>>,
}

/// Handle to a synthesized request.
///
/// Clones share the same request; equality is identity.
#[derive(Clone)]
pub struct Request {
    inner: Arc<RequestInner>,
}

impl Request {
    /// Build a request from options, defaulting to `GET /`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] if the method is not allowed.
    pub fn from_options(options: &RequestOptions) -> Result<Self> {
        Self::for_route(options, &Method::GET, "/")
    }

    /// Build a request from options, defaulting to the given route.
    pub(crate) fn for_route(
        options: &RequestOptions,
        route_method: &Method,
        route_path: &str,
    ) -> Result<Self> {
        let headers: BTreeMap<String, String> = options
            .headers
            .iter()
            .flatten()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();

        let method = match &options.method {
            Some(method) => parse_method(method)?,
            None => route_method.clone(),
        };

        let url = options.url.clone().unwrap_or_default();
        let (url_path, url_query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url.as_str(), None),
        };

        let path = options
            .path
            .clone()
            .or_else(|| (!url_path.is_empty()).then(|| url_path.to_string()))
            .unwrap_or_else(|| route_path.to_string());

        let query = match (&options.query, url_query) {
            (Some(query), _) => query.clone(),
            (None, Some(query)) => parse_query(query),
            (None, None) => BTreeMap::new(),
        };

        let state = options
            .state
            .iter()
            .flatten()
            .map(|(name, value)| {
                let entry = StateEntry {
                    name: name.clone(),
                    value: Some(value.clone()),
                    options: None,
                };
                (name.clone(), entry)
            })
            .collect();

        let route = build_route(options.route.as_ref(), route_method, route_path)?;
        let info = build_info(&headers, options);
        let mime = headers
            .get(names::CONTENT_TYPE)
            .cloned()
            .unwrap_or_else(|| "application/json".to_string());

        Ok(Request {
            inner: Arc::new(RequestInner {
                id: options
                    .id
                    .clone()
                    .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                method,
                path,
                url,
                headers,
                query,
                params: options.params.clone().unwrap_or_default(),
                payload: options.payload.clone(),
                auth: options.auth.clone().unwrap_or(Value::Object(Default::default())),
                mime,
                info,
                route,
                state: RwLock::new(state),
                response: ReentrantMutex::new(RefCell::new(None)),
            }),
        })
    }

    /// Whether two handles refer to the same request.
    #[inline]
    #[must_use]
    pub fn ptr_eq(a: &Request, b: &Request) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<RequestInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<RequestInner>) -> Option<Request> {
        weak.upgrade().map(|inner| Request { inner })
    }

    /// Request identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// Request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Request url as given, or empty.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// All inbound headers, names lower-cased.
    #[must_use]
    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.inner.headers
    }

    /// A single inbound header by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner
            .headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Query parameters.
    #[must_use]
    pub fn query(&self) -> &BTreeMap<String, String> {
        &self.inner.query
    }

    /// Path parameters.
    #[must_use]
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.inner.params
    }

    /// Parsed payload, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.inner.payload.as_ref()
    }

    /// Authentication record.
    #[must_use]
    pub fn auth(&self) -> &Value {
        &self.inner.auth
    }

    /// Request content type, or `application/json`.
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.inner.mime
    }

    /// Connection details.
    #[must_use]
    pub fn info(&self) -> &RequestInfo {
        &self.inner.info
    }

    /// Matched route.
    #[must_use]
    pub fn route(&self) -> &RouteInfo {
        &self.inner.route
    }

    /// A cookie from the jar.
    #[must_use]
    pub fn state(&self, name: &str) -> Option<StateEntry> {
        self.inner.state.read().get(name).cloned()
    }

    /// Copy of the whole cookie jar.
    #[must_use]
    pub fn states(&self) -> BTreeMap<String, StateEntry> {
        self.inner.state.read().clone()
    }

    /// Set a cookie in the jar.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidOperation`] if `options.auto_value` is
    /// set to a truthy value.
    pub fn set_state(
        &self,
        name: &str,
        value: impl Into<Value>,
        options: Option<StateOptions>,
    ) -> Result<()> {
        if let Some(auto_value) = options.as_ref().and_then(|o| o.auto_value.as_ref()) {
            if is_truthy(auto_value) {
                return Err(HarnessError::InvalidOperation(
                    "cannot set autoValue directly in a response".to_string(),
                ));
            }
        }

        let entry = StateEntry {
            name: name.to_string(),
            value: Some(value.into()),
            options,
        };
        self.inner.state.write().insert(name.to_string(), entry);
        Ok(())
    }

    /// Clear a cookie, forcing its ttl to zero.
    pub fn clear_state(&self, name: &str, options: Option<StateOptions>) {
        let mut options = options.unwrap_or_default();
        options.ttl = Some(0);

        let entry = StateEntry {
            name: name.to_string(),
            value: None,
            options: Some(options),
        };
        self.inner.state.write().insert(name.to_string(), entry);
    }

    /// Read the response bound to this request, if the handler produced one.
    ///
    /// The slot is locked only while `f` runs. Reads nest on one thread, so
    /// a session view and a request view can be open at the same time.
    pub fn with_response<R>(&self, f: impl FnOnce(&Response) -> R) -> Option<R> {
        let slot = self.inner.response.lock();
        let bound = slot.borrow();
        bound.as_ref().map(f)
    }

    /// Whether a response is bound to this request.
    #[must_use]
    pub fn has_response(&self) -> bool {
        self.inner.response.lock().borrow().is_some()
    }

    pub(crate) fn bind_response(&self, response: Option<Response>) {
        let slot = self.inner.response.lock();
        match slot.try_borrow_mut() {
            Ok(mut bound) => *bound = response,
            Err(_) => tracing::warn!(request_id = %self.inner.id, "response slot busy, not bound"),
        };
    }

    /// Take the bound response; `None` while a read on this thread is open.
    pub(crate) fn take_response(&self) -> Option<Response> {
        let slot = self.inner.response.lock();
        let taken = slot.try_borrow_mut().ok()?.take();
        taken
    }
}

impl PartialEq for Request {
    fn eq(&self, other: &Self) -> bool {
        Request::ptr_eq(self, other)
    }
}

impl Eq for Request {}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.inner.id)
            .field("method", &self.inner.method)
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

fn build_route(
    descriptor: Option<&RouteDescriptor>,
    route_method: &Method,
    route_path: &str,
) -> Result<RouteInfo> {
    let descriptor = descriptor.cloned().unwrap_or_default();

    let method = match &descriptor.method {
        Some(method) => parse_method(method)?,
        None => route_method.clone(),
    };
    let path = descriptor.path.unwrap_or_else(|| route_path.to_string());

    Ok(RouteInfo {
        method,
        fingerprint: descriptor.fingerprint.unwrap_or_else(|| path.clone()),
        path,
        vhost: descriptor.vhost,
        auth: descriptor.access.unwrap_or_else(AccessCheck::allow_all),
    })
}

fn build_info(headers: &BTreeMap<String, String>, options: &RequestOptions) -> RequestInfo {
    let header = |name: &str| headers.get(name).cloned();

    let host = header(names::HOST)
        .or_else(|| options.host.clone())
        .unwrap_or_default();
    let hostname = host.split(':').next().unwrap_or_default().to_string();

    RequestInfo {
        accept_encoding: header(names::ACCEPT_ENCODING).unwrap_or_default(),
        cors_origin_match: headers.contains_key(names::ORIGIN),
        host,
        hostname,
        referrer: header(names::REFERRER)
            .or_else(|| header(names::REFERER))
            .unwrap_or_default(),
        remote_address: options.remote_address.clone().unwrap_or_default(),
        remote_port: options.remote_port.unwrap_or(80),
        received: SystemTime::now(),
    }
}

fn parse_query(query: &str) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
