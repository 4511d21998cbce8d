//! Session construction and injection options.
//!
//! Options are plain `serde` records. Unknown keys are rejected during
//! decoding and [`RouteOptions::validate`] checks the rest, so malformed
//! configuration never reaches a handler.
//!
//! # Examples
//!
//! ```
//! use route_harness::server::{InjectOptions, RouteOptions};
//!
//! let route = RouteOptions::from_json(r#"{ "path": "/items", "method": "post" }"#).unwrap();
//! assert_eq!(route.path, "/items");
//!
//! let inject = InjectOptions::from_json(r#"{ "request": { "headers": { "x-a": "1" } } }"#).unwrap();
//! assert!(inject.request.is_some());
//!
//! assert!(RouteOptions::from_json(r#"{ "method": "get" }"#).is_err());
//! ```

use crate::error::{HarnessError, Result};
use crate::types::request::{parse_method, RequestOptions};
use http::Method;
use serde::Deserialize;
use serde_json::Value;

/// Route a session is created for.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteOptions {
    /// Route path; must start with `/`
    pub path: String,
    /// Route method, one of the allowed methods (case-insensitive)
    pub method: String,
    /// Request fields used for every injection until replaced
    #[serde(default)]
    pub request: Option<RequestOptions>,
}

impl RouteOptions {
    /// Route options without request overrides.
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        RouteOptions {
            path: path.into(),
            method: method.into(),
            request: None,
        }
    }

    /// Attach request overrides.
    #[must_use]
    pub fn with_request(mut self, request: RequestOptions) -> Self {
        self.request = Some(request);
        self
    }

    /// Decode from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Json`] for malformed or unknown fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Decode from a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Json`] for malformed or unknown fields.
    pub fn from_value(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Check the path and method, returning the parsed method.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] for an empty or relative path or a
    /// method outside the allowed set.
    pub fn validate(&self) -> Result<Method> {
        if self.path.is_empty() {
            return Err(HarnessError::Config("path is required".to_string()));
        }
        if !self.path.starts_with('/') {
            return Err(HarnessError::Config(format!(
                "path must start with '/', got '{}'",
                self.path
            )));
        }
        parse_method(&self.method)
    }
}

/// Options for a single injection.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InjectOptions {
    /// Replacement request fields; persisted for later injections
    pub request: Option<RequestOptions>,
}

impl InjectOptions {
    /// Injection with replacement request fields.
    #[must_use]
    pub fn with_request(request: RequestOptions) -> Self {
        InjectOptions {
            request: Some(request),
        }
    }

    /// Decode from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Json`] for malformed or unknown fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_route() {
        let route = RouteOptions::new("GET", "/path");
        assert_eq!(route.validate().unwrap(), Method::GET);
    }

    #[test]
    fn test_missing_path_rejected() {
        assert!(RouteOptions::from_value(json!({ "method": "get" })).is_err());
        let err = RouteOptions::new("get", "").validate().unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_relative_path_rejected() {
        assert!(RouteOptions::new("get", "items").validate().is_err());
    }

    #[test]
    fn test_missing_method_rejected() {
        let err = RouteOptions::from_value(json!({ "path": "/test" })).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unknown_method_rejected() {
        assert!(RouteOptions::new("brew", "/coffee").validate().is_err());
    }

    #[test]
    fn test_invalid_request_config_rejected() {
        assert!(RouteOptions::from_value(json!({
            "path": "/test",
            "method": "get",
            "request": 42
        }))
        .is_err());
    }

    #[test]
    fn test_unknown_top_level_field_rejected() {
        assert!(RouteOptions::from_value(json!({
            "path": "/test",
            "method": "get",
            "handler": "nope"
        }))
        .is_err());
    }

    #[test]
    fn test_inject_options() {
        assert!(InjectOptions::from_json("42").is_err());
        assert!(InjectOptions::from_json(r#"{ "request": 42 }"#).is_err());
        assert!(InjectOptions::from_json(r#"{ "request": { "nope": 42 } }"#).is_err());

        let options = InjectOptions::from_json("{}").unwrap();
        assert!(options.request.is_none());
    }
}
