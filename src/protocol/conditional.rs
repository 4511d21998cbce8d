//! Conditional-request short-circuiting.
//!
//! Given the entity validators a handler holds (etag and/or last-modified)
//! and the validators the client sent (`if-none-match` /
//! `if-modified-since`), decide whether to answer `304 Not Modified` right
//! away.
//!
//! A present conditional header that differs from the candidate produces the
//! 304. When both are absent, or every present one matches, no response is
//! produced and the handler must build its own.

use crate::error::{HarnessError, Result};
use crate::protocol::headers::names;
use crate::types::{EtagOptions, Request, Response, Source};
use serde::Deserialize;

/// Entity validators a handler offers to `entity()`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EntityOptions {
    /// Entity tag, unquoted
    pub etag: Option<String>,
    /// Last modification date, as sent in `last-modified`
    pub modified: Option<String>,
    /// Vary the etag with content encoding; defaults to `true`
    pub vary: Option<bool>,
    /// Treat the etag as a weak validator
    pub weak: bool,
}

impl EntityOptions {
    /// Validators with an etag only.
    #[must_use]
    pub fn etag(tag: impl Into<String>) -> Self {
        EntityOptions {
            etag: Some(tag.into()),
            ..Default::default()
        }
    }

    /// Validators with a modification date only.
    #[must_use]
    pub fn modified(date: impl Into<String>) -> Self {
        EntityOptions {
            modified: Some(date.into()),
            ..Default::default()
        }
    }

    /// Require at least one validator.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidOperation`] when neither `etag` nor
    /// `modified` is set.
    pub fn validate(&self) -> Result<()> {
        if self.etag.is_none() && self.modified.is_none() {
            return Err(HarnessError::InvalidOperation(
                "entity() requires an etag or a modified date".to_string(),
            ));
        }
        Ok(())
    }
}

/// Build a 304 response for `request` if its validators are stale.
///
/// Returns `Ok(None)` when the handler should produce its own response.
///
/// # Errors
///
/// Returns [`HarnessError::InvalidOperation`] when `options` carries neither
/// an etag nor a modified date.
pub fn try_not_modified(options: &EntityOptions, request: &Request) -> Result<Option<Response>> {
    options.validate()?;

    let mut response = Response::new(Source::Null, request);

    if let Some(tag) = &options.etag {
        response.etag(
            tag,
            EtagOptions {
                weak: options.weak,
                vary: Some(options.vary.unwrap_or(true)),
            },
        );
    }
    if let Some(modified) = &options.modified {
        response.header(names::LAST_MODIFIED, modified.as_str());
    }

    let etag_stale = match request.header(names::IF_NONE_MATCH) {
        Some(sent) => !etag_matches(sent, options.etag.as_deref(), response.header_str(names::ETAG)),
        None => false,
    };
    let modified_stale = match request.header(names::IF_MODIFIED_SINCE) {
        Some(sent) => options.modified.as_deref() != Some(sent),
        None => false,
    };

    if etag_stale || modified_stale {
        tracing::debug!(
            etag_stale,
            modified_stale,
            "conditional request answered with 304"
        );
        response.code(304);
        return Ok(Some(response));
    }

    Ok(None)
}

/// An `if-none-match` value matches when it equals the raw tag or the
/// formatted entity tag.
fn etag_matches(sent: &str, tag: Option<&str>, formatted: Option<&str>) -> bool {
    let sent = sent.trim();
    tag == Some(sent) || formatted == Some(sent)
}
