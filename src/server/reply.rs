//! Reply protocol handed to a route handler.
//!
//! A handler answers one of five ways:
//!
//! | Call | Effect |
//! |------|--------|
//! | [`Reply::invoke`] / [`Reply::invoke_with`] | Build a response from a source |
//! | [`Reply::proceed`] | `continue`: hand control back to the pipeline |
//! | [`Reply::close`] | The handler terminated the transport itself |
//! | [`Reply::entity`] | Answer `304` if the client's validators are stale |
//! | [`Reply::redirect`] | Build a `302` redirect |
//!
//! Calls are not exclusive. Each one overwrites or extends the same state
//! and the last one observed wins. When the handler returns, the session
//! binds the current response onto the request. Until then the request's
//! slot reads empty, so a handler inspects the response it is building
//! through [`Reply::response`] rather than [`Request::with_response`].

use crate::error::Result;
use crate::protocol::conditional::{try_not_modified, EntityOptions};
use crate::types::{Redirect, Request, Response, Source};

/// Per-injection reply protocol.
#[derive(Debug)]
pub struct Reply {
    request: Request,
    response: Option<Response>,
    has_control: bool,
    is_closed: bool,
}

impl Reply {
    pub(crate) fn new(request: Request) -> Self {
        Reply {
            request,
            response: None,
            has_control: false,
            is_closed: false,
        }
    }

    /// Reply with `source`, replacing any previous response.
    pub fn invoke(&mut self, source: impl Into<Source>) -> &mut Response {
        let response = Response::new(source, &self.request);
        tracing::trace!(variety = %response.variety(), "reply invoked");
        self.response.insert(response)
    }

    /// Reply in the conventional `(error, value)` shape.
    ///
    /// The first argument is accepted and ignored; only `source` is used.
    pub fn invoke_with<E>(&mut self, _error: E, source: impl Into<Source>) -> &mut Response {
        self.invoke(source)
    }

    /// Signal `continue`: the handler has no substantive response and the
    /// pipeline should move on to the next stage.
    pub fn proceed(&mut self) -> &mut Self {
        tracing::trace!("reply continue");
        self.has_control = true;
        self
    }

    /// Signal that the handler closed the transport itself.
    pub fn close(&mut self) -> &mut Self {
        tracing::trace!("reply close");
        self.is_closed = true;
        self
    }

    /// Answer `304 Not Modified` when the client's validators are stale.
    ///
    /// Returns `Ok(None)` when the handler must produce its own response; the
    /// current response is left untouched in that case.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InvalidOperation`](crate::HarnessError::InvalidOperation)
    /// when `options` has neither an etag nor a modified date.
    pub fn entity(&mut self, options: EntityOptions) -> Result<Option<&mut Response>> {
        match try_not_modified(&options, &self.request)? {
            Some(response) => Ok(Some(self.response.insert(response))),
            None => Ok(None),
        }
    }

    /// Reply with a `302` redirect to `uri`.
    pub fn redirect(&mut self, uri: &str) -> Redirect<'_> {
        let response = Response::build_redirect(uri, self.request.downgrade());
        tracing::trace!(location = %uri, "reply redirect");
        Redirect::new(self.response.insert(response))
    }

    /// The request this reply answers.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// The current response, if any.
    #[must_use]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    /// The current response, mutably.
    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_mut()
    }

    /// Whether `continue` was signalled.
    #[must_use]
    pub fn has_control(&self) -> bool {
        self.has_control
    }

    /// Whether `close` was signalled.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.is_closed
    }

    /// Consume the protocol, returning `(response, has_control, is_closed)`.
    pub(crate) fn finish(self) -> (Option<Response>, bool, bool) {
        (self.response, self.has_control, self.is_closed)
    }
}
