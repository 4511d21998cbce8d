//! Route handler session and injection driver.
//!
//! A [`Session`] fixes a route (path, method, handler) and can be injected
//! any number of times. Each injection builds a fresh [`Request`] and
//! [`Reply`], runs the handler to completion and keeps the outcome as the
//! session's last [`Injection`], replacing the previous one wholesale.
//!
//! # Examples
//!
//! ```
//! use route_harness::server::{InjectOptions, RouteOptions, Session};
//! use route_harness::{Reply, Request};
//!
//! let mut session = Session::new(
//!     RouteOptions::new("get", "/hello"),
//!     |_req: &Request, reply: &mut Reply| {
//!         reply.invoke("hello").code(202);
//!     },
//! )
//! .unwrap();
//!
//! session.inject(InjectOptions::default()).unwrap();
//!
//! let (status, content_type) = session
//!     .with_response(|res| (res.status_code(), res.header_str("content-type").map(str::to_string)))
//!     .unwrap();
//! assert_eq!(status, 202);
//! assert_eq!(content_type.as_deref(), Some("text/html"));
//! ```

use crate::error::Result;
use crate::protocol::LifeCycleStage;
use crate::server::config::{InjectOptions, RouteOptions};
use crate::server::reply::Reply;
use crate::types::{Request, RequestOptions, Response};
use http::Method;
use std::fmt;

/// Outcome of one completed injection.
#[derive(Debug)]
pub struct Injection {
    /// The request the handler was invoked with; its bound response is the
    /// injection's response
    pub request: Request,
    /// Whether the handler signalled `continue`
    pub has_control: bool,
    /// Whether the handler signalled `close`
    pub is_closed: bool,
}

/// A route handler under test.
pub struct Session<H> {
    path: String,
    method: Method,
    handler: H,
    request_options: RequestOptions,
    stage: LifeCycleStage,
    last: Option<Injection>,
}

impl<H, O> Session<H>
where
    H: Fn(&Request, &mut Reply) -> O,
{
    /// Create a session for a route.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`](crate::HarnessError::Config) if the
    /// route options fail validation.
    pub fn new(options: RouteOptions, handler: H) -> Result<Self> {
        let method = options.validate()?;

        Ok(Session {
            path: options.path,
            method,
            handler,
            request_options: options.request.unwrap_or_default(),
            stage: LifeCycleStage::default(),
            last: None,
        })
    }

    /// Run the handler once.
    ///
    /// Control flags start cleared and a fresh request is built. A request
    /// supplied in `options` replaces the stored request fields for this and
    /// every later injection. The handler's return value is handed back
    /// uninterpreted.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`](crate::HarnessError::Config) if the
    /// request fields are invalid. The handler is not run in that case and
    /// the stored request fields and the previous outcome are kept.
    pub fn inject(&mut self, options: InjectOptions) -> Result<O> {
        let request_options = options.request.as_ref().unwrap_or(&self.request_options);
        let request = Request::for_route(request_options, &self.method, &self.path)?;
        if let Some(request_options) = options.request {
            self.request_options = request_options;
        }

        tracing::debug!(
            method = %self.method,
            path = %self.path,
            request_id = %request.id(),
            "injecting route handler"
        );

        let mut reply = Reply::new(request.clone());
        let output = (self.handler)(&request, &mut reply);
        let (response, has_control, is_closed) = reply.finish();

        tracing::debug!(
            responded = response.is_some(),
            has_control,
            is_closed,
            "route handler returned"
        );

        request.bind_response(response);
        self.last = Some(Injection {
            request,
            has_control,
            is_closed,
        });

        Ok(output)
    }
}

impl<H> Session<H> {
    /// Route path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Route method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request fields used for the next injection.
    #[must_use]
    pub fn request_options(&self) -> &RequestOptions {
        &self.request_options
    }

    /// Informational life-cycle marker.
    #[must_use]
    pub fn stage(&self) -> LifeCycleStage {
        self.stage
    }

    /// Move the informational life-cycle marker.
    pub fn set_stage(&mut self, stage: LifeCycleStage) {
        self.stage = stage;
    }

    /// Outcome of the last injection.
    #[must_use]
    pub fn last(&self) -> Option<&Injection> {
        self.last.as_ref()
    }

    /// Request of the last injection.
    #[must_use]
    pub fn request(&self) -> Option<&Request> {
        self.last.as_ref().map(|last| &last.request)
    }

    /// Read the response of the last injection.
    ///
    /// This is the same slot [`Request::with_response`] reads.
    pub fn with_response<R>(&self, f: impl FnOnce(&Response) -> R) -> Option<R> {
        self.request().and_then(|request| request.with_response(f))
    }

    /// Whether the last injection produced a response.
    #[must_use]
    pub fn has_response(&self) -> bool {
        self.request().is_some_and(Request::has_response)
    }

    /// Take ownership of the last response, e.g. to await a deferred source.
    ///
    /// Both the session and the request read `None` afterwards.
    pub fn take_response(&mut self) -> Option<Response> {
        self.request().and_then(Request::take_response)
    }

    /// Whether the last injection signalled `continue`.
    #[must_use]
    pub fn has_control(&self) -> bool {
        self.last.as_ref().is_some_and(|last| last.has_control)
    }

    /// Whether the last injection signalled `close`.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.last.as_ref().is_some_and(|last| last.is_closed)
    }
}

impl<H> fmt::Debug for Session<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("stage", &self.stage)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}
