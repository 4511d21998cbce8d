//! Redirect status transitions.
//!
//! The four redirect codes sit on two independent axes:
//!
//! | | rewritable (method may change) | method-preserving |
//! |---|---|---|
//! | **temporary** | 302 | 307 |
//! | **permanent** | 301 | 308 |
//!
//! Each setter flips only its own axis and keeps the other one, so any
//! sequence of calls lands on the code predicted by the two bits. A fresh
//! redirect starts at 302.

use crate::types::response::Response;
use http::StatusCode;
use std::ops::{Deref, DerefMut};

/// One of the four redirect status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RedirectStatus {
    /// 301, permanent and rewritable
    MovedPermanently,
    /// 302, temporary and rewritable
    Found,
    /// 307, temporary and method-preserving
    TemporaryRedirect,
    /// 308, permanent and method-preserving
    PermanentRedirect,
}

impl RedirectStatus {
    /// Map a status code onto the redirect set.
    ///
    /// Codes outside {301, 302, 307, 308} land on 308, which is where both
    /// setters' fallback branches meet.
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            301 => RedirectStatus::MovedPermanently,
            302 => RedirectStatus::Found,
            307 => RedirectStatus::TemporaryRedirect,
            _ => RedirectStatus::PermanentRedirect,
        }
    }

    /// Build from the two axes.
    #[must_use]
    pub fn from_axes(temporary: bool, rewritable: bool) -> Self {
        match (temporary, rewritable) {
            (true, true) => RedirectStatus::Found,
            (true, false) => RedirectStatus::TemporaryRedirect,
            (false, true) => RedirectStatus::MovedPermanently,
            (false, false) => RedirectStatus::PermanentRedirect,
        }
    }

    /// Numeric status code.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            RedirectStatus::MovedPermanently => 301,
            RedirectStatus::Found => 302,
            RedirectStatus::TemporaryRedirect => 307,
            RedirectStatus::PermanentRedirect => 308,
        }
    }

    /// As an `http` status code.
    #[must_use]
    pub fn as_status(self) -> StatusCode {
        match self {
            RedirectStatus::MovedPermanently => StatusCode::MOVED_PERMANENTLY,
            RedirectStatus::Found => StatusCode::FOUND,
            RedirectStatus::TemporaryRedirect => StatusCode::TEMPORARY_REDIRECT,
            RedirectStatus::PermanentRedirect => StatusCode::PERMANENT_REDIRECT,
        }
    }

    /// Whether this code is on the temporary axis.
    #[must_use]
    pub fn is_temporary(self) -> bool {
        matches!(self, RedirectStatus::Found | RedirectStatus::TemporaryRedirect)
    }

    /// Whether this code lets the client change method.
    #[must_use]
    pub fn is_rewritable(self) -> bool {
        matches!(self, RedirectStatus::Found | RedirectStatus::MovedPermanently)
    }

    /// Set the temporary axis, keeping rewritability.
    #[must_use]
    pub fn temporary(self, is_temporary: bool) -> Self {
        match self {
            RedirectStatus::MovedPermanently | RedirectStatus::Found => {
                if is_temporary {
                    RedirectStatus::Found
                } else {
                    RedirectStatus::MovedPermanently
                }
            }
            _ => {
                if is_temporary {
                    RedirectStatus::TemporaryRedirect
                } else {
                    RedirectStatus::PermanentRedirect
                }
            }
        }
    }

    /// Set the permanent axis; the negation of [`temporary`](Self::temporary).
    #[must_use]
    pub fn permanent(self, is_permanent: bool) -> Self {
        self.temporary(!is_permanent)
    }

    /// Set the rewritable axis, keeping temporariness.
    #[must_use]
    pub fn rewritable(self, is_rewritable: bool) -> Self {
        match self {
            RedirectStatus::Found | RedirectStatus::TemporaryRedirect => {
                if is_rewritable {
                    RedirectStatus::Found
                } else {
                    RedirectStatus::TemporaryRedirect
                }
            }
            _ => {
                if is_rewritable {
                    RedirectStatus::MovedPermanently
                } else {
                    RedirectStatus::PermanentRedirect
                }
            }
        }
    }
}

/// A response viewed as a redirect.
///
/// Derefs to the underlying [`Response`], so every response mutator is
/// available as well.
///
/// # Examples
///
/// ```
/// use route_harness::{Request, RequestOptions, Response};
///
/// let request = Request::from_options(&RequestOptions::default()).unwrap();
/// let mut response = Response::new((), &request);
/// let mut redirect = response.redirect("/new-home");
///
/// redirect.permanent(true).rewritable(false);
/// assert_eq!(redirect.status_code(), 308);
/// assert_eq!(redirect.header_str("location"), Some("/new-home"));
/// ```
pub struct Redirect<'a> {
    response: &'a mut Response,
}

impl<'a> Redirect<'a> {
    pub(crate) fn new(response: &'a mut Response) -> Self {
        Redirect { response }
    }

    /// Current position in the redirect state machine.
    #[must_use]
    pub fn status(&self) -> RedirectStatus {
        RedirectStatus::from_code(self.response.status_code())
    }

    /// Make the redirect temporary (302/307) or permanent (301/308).
    pub fn temporary(&mut self, is_temporary: bool) -> &mut Self {
        let next = self.status().temporary(is_temporary);
        self.apply(next)
    }

    /// Make the redirect permanent (301/308) or temporary (302/307).
    ///
    /// There is no argument-less form; pass `true` to force a permanent
    /// redirect.
    pub fn permanent(&mut self, is_permanent: bool) -> &mut Self {
        let next = self.status().permanent(is_permanent);
        self.apply(next)
    }

    /// Allow (301/302) or forbid (307/308) a method change on follow-up.
    pub fn rewritable(&mut self, is_rewritable: bool) -> &mut Self {
        let next = self.status().rewritable(is_rewritable);
        self.apply(next)
    }

    fn apply(&mut self, status: RedirectStatus) -> &mut Self {
        self.response.code(status.code());
        self
    }
}

impl Deref for Redirect<'_> {
    type Target = Response;

    fn deref(&self) -> &Response {
        self.response
    }
}

impl DerefMut for Redirect<'_> {
    fn deref_mut(&mut self) -> &mut Response {
        self.response
    }
}
