//! Core harness types: the synthesized request, the response and its
//! source classification, and the redirect state machine.

pub mod redirect;
pub mod request;
pub mod response;
pub mod source;

pub use redirect::{Redirect, RedirectStatus};
pub use request::{
    AccessCheck, Request, RequestInfo, RequestOptions, RouteDescriptor, RouteInfo, StateEntry,
    StateOptions, ALLOWED_METHODS,
};
pub use response::{EtagOptions, Replacer, Response, ResponseSettings, StringifyOptions};
pub use source::{ByteStream, Deferred, Source, Variety};
