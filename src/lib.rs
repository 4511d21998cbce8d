#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Route handler harness
//!
//! Invoke an HTTP route handler in isolation. The harness synthesizes the
//! request, hands the handler a reply protocol shaped like the one it sees in
//! production, and records what the response *would* be, along with the
//! control signals a dispatcher needs to decide what to do next. There is no
//! network stack and nothing is serialized to the wire.
//!
//! ## Overview
//!
//! 1. **Header composition** - append / override / duplicate / separator
//!    policy, `set-cookie` lists and an absorbing `vary: *`
//! 2. **Conditional responses** - etag / last-modified `304` short-circuit
//! 3. **Redirects** - temporary/permanent and rewritable axes over
//!    301 / 302 / 307 / 308
//! 4. **Reply protocol** - reply, `continue`, close, entity, redirect
//!
//! ## Usage
//!
//! ```
//! use route_harness::server::{InjectOptions, RouteOptions, Session};
//! use route_harness::{Reply, Request};
//! use serde_json::json;
//!
//! let mut session = Session::new(
//!     RouteOptions::new("post", "/items"),
//!     |_req: &Request, reply: &mut Reply| {
//!         reply.invoke(json!({ "id": 7 })).created("/items/7")?;
//!         Ok::<_, route_harness::HarnessError>(())
//!     },
//! )
//! .unwrap();
//!
//! session.inject(InjectOptions::default()).unwrap().unwrap();
//!
//! let response = session.take_response().unwrap();
//! assert_eq!(response.status_code(), 201);
//! assert_eq!(response.header_str("location"), Some("/items/7"));
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Request, Response, Source/Variety, Redirect
//! - **[error]** - Error types and result handling
//! - **[protocol]** - Header composition, conditional responses, life-cycle stages
//! - **[server]** - Session, reply protocol and options

pub mod error;
pub mod protocol;
pub mod server;
pub mod types;

pub use error::{HarnessError, Result};
pub use protocol::{EntityOptions, FieldValue, HeaderOptions, LifeCycleStage};
pub use server::{InjectOptions, Reply, RouteOptions, Session};
pub use types::{
    EtagOptions, Redirect, RedirectStatus, Request, RequestOptions, Response, Source,
    StateOptions, Variety,
};

#[cfg(test)]
mod tests;
