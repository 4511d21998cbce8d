//! Driving a route handler.
//!
//! ```text
//! server/
//! ├── config  - RouteOptions and InjectOptions
//! ├── reply   - the reply protocol a handler receives
//! └── session - Session::inject and the last injection outcome
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Session`] | A route handler under test |
//! | [`Reply`] | Per-injection reply protocol |
//! | [`Injection`] | Outcome of the last injection |
//! | [`RouteOptions`] | Route path, method and request defaults |
//! | [`InjectOptions`] | Per-injection request overrides |

pub mod config;
pub mod reply;
pub mod session;

pub use config::{InjectOptions, RouteOptions};
pub use reply::Reply;
pub use session::{Injection, Session};
