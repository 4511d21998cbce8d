//! Request life-cycle stage labels.
//!
//! The numbering mirrors the order a production pipeline walks through. The
//! route handler itself is stage `0`, which is also the default marker a
//! [`Session`](crate::server::Session) carries. The harness never advances
//! stages on its own; the value is informational for drivers.

use serde::Deserialize;

/// A stage in the simulated request life-cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
#[allow(missing_docs)]
pub enum LifeCycleStage {
    #[default]
    RouteHandler = 0,
    OnRequest = 1,
    LookupRoute = 2,
    ProcessQueryExtensions = 3,
    ParseCookies = 4,
    OnPreAuth = 5,
    ValidatePathParams = 6,
    ValidateQuery = 7,
    ValidatePayload = 8,
    OnPreHandler = 9,
    RoutePrerequisites = 10,
    OnPostHandler = 11,
    ValidateResponsePayload = 12,
    OnPreResponse = 13,
    SendResponse = 14,
    Response = 15,
    WaitForTail = 16,
    Tail = 17,
}

impl LifeCycleStage {
    /// Numeric label of this stage.
    #[inline]
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}
