//! Response composition rules shared by the harness.
//!
//! - **[headers]** - header merge policy, `set-cookie` lists and the `vary` rule
//! - **[conditional]** - `304 Not Modified` short-circuiting
//! - **[stage]** - life-cycle stage labels

pub mod conditional;
pub mod headers;
pub mod stage;

pub use conditional::{try_not_modified, EntityOptions};
pub use headers::{apply_vary, set_header, FieldValue, HeaderMap, HeaderOptions};
pub use stage::LifeCycleStage;
