//! Core error type and constants for `lazyclean`.
//!
//! ## Key Components
//!
//! - **`errors`**: Defines the primary `Error` enum and `Result` type alias
//!   shared by every crate of the workspace.
//! - **`constants`**: Environment variable names and defaults used by the
//!   cleaner configuration and logging setup.

pub mod constants;
pub mod errors;

pub use self::{
    constants::*,
    errors::{BoxError, Error, Result},
};
