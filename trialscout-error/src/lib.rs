//! # trialscout-error
//!
//! Unified error handling for trialscout.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what went wrong (e.g., ShapeMismatch, RateLimited)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary)
//! - **Error Context**: Key-value pairs that locate the cause (batch label, raw reply)
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use trialscout_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::ShapeMismatch, "expected a JSON array, found object")
//!         .with_operation("normalize::parse_records")
//!         .with_context("batch", "Close, PipeDrive"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All functions return `Result<T, trialscout_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, subsequent ops only append context
//! - Don't abuse `From<OtherError>` to prevent raw error leakage

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using trialscout Error
pub type Result<T> = std::result::Result<T, Error>;
