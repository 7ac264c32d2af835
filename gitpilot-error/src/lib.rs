//! # gitpilot-error
//!
//! Unified error handling for gitpilot.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what went wrong (e.g., FileNotFound, ProviderUnavailable)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary)
//! - **Error Context**: Assist in locating the cause with key-value context
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use gitpilot_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::NothingToCommit, "nothing to commit, working tree clean")
//!         .with_operation("workspace::commit_changes")
//!         .with_context("branch", "main"))
//! }
//! ```
//!
//! ## Principles
//!
//! - Library functions return `Result<T, gitpilot_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, callers further up only append context
//! - Action failures are folded into action results at the action boundary,
//!   so these errors never reach the session loop from a tool call

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the gitpilot Error
pub type Result<T> = std::result::Result<T, Error>;
