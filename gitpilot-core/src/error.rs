//! Error types for gitpilot-core
//!
//! Re-exports gitpilot-error so downstream crates only need this one.

pub use gitpilot_error::{Error, ErrorKind, ErrorStatus, Result};
