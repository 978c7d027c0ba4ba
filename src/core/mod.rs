//! Core error types shared across the relpack codebase.
//!
//! Every fallible operation in relpack reports failures through this module:
//!
//! - [`RelpackError`] enumerates the concrete failure modes, from release
//!   lookups that return nothing to git subprocesses that exit non-zero.
//! - [`ErrorContext`] wraps an error with an actionable suggestion and
//!   optional details for terminal display.
//! - [`user_friendly_error`] converts any [`anyhow::Error`] that bubbles up
//!   to `main` into a colored, suggestion-bearing report.
//!
//! Library code constructs [`RelpackError`] variants and propagates them with
//! `?`; only the binary entry point renders them for users.

pub mod error;

pub use error::{ErrorContext, RelpackError, user_friendly_error};
