//! Common utilities and types shared across docsync modules.
//!
//! This module provides the record model both stores hold, the error type
//! every crate returns, and the pure input validators the shell relies on.

pub mod error;
pub mod types;
pub mod validate;

pub use error::{Error, Result};
pub use types::{Record, RecordFields, RecordId, RecordPatch};
pub use validate::{parse_integer, parse_non_negative, parse_positive};
