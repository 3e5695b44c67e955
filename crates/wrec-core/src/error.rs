//! Errors raised when validating user-facing control values.
//!
//! The filter and sort engines only ever see well-typed `MatchMode` / `SortKey`
//! values; anything unrecognised is rejected here, at the parsing boundary.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseControlError {
    #[error("unknown match mode `{0}`; expected one of contains, prefix, exact")]
    UnknownMatchMode(String),
    #[error("unknown sort key `{0}`; expected one of url, timestamp, mime, status, digest")]
    UnknownSortKey(String),
}
