//! HAR (HTTP Archive) import: read a browser capture as a record snapshot.
//!
//! Each entry becomes one `ResourceRecord`: the request URL, the
//! `startedDateTime` as epoch milliseconds, the response media type without
//! parameters, the response status, and a `sha256:` digest of the body when the
//! HAR carries one.

mod load;
mod parse;

pub use load::load_har;
