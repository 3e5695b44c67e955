//! Live recording size.
//!
//! While a recording session is embedded, a single poll loop fetches the
//! session's cumulative size at a fixed interval and publishes it through a
//! `watch` channel (one writer, any number of readers). Failed fetches leave
//! the last published size in place and the loop carries on at the next tick.

mod error;
mod guard;
mod http;
mod poller;
mod source;
mod state;

pub use error::SizeFetchError;
pub use http::HttpSizeSource;
pub use poller::{SizePoller, MIN_POLL_INTERVAL};
pub use source::{parse_size_payload, SizeSource};
pub use state::{PollerPhase, SessionSizeState};
