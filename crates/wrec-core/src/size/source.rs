//! Where session sizes come from.

use serde::Deserialize;
use std::future::Future;

use super::error::SizeFetchError;

/// Something that can report the current size of a recording session.
///
/// Implementations are shared with the spawned poll loop, hence the
/// `Send + Sync + 'static` bound and the `Send` future.
pub trait SizeSource: Send + Sync + 'static {
    fn fetch_size(&self, session: &str) -> impl Future<Output = Result<u64, SizeFetchError>> + Send;
}

#[derive(Debug, Deserialize)]
struct SizePayload {
    #[serde(default)]
    size: Option<u64>,
}

/// Parse a `{ "size": <integer> }` body. A missing or null `size` reads as 0.
pub fn parse_size_payload(body: &[u8]) -> Result<u64, SizeFetchError> {
    let payload: SizePayload = serde_json::from_slice(body)?;
    Ok(payload.size.unwrap_or(0))
}
