//! Session size over HTTP.
//!
//! Uses the curl crate (libcurl) to `GET {api_prefix}/c/{session}` and read the
//! `size` field of the JSON body. Curl is blocking, so each fetch runs on the
//! tokio blocking pool.

use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

use crate::config::HttpConfig;

use super::error::SizeFetchError;
use super::source::{parse_size_payload, SizeSource};

#[derive(Debug, Clone)]
pub struct HttpSizeSource {
    api_prefix: Url,
    connect_timeout: Duration,
    timeout: Duration,
}

impl HttpSizeSource {
    pub fn new(api_prefix: &str, http: &HttpConfig) -> Result<Self> {
        let api_prefix = Url::parse(api_prefix.trim())
            .with_context(|| format!("invalid API prefix: {api_prefix}"))?;
        if api_prefix.cannot_be_a_base() {
            anyhow::bail!("API prefix is not a hierarchical URL: {api_prefix}");
        }
        Ok(Self {
            api_prefix,
            connect_timeout: http.connect_timeout(),
            timeout: http.timeout(),
        })
    }

    /// Size endpoint for `session`. The session id is percent-encoded as a
    /// single path segment.
    pub fn endpoint(&self, session: &str) -> Result<Url, SizeFetchError> {
        let mut url = self.api_prefix.clone();
        url.path_segments_mut()
            .map_err(|_| SizeFetchError::Endpoint(self.api_prefix.to_string()))?
            .pop_if_empty()
            .push("c")
            .push(session);
        Ok(url)
    }
}

impl SizeSource for HttpSizeSource {
    async fn fetch_size(&self, session: &str) -> Result<u64, SizeFetchError> {
        let url = self.endpoint(session)?;
        let connect_timeout = self.connect_timeout;
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || get_size(url.as_str(), connect_timeout, timeout)).await?
    }
}

fn get_size(url: &str, connect_timeout: Duration, timeout: Duration) -> Result<u64, SizeFetchError> {
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.connect_timeout(connect_timeout)?;
    easy.timeout(timeout)?;

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(SizeFetchError::Http(code));
    }

    parse_size_payload(&body)
}
