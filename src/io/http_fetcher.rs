use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, RANGE};
use http::StatusCode;
use reqwest::{Client, Response};
use tracing::debug;

use super::{OriginMetadata, RangeFetcher};
use crate::error::IoError;

/// Default timeout for a single origin request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP implementation of RangeFetcher.
///
/// Tiles and headers are read with `Range: bytes=start-end` GET requests,
/// content metadata with a HEAD request. Requests are never retried.
#[derive(Clone)]
pub struct HttpRangeFetcher {
    client: Client,
}

impl HttpRangeFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, IoError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IoError::Connection(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RangeFetcher for HttpRangeFetcher {
    async fn fetch_range(&self, url: &str, offset: u64, len: u64) -> Result<Bytes, IoError> {
        if len == 0 {
            return Ok(Bytes::new());
        }

        // Build range header: "bytes=start-end" (inclusive on both ends)
        let last = offset
            .checked_add(len - 1)
            .ok_or_else(|| IoError::InvalidUrl {
                url: url.to_string(),
                reason: format!("range {offset}+{len} overflows"),
            })?;
        let range = format!("bytes={}-{}", offset, last);

        let resp = self
            .client
            .get(url)
            .header(RANGE, &range)
            .send()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        let status = resp.status();
        if status != StatusCode::PARTIAL_CONTENT && status != StatusCode::OK {
            return Err(IoError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if status == StatusCode::OK {
            // Origin ignored the Range header and is sending the whole resource
            debug!(url, range = %range, "origin ignored range request, reading prefix only");
            return read_window(resp, offset, len).await;
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        if body.len() as u64 > len {
            return Ok(body.slice(..len as usize));
        }
        Ok(body)
    }

    async fn fetch_metadata(&self, url: &str) -> Result<OriginMetadata, IoError> {
        let resp = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(IoError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let header = |name: &'static str, key| {
            resp.headers()
                .get(key)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
                .ok_or_else(|| IoError::MissingHeader {
                    url: url.to_string(),
                    header: name,
                })
        };

        Ok(OriginMetadata {
            content_type: header("Content-Type", CONTENT_TYPE)?,
            content_length: header("Content-Length", CONTENT_LENGTH)?,
        })
    }
}

/// Read a full-resource body only up to `offset + len`, then drop the
/// connection. Returns the bytes of the window that arrived.
async fn read_window(mut resp: Response, offset: u64, len: u64) -> Result<Bytes, IoError> {
    let wanted = offset.saturating_add(len);
    let mut body = BytesMut::new();

    while (body.len() as u64) < wanted {
        match resp
            .chunk()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?
        {
            Some(chunk) => body.extend_from_slice(&chunk),
            None => break,
        }
    }

    let start = offset.min(body.len() as u64) as usize;
    let end = wanted.min(body.len() as u64) as usize;
    Ok(body.freeze().slice(start..end))
}
