use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::IoError;

/// Trait for reading byte ranges and metadata from an origin resource.
///
/// This abstraction lets the ingestion pipeline fetch a COG's header and
/// tiles without knowing how the origin is reached. Implementations must be
/// thread-safe: tile fetches for one ingestion run concurrently.
#[async_trait]
pub trait RangeFetcher: Send + Sync {
    /// Read up to `len` bytes of `url` starting at `offset`.
    ///
    /// Origins may return fewer bytes when the range runs past the end of
    /// the resource; callers that need an exact length must check it.
    async fn fetch_range(&self, url: &str, offset: u64, len: u64) -> Result<Bytes, IoError>;

    /// Issue a HEAD request and record the content metadata of `url`.
    async fn fetch_metadata(&self, url: &str) -> Result<OriginMetadata, IoError>;
}

/// Content headers observed on the origin resource.
///
/// Serialized with the exact HTTP header names as JSON keys, so a cached
/// blob can be replayed as response headers without translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginMetadata {
    #[serde(rename = "Content-Type")]
    pub content_type: String,

    #[serde(rename = "Content-Length")]
    pub content_length: String,
}

impl OriginMetadata {
    pub fn new(content_type: impl Into<String>, content_length: u64) -> Self {
        Self {
            content_type: content_type.into(),
            content_length: content_length.to_string(),
        }
    }

    /// Header name/value pairs in the order they are replayed.
    pub fn headers(&self) -> [(&'static str, &str); 2] {
        [
            ("Content-Type", self.content_type.as_str()),
            ("Content-Length", self.content_length.as_str()),
        ]
    }

    /// Content length as a number, if the origin sent a valid one.
    pub fn content_length_bytes(&self) -> Option<u64> {
        self.content_length.trim().parse().ok()
    }
}
