//! Cache-only read path.
//!
//! Retrieval never touches the origin. A tile is found only by the exact
//! start offset it was ingested under; a request starting inside a cached
//! tile misses.

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::cache::{CacheStore, ResourceKey};
use crate::error::RetrievalError;
use crate::io::OriginMetadata;

/// Answers metadata and range lookups from the cache.
pub struct RetrievalService<C> {
    cache: Arc<C>,
}

impl<C: CacheStore> RetrievalService<C> {
    pub fn new(cache: Arc<C>) -> Self {
        Self { cache }
    }

    /// Raw JSON metadata blob of `identifier`, if ingested.
    pub async fn metadata_blob(&self, identifier: &str) -> Result<Option<Bytes>, RetrievalError> {
        let key = ResourceKey::from_identifier(identifier);
        Ok(self.cache.get(key.metadata_key()).await?)
    }

    /// Decoded metadata of `identifier`, if ingested.
    ///
    /// # Errors
    /// `CorruptMetadata` if the cached blob is not the expected JSON object.
    pub async fn metadata(&self, identifier: &str) -> Result<Option<OriginMetadata>, RetrievalError> {
        let Some(blob) = self.metadata_blob(identifier).await? else {
            return Ok(None);
        };

        serde_json::from_slice(&blob)
            .map(Some)
            .map_err(|e| RetrievalError::CorruptMetadata {
                identifier: identifier.to_string(),
                message: e.to_string(),
            })
    }

    /// Cached bytes of the entry starting at `start`.
    pub async fn range(&self, identifier: &str, start: u64) -> Result<Option<Bytes>, RetrievalError> {
        let key = ResourceKey::from_identifier(identifier).tile_key(start);
        let content = self.cache.get(&key).await?;

        debug!(key = %key, hit = content.is_some(), "range lookup");
        Ok(content)
    }
}
