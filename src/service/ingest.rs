//! Ingestion pipeline: origin COG → cache.
//!
//! ```text
//! ingest(url)
//!   1. GET  bytes=0-(header_size-1)          header prefix
//!   2. detect_format                          BigTIFF → reject, nothing written
//!   3. SET  {id}@0                            header prefix
//!   4. extract_tile_ranges                    every tile of every IFD
//!   5. GET  bytes=off-(off+len-1)  ─┐
//!      SET  {id}@{off}              ├─ per tile, concurrently (bounded)
//!                                  ─┘
//!   6. HEAD url, SET {id}                     content metadata JSON
//! ```
//!
//! Ingestion is not atomic. If a tile fetch fails, the call fails and the
//! remaining tile tasks are aborted, but tiles already written stay cached.
//! Re-running ingestion for the same URL is safe: every write is idempotent.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::cache::{CacheStore, ResourceKey};
use crate::error::{CacheError, IngestError, IoError, TiffError};
use crate::format::tiff::{extract_tile_ranges, ByteRange, TiffHeader};
use crate::io::RangeFetcher;

/// Default size of the header prefix fetched from the origin.
pub const DEFAULT_HEADER_SIZE: usize = 16 * 1024;

/// Default ceiling on concurrent tile fetches per ingestion.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 32;

// =============================================================================
// Configuration / Report
// =============================================================================

/// Tunables for the ingestion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestConfig {
    /// Bytes fetched from the start of the file; all IFDs must fit in it
    pub header_size: usize,

    /// Maximum number of tile fetches in flight at once
    pub max_concurrent_fetches: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            header_size: DEFAULT_HEADER_SIZE,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }
}

/// Summary of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Resource identifier the entries were written under
    pub identifier: String,

    /// Bytes of header prefix cached
    pub header_bytes: usize,

    /// Tile ranges found across all IFDs
    pub tiles_found: usize,

    /// Tiles fetched and written (zero-length tiles are skipped)
    pub tiles_cached: usize,

    /// Total tile bytes written
    pub bytes_cached: u64,
}

// =============================================================================
// Ingestor
// =============================================================================

/// Populates the cache with the header, tiles and metadata of a COG.
///
/// # Type Parameters
///
/// * `F` - Origin fetcher (HTTP in production)
/// * `C` - Cache store the entries are written to
pub struct Ingestor<F, C> {
    fetcher: Arc<F>,
    cache: Arc<C>,
    config: IngestConfig,
}

impl<F, C> Ingestor<F, C>
where
    F: RangeFetcher + 'static,
    C: CacheStore + 'static,
{
    /// Create an ingestor with default settings.
    pub fn new(fetcher: Arc<F>, cache: Arc<C>) -> Self {
        Self::with_config(fetcher, cache, IngestConfig::default())
    }

    pub fn with_config(fetcher: Arc<F>, cache: Arc<C>, config: IngestConfig) -> Self {
        Self {
            fetcher,
            cache,
            config: IngestConfig {
                max_concurrent_fetches: config.max_concurrent_fetches.max(1),
                ..config
            },
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Fetch and cache everything needed to serve `url` from the cache.
    ///
    /// # Errors
    /// - `Io` for invalid URLs and origin failures (nothing is retried)
    /// - `Tiff` for BigTIFF or malformed headers
    /// - `Cache` if a write is rejected
    pub async fn ingest(&self, url: &str) -> Result<IngestReport, IngestError> {
        let key = ResourceKey::from_url(url)?;

        let header = self
            .fetcher
            .fetch_range(url, 0, self.config.header_size as u64)
            .await?;

        // BigTIFF must be rejected before anything is written
        if TiffHeader::parse(&header)?.is_bigtiff() {
            return Err(TiffError::UnsupportedBigTiff.into());
        }

        self.cache.set(&key.header_key(), header.clone()).await?;

        let ranges = extract_tile_ranges(&header)?;
        debug!(
            identifier = %key,
            tiles = ranges.len(),
            "extracted tile ranges"
        );

        let (tiles_cached, bytes_cached) = self.cache_tiles(url, &key, &ranges).await?;

        let metadata = self.fetcher.fetch_metadata(url).await?;
        let blob = serde_json::to_vec(&metadata).map_err(|e| CacheError::Encode(e.to_string()))?;
        self.cache.set(key.metadata_key(), Bytes::from(blob)).await?;

        let report = IngestReport {
            identifier: key.identifier().to_string(),
            header_bytes: header.len(),
            tiles_found: ranges.len(),
            tiles_cached,
            bytes_cached,
        };

        info!(
            identifier = %report.identifier,
            tiles = report.tiles_cached,
            bytes = report.bytes_cached,
            "ingested COG"
        );

        Ok(report)
    }

    /// Fetch every non-empty tile and write it under its own key.
    ///
    /// Returns the number of tiles and bytes written.
    async fn cache_tiles(
        &self,
        url: &str,
        key: &ResourceKey,
        ranges: &[ByteRange],
    ) -> Result<(usize, u64), IngestError> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_fetches));
        let url: Arc<str> = Arc::from(url);
        let mut tasks = JoinSet::new();

        for range in ranges.iter().copied() {
            // Sparse tiles have nothing to fetch; offset 0 would also clobber the header entry
            if range.is_empty() {
                debug!(identifier = %key, offset = range.offset, "skipping empty tile");
                continue;
            }

            let fetcher = Arc::clone(&self.fetcher);
            let cache = Arc::clone(&self.cache);
            let permits = Arc::clone(&permits);
            let url = Arc::clone(&url);
            let tile_key = key.tile_key(range.offset);

            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| IngestError::Task(e.to_string()))?;

                let content = fetcher.fetch_range(&url, range.offset, range.length).await?;
                if content.len() as u64 != range.length {
                    return Err(IoError::ShortRead {
                        url: url.to_string(),
                        offset: range.offset,
                        expected: range.length,
                        actual: content.len() as u64,
                    }
                    .into());
                }

                cache.set(&tile_key, content).await?;
                debug!(
                    url = %url,
                    start = range.offset,
                    end = range.end(),
                    "cached byte range"
                );
                Ok::<u64, IngestError>(range.length)
            });
        }

        let mut tiles = 0;
        let mut bytes = 0;
        while let Some(joined) = tasks.join_next().await {
            // Returning early drops the JoinSet, which aborts tiles still in flight
            let written = joined.map_err(|e| IngestError::Task(e.to_string()))??;
            tiles += 1;
            bytes += written;
        }

        Ok((tiles, bytes))
    }
}

// =============================================================================
// Tests
// =============================================================================
