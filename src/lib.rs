//! # COG Cache
//!
//! A range-cache proxy for Cloud-Optimized GeoTIFFs (COGs).
//!
//! Given the URL of a remote COG, the ingestion pipeline fetches its header
//! prefix, walks every Image File Directory to find the byte range of each
//! tile, fetches those ranges concurrently and stores them in a key-value
//! cache. Later HTTP range reads of the same file are answered from the cache
//! without touching the origin.
//!
//! ## Architecture
//!
//! - [`mod@format`] - Classic TIFF header parsing and tile range extraction
//! - [`io`] - Origin range fetcher (HTTP `Range` GET and HEAD)
//! - [`cache`] - Cache store trait, key scheme, Redis and in-memory backends
//! - [`service`] - Ingestion pipeline and cache-only retrieval
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use cog_cache::{AppState, HttpRangeFetcher, IngestConfig, MemoryStore, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = Arc::new(HttpRangeFetcher::new(Duration::from_secs(30))?);
//!     let cache = Arc::new(MemoryStore::new());
//!     let state = AppState::new(fetcher, cache, IngestConfig::default());
//!
//!     let router = cog_cache::create_router(state, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//!     axum::serve(listener, router).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use cache::{CacheBackend, CacheStore, MemoryStore, RedisStore, ResourceKey, MEMORY_URI};
pub use config::{Cli, Command, InspectConfig, InspectOutputFormat, ServeConfig};
pub use error::{CacheError, IngestError, IoError, RetrievalError, TiffError};
pub use format::tiff::{
    detect_format, extract_tile_ranges, parse_ifds, ByteOrder, ByteRange, FieldType, Ifd,
    IfdEntry, TiffFormat, TiffHeader, TiffTag, TIFF_HEADER_SIZE,
};
pub use io::{HttpRangeFetcher, OriginMetadata, RangeFetcher, DEFAULT_REQUEST_TIMEOUT};
pub use server::{
    create_router, health_handler, ingest_handler, metadata_handler, parse_range_header,
    range_handler, AppState, ErrorResponse, HealthResponse, IngestParams, RangeHeaderError,
    RangeSpec, RouterConfig,
};
pub use service::{
    IngestConfig, IngestReport, Ingestor, RetrievalService, DEFAULT_HEADER_SIZE,
    DEFAULT_MAX_CONCURRENT_FETCHES,
};
