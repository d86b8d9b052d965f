//! Ingestion and retrieval services.
//!
//! ```text
//!                 ┌──────────────┐   ranged GET / HEAD   ┌────────┐
//!  POST /?url= ──►│   Ingestor   │──────────────────────►│ origin │
//!                 └──────┬───────┘                       └────────┘
//!                        │ set
//!                        ▼
//!                 ┌──────────────┐
//!                 │  CacheStore  │
//!                 └──────▲───────┘
//!                        │ get
//!                 ┌──────┴───────────┐
//!  HEAD/GET /id ─►│ RetrievalService │
//!                 └──────────────────┘
//! ```
//!
//! Both services share one cache handle and one key scheme
//! ([`ResourceKey`](crate::cache::ResourceKey)); they never talk to each other.

mod ingest;
mod retrieval;

#[cfg(test)]
pub(crate) mod test_support;

pub use ingest::{
    IngestConfig, IngestReport, Ingestor, DEFAULT_HEADER_SIZE, DEFAULT_MAX_CONCURRENT_FETCHES,
};
pub use retrieval::RetrievalService;
