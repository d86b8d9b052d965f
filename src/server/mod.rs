//! HTTP server layer for the COG range cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │     POST /?url=     HEAD /{identifier}     GET /{identifier}    │
//! │                                                                 │
//! │  ┌──────────────────────────┐  ┌─────────────────────────────┐  │
//! │  │        handlers          │  │           routes            │  │
//! │  │ (requests, error → HTTP) │  │ (router, CORS, tracing)     │  │
//! │  └──────────────────────────┘  └─────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    health_handler, ingest_handler, metadata_handler, parse_range_header, range_handler,
    AppState, ErrorResponse, HealthResponse, IngestParams, RangeHeaderError, RangeSpec,
    RANGE_CONTENT_TYPE,
};
pub use routes::{create_router, RouterConfig};
