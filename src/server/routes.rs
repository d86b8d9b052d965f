//! Router configuration for the COG range cache.
//!
//! # Route Structure
//!
//! ```text
//! /health           GET   - Health check
//! /?url={source}    POST  - Ingest a COG
//! /{identifier}     HEAD  - Cached content metadata
//! /{identifier}     GET   - Cached range (Range: bytes=START-END)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cog_cache::cache::MemoryStore;
//! use cog_cache::io::HttpRangeFetcher;
//! use cog_cache::server::{create_router, AppState, RouterConfig};
//! use cog_cache::service::IngestConfig;
//!
//! let fetcher = Arc::new(HttpRangeFetcher::new(Duration::from_secs(30))?);
//! let state = AppState::new(fetcher, Arc::new(MemoryStore::new()), IngestConfig::default());
//! let router = create_router(state, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use http::header::{CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, RANGE};
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, ingest_handler, metadata_handler, range_handler, AppState};
use crate::cache::CacheStore;
use crate::io::RangeFetcher;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default CORS allows any origin and tracing is enabled.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// `/health` is matched before the identifier catch-all. Ingestion rejects
/// URLs whose identifier would be `health`, so no cached resource is shadowed.
pub fn create_router<F, C>(state: AppState<F, C>, config: RouterConfig) -> Router
where
    F: RangeFetcher + 'static,
    C: CacheStore + 'static,
{
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/", post(ingest_handler::<F, C>))
        .route(
            "/{*identifier}",
            get(range_handler::<F, C>).head(metadata_handler::<F, C>),
        )
        .with_state(state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
        .allow_headers([RANGE, CONTENT_TYPE])
        .expose_headers([CONTENT_RANGE, CONTENT_LENGTH, CONTENT_TYPE])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
