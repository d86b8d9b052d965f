//! HTTP request handlers for the COG range cache.
//!
//! # Endpoints
//!
//! - `POST /?url={source}` - Ingest a COG into the cache
//! - `HEAD /{identifier}` - Replay cached content metadata
//! - `GET /{identifier}` with `Range: bytes=START-END` - Serve a cached range
//! - `GET /health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::cache::CacheStore;
use crate::error::{IngestError, IoError, RetrievalError, TiffError};
use crate::io::RangeFetcher;
use crate::service::{IngestConfig, Ingestor, RetrievalService};

/// Media type of every served range.
pub const RANGE_CONTENT_TYPE: &str = "binary/octet-stream";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the ingestion and retrieval services.
///
/// Both services hold the same cache handle. This is passed to all handlers
/// via Axum's State extractor.
pub struct AppState<F, C> {
    pub ingestor: Arc<Ingestor<F, C>>,
    pub retrieval: Arc<RetrievalService<C>>,
}

impl<F, C> AppState<F, C>
where
    F: RangeFetcher + 'static,
    C: CacheStore + 'static,
{
    /// Build both services around one fetcher and one cache.
    pub fn new(fetcher: Arc<F>, cache: Arc<C>, config: IngestConfig) -> Self {
        Self {
            ingestor: Arc::new(Ingestor::with_config(fetcher, Arc::clone(&cache), config)),
            retrieval: Arc::new(RetrievalService::new(cache)),
        }
    }
}

impl<F, C> Clone for AppState<F, C> {
    fn clone(&self) -> Self {
        Self {
            ingestor: Arc::clone(&self.ingestor),
            retrieval: Arc::clone(&self.retrieval),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Query parameters for ingestion requests.
#[derive(Debug, Deserialize)]
pub struct IngestParams {
    /// Source URL of the COG
    pub url: String,
}

/// A parsed `Range: bytes=START-END` request header.
///
/// Only `start` selects the cached entry; `end` is validated and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub start: u64,
    pub end: Option<u64>,
}

/// Why a `Range` header was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeHeaderError {
    #[error("Missing Range header")]
    Missing,

    #[error("Malformed Range header '{0}': expected bytes=START-END")]
    Malformed(String),
}

/// Parse a single-range `bytes=START-END` or `bytes=START-` specification.
///
/// END never selects the cached entry, but an END below START is rejected
/// as malformed. Suffix (`bytes=-N`) and multi-range forms are rejected too.
pub fn parse_range_header(value: &str) -> Result<RangeSpec, RangeHeaderError> {
    let malformed = || RangeHeaderError::Malformed(value.to_string());

    let spec = value.trim().strip_prefix("bytes=").ok_or_else(malformed)?;
    let (start, end) = spec.split_once('-').ok_or_else(malformed)?;

    let parse = |s: &str| -> Result<u64, RangeHeaderError> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        s.parse().map_err(|_| malformed())
    };

    let start = parse(start.trim())?;
    let end = match end.trim() {
        "" => None,
        end => Some(parse(end)?),
    };

    if end.is_some_and(|end| end < start) {
        return Err(malformed());
    }

    Ok(RangeSpec { start, end })
}

/// Resource identifier addressed by a retrieval request.
///
/// Taken from the raw request path so it keeps the same percent-encoding the
/// ingestion key was derived with.
fn identifier_from_uri(uri: &Uri) -> &str {
    uri.path().trim_start_matches('/')
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_range")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Log an error by severity and render it as JSON.
///
/// 5xx at ERROR, 404 at DEBUG (misses are routine), other 4xx at WARN.
fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Not found: {}",
            message
        );
    } else {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let body = ErrorResponse::with_status(error_type, message, status);
    (status, Json(body)).into_response()
}

fn not_found(identifier: &str, what: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        "not_found",
        format!("No cached {} for {}", what, identifier),
    )
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert IngestError to HTTP response.
///
/// - Unusable input (bad URL, not a TIFF, BigTIFF) is a 400
/// - A TIFF whose directories cannot be walked is a 422
/// - Origin failures are a 502
/// - Cache and task failures are a 500
impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            IngestError::Io(IoError::InvalidUrl { .. }) => (StatusCode::BAD_REQUEST, "invalid_url"),
            IngestError::Io(_) => (StatusCode::BAD_GATEWAY, "origin_error"),

            IngestError::Tiff(TiffError::UnsupportedBigTiff) => {
                (StatusCode::BAD_REQUEST, "unsupported_format")
            }
            IngestError::Tiff(TiffError::InvalidMagic(_) | TiffError::InvalidVersion(_)) => {
                (StatusCode::BAD_REQUEST, "not_a_tiff")
            }
            IngestError::Tiff(_) => (StatusCode::UNPROCESSABLE_ENTITY, "malformed_tiff"),

            IngestError::Cache(_) => (StatusCode::INTERNAL_SERVER_ERROR, "cache_error"),
            IngestError::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        error_response(status, error_type, self.to_string())
    }
}

/// Convert RetrievalError to HTTP response. Both variants are server-side faults.
impl IntoResponse for RetrievalError {
    fn into_response(self) -> Response {
        let error_type = match &self {
            RetrievalError::Cache(_) => "cache_error",
            RetrievalError::CorruptMetadata { .. } => "corrupt_metadata",
        };
        error_response(StatusCode::INTERNAL_SERVER_ERROR, error_type, self.to_string())
    }
}

impl IntoResponse for RangeHeaderError {
    fn into_response(self) -> Response {
        error_response(StatusCode::BAD_REQUEST, "invalid_range", self.to_string())
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle ingestion requests.
///
/// # Endpoint
///
/// `POST /?url={source}`
///
/// # Response
///
/// - `200 OK`: empty body, header, tiles and metadata are cached
/// - `400 Bad Request`: invalid URL, not a TIFF, or BigTIFF
/// - `422 Unprocessable Entity`: TIFF directories could not be walked
/// - `502 Bad Gateway`: the origin failed
pub async fn ingest_handler<F, C>(
    State(state): State<AppState<F, C>>,
    Query(params): Query<IngestParams>,
) -> Result<StatusCode, IngestError>
where
    F: RangeFetcher + 'static,
    C: CacheStore + 'static,
{
    state.ingestor.ingest(&params.url).await?;
    Ok(StatusCode::OK)
}

/// Handle metadata requests.
///
/// # Endpoint
///
/// `HEAD /{identifier}`
///
/// # Response
///
/// - `200 OK`: `Content-Type` and `Content-Length` replayed from the origin
/// - `404 Not Found`: the identifier was never ingested
pub async fn metadata_handler<F, C>(
    State(state): State<AppState<F, C>>,
    uri: Uri,
) -> Result<Response, RetrievalError>
where
    F: RangeFetcher + 'static,
    C: CacheStore + 'static,
{
    let identifier = identifier_from_uri(&uri);
    let Some(metadata) = state.retrieval.metadata(identifier).await? else {
        return Ok(not_found(identifier, "metadata"));
    };

    let corrupt = |name: &str, e: String| RetrievalError::CorruptMetadata {
        identifier: identifier.to_string(),
        message: format!("{}: {}", name, e),
    };

    let mut headers = HeaderMap::new();
    for (name, value) in metadata.headers() {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| corrupt(name, e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| corrupt(name, e.to_string()))?;
        headers.insert(header_name, header_value);
    }

    Ok((StatusCode::OK, headers, Body::empty()).into_response())
}

/// Handle ranged content requests.
///
/// # Endpoint
///
/// `GET /{identifier}` with `Range: bytes=START-END`
///
/// # Response
///
/// - `206 Partial Content`: the entry cached at `START`, whatever its length
/// - `400 Bad Request`: `Range` header missing or malformed
/// - `404 Not Found`: nothing cached at exactly `START`
///
/// # Headers
///
/// - `Content-Type: binary/octet-stream`
/// - `Content-Range: bytes START-LAST/*`
pub async fn range_handler<F, C>(
    State(state): State<AppState<F, C>>,
    uri: Uri,
    headers: HeaderMap,
) -> Response
where
    F: RangeFetcher + 'static,
    C: CacheStore + 'static,
{
    let identifier = identifier_from_uri(&uri);

    let range = match headers
        .get(header::RANGE)
        .ok_or(RangeHeaderError::Missing)
        .and_then(|v| {
            v.to_str()
                .map_err(|_| RangeHeaderError::Malformed(String::from_utf8_lossy(v.as_bytes()).into()))
        })
        .and_then(parse_range_header)
    {
        Ok(range) => range,
        Err(err) => return err.into_response(),
    };

    let content = match state.retrieval.range(identifier, range.start).await {
        Ok(Some(content)) => content,
        Ok(None) => return not_found(identifier, &format!("range at offset {}", range.start)),
        Err(err) => return err.into_response(),
    };

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(RANGE_CONTENT_TYPE),
    );
    if let Some(last) = (content.len() as u64).checked_sub(1) {
        let content_range = format!("bytes {}-{}/*", range.start, range.start + last);
        if let Ok(value) = HeaderValue::from_str(&content_range) {
            response_headers.insert(header::CONTENT_RANGE, value);
        }
    }

    (StatusCode::PARTIAL_CONTENT, response_headers, content).into_response()
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
