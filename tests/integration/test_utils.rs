//! Test utilities for integration tests.
//!
//! This module provides a synthetic COG builder and a real HTTP origin server
//! (axum on an ephemeral port) that honours `Range` requests.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use cog_cache::ByteRange;

// =============================================================================
// COG Builder
// =============================================================================

#[derive(Clone, Copy)]
pub enum ByteOrderType {
    LittleEndian,
    BigEndian,
}

const IMAGE_WIDTH: u16 = 256;
const TILE_OFFSETS: u16 = 324;
const TILE_BYTE_COUNTS: u16 = 325;
const SHORT: u16 = 3;
const LONG: u16 = 4;

/// Tile data starts at this alignment, past every directory.
const DATA_ALIGNMENT: usize = 1024;

/// A synthetic COG and the tile ranges written into it.
pub struct TestCog {
    pub data: Vec<u8>,
    pub tiles: Vec<ByteRange>,
}

impl TestCog {
    pub fn tile_bytes(&self, tile: &ByteRange) -> &[u8] {
        &self.data[tile.offset as usize..tile.end() as usize]
    }
}

/// Builder for creating tiled TIFF files with one IFD per overview level.
///
/// Each IFD carries ImageWidth (ignored by the parser), TileOffsets and
/// TileByteCounts. Single-tile levels store both values inline.
pub struct CogBuilder {
    byte_order: ByteOrderType,
    levels: Vec<Vec<usize>>,
}

impl CogBuilder {
    pub fn new() -> Self {
        Self {
            byte_order: ByteOrderType::LittleEndian,
            levels: Vec::new(),
        }
    }

    pub fn with_byte_order(mut self, order: ByteOrderType) -> Self {
        self.byte_order = order;
        self
    }

    /// Add an overview level whose tiles have the given lengths.
    pub fn add_level(mut self, tile_lengths: &[usize]) -> Self {
        self.levels.push(tile_lengths.to_vec());
        self
    }

    pub fn build(self) -> TestCog {
        const ENTRIES: usize = 3;
        let ifd_size = 2 + ENTRIES * 12 + 4;

        // First pass: directory and tile layout
        let mut ifd_offsets = Vec::new();
        let mut pos = 8;
        for tiles in &self.levels {
            ifd_offsets.push(pos);
            pos += ifd_size;
            if tiles.len() > 1 {
                pos += 8 * tiles.len();
            }
        }
        let mut next_tile = pos.div_ceil(DATA_ALIGNMENT) * DATA_ALIGNMENT;

        let mut level_ranges = Vec::new();
        for tiles in &self.levels {
            let ranges: Vec<ByteRange> = tiles
                .iter()
                .map(|&len| {
                    let range = ByteRange::new(next_tile as u64, len as u64);
                    next_tile += len;
                    range
                })
                .collect();
            level_ranges.push(ranges);
        }

        // Tile bytes follow a position-dependent pattern
        let mut data: Vec<u8> = (0..next_tile).map(|i| (i * 7 % 253) as u8).collect();

        let order = self.byte_order;
        let put_u16 = |data: &mut [u8], at: usize, v: u16| {
            let bytes = match order {
                ByteOrderType::LittleEndian => v.to_le_bytes(),
                ByteOrderType::BigEndian => v.to_be_bytes(),
            };
            data[at..at + 2].copy_from_slice(&bytes);
        };
        let put_u32 = |data: &mut [u8], at: usize, v: u32| {
            let bytes = match order {
                ByteOrderType::LittleEndian => v.to_le_bytes(),
                ByteOrderType::BigEndian => v.to_be_bytes(),
            };
            data[at..at + 4].copy_from_slice(&bytes);
        };

        data[..2].copy_from_slice(match order {
            ByteOrderType::LittleEndian => b"II",
            ByteOrderType::BigEndian => b"MM",
        });
        put_u16(&mut data, 2, 42);
        put_u32(&mut data, 4, ifd_offsets.first().copied().unwrap_or(0) as u32);

        for (level, ranges) in level_ranges.iter().enumerate() {
            let at = ifd_offsets[level];
            let count = ranges.len() as u32;
            let offsets_at = at + ifd_size;
            let counts_at = offsets_at + 4 * ranges.len();

            put_u16(&mut data, at, ENTRIES as u16);

            // ImageWidth: SHORT value inline in the first two bytes
            put_u16(&mut data, at + 2, IMAGE_WIDTH);
            put_u16(&mut data, at + 4, SHORT);
            put_u32(&mut data, at + 6, 1);
            put_u32(&mut data, at + 10, 0);
            put_u16(&mut data, at + 10, 512 >> level);

            for (i, (tag, array_at)) in [(TILE_OFFSETS, offsets_at), (TILE_BYTE_COUNTS, counts_at)]
                .into_iter()
                .enumerate()
            {
                let entry = at + 2 + 12 * (i + 1);
                put_u16(&mut data, entry, tag);
                put_u16(&mut data, entry + 2, LONG);
                put_u32(&mut data, entry + 4, count);

                let value = |r: &ByteRange| if tag == TILE_OFFSETS { r.offset } else { r.length };
                if ranges.len() == 1 {
                    put_u32(&mut data, entry + 8, value(&ranges[0]) as u32);
                } else {
                    put_u32(&mut data, entry + 8, array_at as u32);
                    for (j, range) in ranges.iter().enumerate() {
                        put_u32(&mut data, array_at + 4 * j, value(range) as u32);
                    }
                }
            }

            let next = ifd_offsets.get(level + 1).copied().unwrap_or(0);
            put_u32(&mut data, at + 2 + 12 * ENTRIES, next as u32);
        }

        TestCog {
            data,
            tiles: level_ranges.into_iter().flatten().collect(),
        }
    }
}

impl Default for CogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Three-level pyramid with a mix of multi-tile and single-tile levels.
pub fn create_pyramid_cog() -> TestCog {
    CogBuilder::new()
        .add_level(&[300, 280, 310, 290])
        .add_level(&[150, 140])
        .add_level(&[90])
        .build()
}

/// A BigTIFF header followed by padding.
pub fn create_bigtiff() -> Vec<u8> {
    let mut data = vec![b'I', b'I', 0x2B, 0x00, 0x08, 0x00, 0x00, 0x00];
    data.extend_from_slice(&16u64.to_le_bytes());
    data.resize(256, 0);
    data
}

// =============================================================================
// Origin Server
// =============================================================================

/// Content type the origin reports for every file.
pub const ORIGIN_CONTENT_TYPE: &str = "image/tiff";

#[derive(Default)]
struct OriginState {
    files: HashMap<String, Vec<u8>>,
    ignore_ranges: bool,
    fail_offsets: HashSet<u64>,
    requests: Mutex<Vec<(Method, Option<String>)>>,
}

/// Builder for an [`OriginServer`].
#[derive(Default)]
pub struct OriginBuilder {
    state: OriginState,
}

impl OriginBuilder {
    pub fn with_file(mut self, path: &str, data: Vec<u8>) -> Self {
        self.state.files.insert(path.to_string(), data);
        self
    }

    /// Answer ranged GETs with 200 and the full body.
    pub fn ignoring_ranges(mut self) -> Self {
        self.state.ignore_ranges = true;
        self
    }

    /// Answer 500 to ranged GETs starting at `offset`.
    pub fn failing_at(mut self, offset: u64) -> Self {
        self.state.fail_offsets.insert(offset);
        self
    }

    pub async fn start(self) -> OriginServer {
        let state = Arc::new(self.state);
        let app = Router::new()
            .route("/{*path}", get(serve_file).head(serve_file))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        OriginServer {
            addr,
            state,
            handle,
        }
    }
}

/// A local HTTP origin serving in-memory files with range support.
pub struct OriginServer {
    addr: SocketAddr,
    state: Arc<OriginState>,
    handle: JoinHandle<()>,
}

impl OriginServer {
    pub fn builder() -> OriginBuilder {
        OriginBuilder::default()
    }

    /// Start an origin serving a single file.
    pub async fn serving(path: &str, data: Vec<u8>) -> Self {
        Self::builder().with_file(path, data).start().await
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path)
    }

    /// Cache identifier derived from [`url`](Self::url).
    pub fn identifier(&self, path: &str) -> String {
        format!("{}/{}", self.addr, path)
    }

    /// Every request received so far as (method, Range header).
    pub async fn requests(&self) -> Vec<(Method, Option<String>)> {
        self.state.requests.lock().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.state.requests.lock().await.len()
    }
}

impl Drop for OriginServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_file(
    State(state): State<Arc<OriginState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state
        .requests
        .lock()
        .await
        .push((method.clone(), range.clone()));

    let Some(data) = state.files.get(uri.path().trim_start_matches('/')) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if method == Method::HEAD {
        return (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, ORIGIN_CONTENT_TYPE.to_string()),
                (header::CONTENT_LENGTH, data.len().to_string()),
            ],
            Body::empty(),
        )
            .into_response();
    }

    let Some((start, end)) = range.as_deref().and_then(parse_range) else {
        return (StatusCode::OK, data.clone()).into_response();
    };

    if state.fail_offsets.contains(&start) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if state.ignore_ranges {
        return (StatusCode::OK, data.clone()).into_response();
    }
    if start >= data.len() as u64 {
        return StatusCode::RANGE_NOT_SATISFIABLE.into_response();
    }

    let last = end.min(data.len() as u64 - 1);
    (
        StatusCode::PARTIAL_CONTENT,
        [(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", start, last, data.len()),
        )],
        data[start as usize..=last as usize].to_vec(),
    )
        .into_response()
}

fn parse_range(value: &str) -> Option<(u64, u64)> {
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}
