//! Shared fixtures for service tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::error::IoError;
use crate::io::{OriginMetadata, RangeFetcher};

const TILE_OFFSETS: u16 = 324;
const TILE_BYTE_COUNTS: u16 = 325;
const LONG: u16 = 4;

/// Build a little-endian classic TIFF of `total_len` bytes.
///
/// Each element of `ifds` lists the `(offset, length)` tiles of one IFD.
/// Non-header bytes are filled with a position-dependent pattern so slices
/// taken at different offsets are distinguishable.
pub fn build_cog(ifds: &[&[(u32, u32)]], total_len: usize) -> Vec<u8> {
    let mut data: Vec<u8> = (0..total_len).map(|i| (i % 251) as u8).collect();
    let mut header = vec![0x49, 0x49, 0x2A, 0x00, 0, 0, 0, 0];

    let mut link_at = 4;
    for tiles in ifds {
        let ifd_offset = header.len() as u32;
        header[link_at..link_at + 4].copy_from_slice(&ifd_offset.to_le_bytes());

        let count = tiles.len() as u32;
        let arrays_at = ifd_offset + 2 + 2 * 12 + 4;
        let offsets_at = arrays_at;
        let counts_at = arrays_at + 4 * count;

        let inline_or = |value: u32, at: u32| if count == 1 { value } else { at };
        let first = |pick: fn(&(u32, u32)) -> u32| tiles.first().map(pick).unwrap_or(0);

        header.extend_from_slice(&2u16.to_le_bytes());
        for (tag, value) in [
            (TILE_OFFSETS, inline_or(first(|t| t.0), offsets_at)),
            (TILE_BYTE_COUNTS, inline_or(first(|t| t.1), counts_at)),
        ] {
            header.extend_from_slice(&tag.to_le_bytes());
            header.extend_from_slice(&LONG.to_le_bytes());
            header.extend_from_slice(&count.to_le_bytes());
            header.extend_from_slice(&value.to_le_bytes());
        }

        link_at = header.len();
        header.extend_from_slice(&0u32.to_le_bytes());

        if count > 1 {
            for (offset, _) in tiles.iter() {
                header.extend_from_slice(&offset.to_le_bytes());
            }
            for (_, len) in tiles.iter() {
                header.extend_from_slice(&len.to_le_bytes());
            }
        }
    }

    assert!(header.len() <= total_len, "header does not fit in the file");
    data[..header.len()].copy_from_slice(&header);
    data
}

/// In-memory origin that records requests.
pub struct MockFetcher {
    data: Arc<Vec<u8>>,
    requests: Arc<Mutex<Vec<(u64, u64)>>>,
    fail_at: Option<u64>,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl MockFetcher {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(data),
            requests: Arc::new(Mutex::new(Vec::new())),
            fail_at: None,
            delay: None,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer 503 for the range starting at `offset`.
    pub fn failing_at(mut self, offset: u64) -> Self {
        self.fail_at = Some(offset);
        self
    }

    pub fn with_delay_ms(mut self, ms: u64) -> Self {
        self.delay = Some(Duration::from_millis(ms));
        self
    }

    /// `(offset, len)` of every range request, in arrival order.
    pub fn requests(&self) -> Arc<Mutex<Vec<(u64, u64)>>> {
        Arc::clone(&self.requests)
    }

    /// Highest number of range requests observed in flight at once.
    pub fn peak_in_flight(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.peak)
    }
}

#[async_trait]
impl RangeFetcher for MockFetcher {
    async fn fetch_range(&self, url: &str, offset: u64, len: u64) -> Result<Bytes, IoError> {
        self.requests.lock().await.push((offset, len));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_at == Some(offset) {
            return Err(IoError::Status {
                url: url.to_string(),
                status: 503,
            });
        }

        let size = self.data.len() as u64;
        let start = offset.min(size) as usize;
        let end = offset.saturating_add(len).min(size) as usize;
        Ok(Bytes::copy_from_slice(&self.data[start..end]))
    }

    async fn fetch_metadata(&self, _url: &str) -> Result<OriginMetadata, IoError> {
        Ok(OriginMetadata::new("image/tiff", self.data.len() as u64))
    }
}
