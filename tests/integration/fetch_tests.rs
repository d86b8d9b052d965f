//! Origin fetcher integration tests.
//!
//! Tests verify `HttpRangeFetcher` against a live HTTP origin:
//! - Exact ranged reads and the Range header sent
//! - Reads running past the end of the file
//! - Origins that ignore Range, read only as far as the requested window
//! - HEAD metadata and error statuses

use std::time::Duration;

use axum::http::Method;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use cog_cache::error::IoError;
use cog_cache::io::{HttpRangeFetcher, OriginMetadata, RangeFetcher};

use super::test_utils::{create_pyramid_cog, OriginServer, ORIGIN_CONTENT_TYPE};

fn fetcher() -> HttpRangeFetcher {
    HttpRangeFetcher::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_fetch_exact_range() {
    let cog = create_pyramid_cog();
    let origin = OriginServer::serving("a.tif", cog.data.clone()).await;
    let tile = cog.tiles[1];

    let bytes = fetcher()
        .fetch_range(&origin.url("a.tif"), tile.offset, tile.length)
        .await
        .unwrap();

    assert_eq!(&bytes[..], cog.tile_bytes(&tile));

    let requests = origin.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, Method::GET);
    assert_eq!(
        requests[0].1.as_deref(),
        Some(format!("bytes={}-{}", tile.offset, tile.end() - 1).as_str())
    );
}

#[tokio::test]
async fn test_fetch_past_end_returns_available_bytes() {
    let origin = OriginServer::serving("small.tif", vec![7u8; 100]).await;

    let bytes = fetcher()
        .fetch_range(&origin.url("small.tif"), 0, 16384)
        .await
        .unwrap();

    assert_eq!(bytes.len(), 100);
}

#[tokio::test]
async fn test_fetch_slices_when_origin_ignores_range() {
    let data: Vec<u8> = (0..=255).collect();
    let origin = OriginServer::builder()
        .with_file("a.tif", data.clone())
        .ignoring_ranges()
        .start()
        .await;

    let bytes = fetcher()
        .fetch_range(&origin.url("a.tif"), 10, 20)
        .await
        .unwrap();

    assert_eq!(&bytes[..], &data[10..30]);
}

/// Origin that answers with a 200 announcing a far larger body than it
/// sends, then holds the connection open without finishing it.
async fn start_unfinished_origin(prefix: Vec<u8>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let prefix = prefix.clone();
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;

                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: image/tiff\r\nContent-Length: {}\r\n\r\n",
                    1u64 << 40
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&prefix).await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });

    (format!("http://{}/big.tif", addr), handle)
}

#[tokio::test]
async fn test_fetch_stops_reading_after_window_when_range_ignored() {
    let data: Vec<u8> = (0..=255).collect();
    let (url, origin) = start_unfinished_origin(data.clone()).await;
    let fetcher = HttpRangeFetcher::new(Duration::from_secs(3)).unwrap();

    // Buffering the whole announced body would run into the request timeout
    let bytes = tokio::time::timeout(Duration::from_secs(10), fetcher.fetch_range(&url, 100, 50))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(&bytes[..], &data[100..150]);
    origin.abort();
}

#[tokio::test]
async fn test_fetch_zero_length_skips_request() {
    let origin = OriginServer::serving("a.tif", vec![1, 2, 3]).await;

    let bytes = fetcher()
        .fetch_range(&origin.url("a.tif"), 1, 0)
        .await
        .unwrap();

    assert!(bytes.is_empty());
    assert_eq!(origin.request_count().await, 0);
}

#[tokio::test]
async fn test_fetch_error_status() {
    let origin = OriginServer::serving("a.tif", vec![0u8; 10]).await;

    let result = fetcher()
        .fetch_range(&origin.url("missing.tif"), 0, 10)
        .await;

    assert!(matches!(result, Err(IoError::Status { status: 404, .. })));
}

#[tokio::test]
async fn test_fetch_metadata() {
    let origin = OriginServer::serving("a.tif", vec![0u8; 4321]).await;

    let metadata = fetcher()
        .fetch_metadata(&origin.url("a.tif"))
        .await
        .unwrap();

    assert_eq!(metadata, OriginMetadata::new(ORIGIN_CONTENT_TYPE, 4321));

    let requests = origin.requests().await;
    assert_eq!(requests[0].0, Method::HEAD);
}

#[tokio::test]
async fn test_fetch_metadata_not_found() {
    let origin = OriginServer::serving("a.tif", vec![0u8; 10]).await;

    let result = fetcher().fetch_metadata(&origin.url("other.tif")).await;
    assert!(matches!(result, Err(IoError::Status { status: 404, .. })));
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind then drop to obtain a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = fetcher()
        .fetch_range(&format!("http://{}/a.tif", addr), 0, 10)
        .await;

    assert!(matches!(result, Err(IoError::Connection(_))));
}
