mod http_fetcher;
mod range_fetcher;

pub use http_fetcher::{HttpRangeFetcher, DEFAULT_REQUEST_TIMEOUT};
pub use range_fetcher::{OriginMetadata, RangeFetcher};
