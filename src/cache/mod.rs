//! Key-value cache for ingested COG bytes.
//!
//! The cache is an opaque string-keyed store of byte blobs. Entries are
//! written by ingestion and only ever read by retrieval; eviction and
//! expiry are left to the backend.
//!
//! # Backends
//!
//! - [`RedisStore`] - shared Redis server (`redis://` / `rediss://` URIs)
//! - [`MemoryStore`] - in-process map (`memory://`), for single-node use and tests

mod keys;
mod memory;
mod redis_store;

use async_trait::async_trait;
use bytes::Bytes;

pub use keys::ResourceKey;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use crate::error::CacheError;

/// URI scheme selecting the in-process store.
pub const MEMORY_URI: &str = "memory://";

/// Trait for the key-value store that holds cached bytes.
///
/// Writes always target distinct keys per tile, so implementations need no
/// read-modify-write support; concurrent `set`s must simply not corrupt
/// each other.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the blob stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Store `value` under `key`, replacing any previous blob.
    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError>;
}

/// Cache store selected at startup from the configured URI.
#[derive(Debug)]
pub enum CacheBackend {
    Redis(RedisStore),
    Memory(MemoryStore),
}

impl CacheBackend {
    /// Connect to the backend named by `uri`.
    pub async fn connect(uri: &str) -> Result<Self, CacheError> {
        if uri == MEMORY_URI {
            return Ok(CacheBackend::Memory(MemoryStore::new()));
        }
        let store = RedisStore::connect(uri).await?;
        store.ping().await?;
        Ok(CacheBackend::Redis(store))
    }

    pub const fn name(&self) -> &'static str {
        match self {
            CacheBackend::Redis(_) => "redis",
            CacheBackend::Memory(_) => "memory",
        }
    }
}

#[async_trait]
impl CacheStore for CacheBackend {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        match self {
            CacheBackend::Redis(store) => store.get(key).await,
            CacheBackend::Memory(store) => store.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        match self {
            CacheBackend::Redis(store) => store.set(key, value).await,
            CacheBackend::Memory(store) => store.set(key, value).await,
        }
    }
}
