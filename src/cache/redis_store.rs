use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};

use super::CacheStore;
use crate::error::CacheError;

/// Redis-backed cache store.
///
/// The connection is established when the store is created, not on first
/// use, so a bad cache URI fails process startup. The `ConnectionManager`
/// reconnects on its own and is cheap to clone per command.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    conn: ConnectionManager,
}

// implement `Debug` manually, or a password in the URI may be leaked.
impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.client.get_connection_info();
        f.debug_struct("RedisStore")
            .field("addr", &info.addr)
            .field("db", &info.redis.db)
            .finish()
    }
}

impl RedisStore {
    /// Connect to the Redis server at `uri` (e.g. `redis://127.0.0.1:6379/0`).
    pub async fn connect(uri: &str) -> Result<Self, CacheError> {
        let client = Client::open(uri).map_err(backend_error)?;
        let conn = ConnectionManager::new(client.clone())
            .await
            .map_err(backend_error)?;
        Ok(Self { client, conn })
    }

    /// Round-trip a PING to verify the server is reachable.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(backend_error)?;
        Ok(())
    }
}

fn backend_error(err: RedisError) -> CacheError {
    CacheError::Backend(err.to_string())
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await.map_err(backend_error)?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .set(key, value.as_ref())
            .await
            .map_err(backend_error)?;
        Ok(())
    }
}
