//! Key-value storage layer for ParkApp
//!
//! Provides the [`StorageAdapter`] implementations used to persist the
//! logged-in identity:
//!
//! - [`RedisStore`] - Redis via a multiplexed `ConnectionManager`
//! - [`MemoryStore`] - process-local map, the default backend
//!
//! plus [`IdentityStore`], which keeps the current user as JSON on top of
//! either of them, and [`OccupancyLedger`], which records the sessions
//! holding a space in the lot.
//!
//! # Example
//!
//! ```no_run
//! use park_cache::RedisStore;
//! use park_core::traits::StorageAdapter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = RedisStore::new("redis://127.0.0.1:6379", "parkapp").await?;
//!
//!     store.set("user", "{}").await?;
//!     let value = store.get("user").await?;
//!     assert_eq!(value, Some("{}".to_string()));
//!
//!     Ok(())
//! }
//! ```

pub mod identity;
pub mod keys;
pub mod memory;
pub mod occupancy;

pub use identity::IdentityStore;
pub use memory::MemoryStore;
pub use occupancy::OccupancyLedger;

use async_trait::async_trait;
use park_core::config::{StorageBackend, StorageConfig};
use park_core::error::AppError;
use park_core::traits::StorageAdapter;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisError};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Redis storage implementation
///
/// Wraps a Redis ConnectionManager to provide efficient, multiplexed access
/// to Redis. Keys are prefixed with the configured namespace.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
    namespace: String,
}

impl RedisStore {
    /// Create a new Redis store
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., "redis://127.0.0.1:6379")
    /// * `namespace` - Prefix applied to every key
    ///
    /// # Errors
    ///
    /// Returns `AppError::StorageConnection` if the connection fails
    pub async fn new(url: &str, namespace: impl Into<String>) -> Result<Self, AppError> {
        debug!("Connecting to Redis at {}", url);

        let client = Client::open(url).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            AppError::StorageConnection(format!("Invalid Redis URL: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to establish Redis connection: {}", e);
            AppError::StorageConnection(format!("Connection failed: {}", e))
        })?;

        debug!("Redis connection established successfully");
        Ok(Self {
            manager,
            namespace: namespace.into(),
        })
    }

    /// Ping the Redis server to check connectivity
    pub async fn ping(&self) -> Result<(), AppError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_redis_error)?;
        Ok(())
    }

    fn key(&self, key: &str) -> String {
        keys::namespaced(&self.namespace, key)
    }

    /// Convert RedisError to AppError
    fn map_redis_error(err: RedisError) -> AppError {
        match err.kind() {
            redis::ErrorKind::IoError => {
                error!("Redis I/O error: {}", err);
                AppError::StorageConnection(format!("I/O error: {}", err))
            }
            redis::ErrorKind::TypeError => {
                warn!("Redis type error: {}", err);
                AppError::Storage(format!("Type mismatch: {}", err))
            }
            _ => {
                error!("Redis error: {}", err);
                AppError::Storage(err.to_string())
            }
        }
    }
}

#[async_trait]
impl StorageAdapter for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let key = self.key(key);
        debug!("GET {}", key);
        let mut conn = self.manager.clone();

        let value: Option<String> = conn.get(&key).await.map_err(Self::map_redis_error)?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let key = self.key(key);
        debug!("SET {}", key);
        let mut conn = self.manager.clone();

        let _: () = conn
            .set(&key, value)
            .await
            .map_err(Self::map_redis_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, AppError> {
        let key = self.key(key);
        debug!("DEL {}", key);
        let mut conn = self.manager.clone();

        let deleted: i32 = conn.del(&key).await.map_err(Self::map_redis_error)?;
        Ok(deleted > 0)
    }
}

/// Build the storage adapter selected by configuration
pub async fn connect(config: &StorageConfig) -> Result<Arc<dyn StorageAdapter>, AppError> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory identity storage");
            Ok(Arc::new(MemoryStore::new(config.namespace.clone())))
        }
        StorageBackend::Redis => {
            let store = RedisStore::new(&config.redis_url, config.namespace.clone()).await?;
            info!("Using Redis identity storage at {}", config.redis_url);
            Ok(Arc::new(store))
        }
    }
}
