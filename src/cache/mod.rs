//! Cache
//! 
//! Este módulo contiene los backends de almacenamiento clave/valor usados por
//! el store durable de jornadas: Redis en producción y memoria en desarrollo/tests.

pub mod cache_config;
pub mod memory_cache;
pub mod redis_client;

use anyhow::Result;

pub use cache_config::CacheConfig;
pub use memory_cache::MemoryCache;
pub use redis_client::RedisClient;

/// Operaciones de cache sobre valores serializados
#[async_trait::async_trait]
pub trait CacheOperations: Send + Sync {
    async fn get_raw(&self, key: &str) -> Result<Option<String>>;

    async fn set_raw(&self, key: &str, value: String, ttl: u64) -> Result<()>;

    /// Escribir sin expiración
    async fn set_persistent(&self, key: &str, value: String) -> Result<()>;

    async fn delete(&self, key: &str) -> Result<()>;
}
