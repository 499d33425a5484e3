//! Cache en memoria
//!
//! Backend sin Redis para desarrollo local y tests. Respeta el TTL de cada
//! entrada, purga las expiradas en cada escritura y permite simular fallos de
//! lectura/escritura.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::CacheOperations;

// 10 años
const MAX_TTL_SECONDS: i64 = 315_360_000;

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    /// `None` = sin expiración
    expires_at: Option<DateTime<Utc>>,
}

impl MemoryEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

/// Cache clave/valor en memoria compartible entre sesiones
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, MemoryEntry>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hacer que todas las operaciones fallen (simulación de caída del store)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        let now = Utc::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.is_live(now))
            .count()
    }

    /// Número de entradas retenidas, incluidas las expiradas aún no purgadas
    pub async fn stored_entries(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn insert(&self, key: &str, entry: MemoryEntry) {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, existing| existing.is_live(now));
        entries.insert(key.to_string(), entry);
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow::anyhow!("Memory cache unavailable"));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CacheOperations for MemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        let entries = self.entries.read().await;
        let value = entries
            .get(key)
            .filter(|entry| entry.is_live(Utc::now()))
            .map(|entry| entry.value.clone());
        debug!("📥 Memory cache GET {}: {}", key, value.is_some());
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: String, ttl: u64) -> Result<()> {
        self.check_available()?;
        let ttl = i64::try_from(ttl).unwrap_or(MAX_TTL_SECONDS).min(MAX_TTL_SECONDS);
        let entry = MemoryEntry {
            value,
            expires_at: Some(Utc::now() + Duration::seconds(ttl)),
        };
        self.insert(key, entry).await;
        Ok(())
    }

    async fn set_persistent(&self, key: &str, value: String) -> Result<()> {
        self.check_available()?;
        let entry = MemoryEntry {
            value,
            expires_at: None,
        };
        self.insert(key, entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check_available()?;
        self.entries.write().await.remove(key);
        Ok(())
    }
}
