//! Store durable de jornadas
//!
//! Un registro por conductor bajo una clave fija:
//!
//! ```text
//! <prefix>:journey:<driver_id>           # StoredJourney (agregado + checksum)
//! <prefix>:pending_finalize:<driver_id>  # Vec<PendingFinalize>
//! ```
//!
//! La ausencia de la clave significa "sin jornada activa". Cualquier fallo de
//! lectura se trata como "sin estado guardado" para no bloquear el arranque.
//!
//! La cola de cierres pendientes se escribe sin TTL y toda modificación pasa
//! por un mutex compartido entre los clones del store: leer, modificar y
//! escribir nunca se intercala con otra modificación.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheConfig, CacheOperations};
use crate::dto::sync_dto::FinalizePayload;
use crate::models::JourneyAggregate;
use crate::utils::errors::{AppError, AppResult};

/// Registro persistido de la jornada
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredJourney {
    pub aggregate: JourneyAggregate,
    pub checksum: String,
    pub saved_at: DateTime<Utc>,
}

/// Cierre de jornada pendiente de confirmar en el sistema remoto
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingFinalize {
    pub journey_id: String,
    pub payload: FinalizePayload,
    pub attempts: u32,
    pub queued_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

/// Adaptador del store durable sobre un backend de cache
#[derive(Clone)]
pub struct JourneyStore {
    cache: Arc<dyn CacheOperations>,
    config: CacheConfig,
    pending_lock: Arc<Mutex<()>>,
}

impl JourneyStore {
    pub fn new(cache: Arc<dyn CacheOperations>, config: CacheConfig) -> Self {
        Self {
            cache,
            config,
            pending_lock: Arc::new(Mutex::new(())),
        }
    }

    fn journey_key(&self, driver_id: &str) -> String {
        self.config.make_key("journey", driver_id)
    }

    fn pending_key(&self, driver_id: &str) -> String {
        self.config.make_key("pending_finalize", driver_id)
    }

    // ── Jornada activa ──

    /// Guardar el agregado completo
    pub async fn save(&self, driver_id: &str, aggregate: &JourneyAggregate) -> AppResult<()> {
        let record = StoredJourney {
            aggregate: aggregate.clone(),
            checksum: checksum(aggregate)?,
            saved_at: Utc::now(),
        };
        let json = to_json(&record)?;
        self.write(&self.journey_key(driver_id), json, Some(self.config.default_ttl))
            .await?;
        debug!("💾 Jornada guardada para {} ({})", driver_id, aggregate.status);
        Ok(())
    }

    /// Eliminar el registro del conductor
    pub async fn clear(&self, driver_id: &str) -> AppResult<()> {
        self.cache
            .delete(&self.journey_key(driver_id))
            .await
            .map_err(|e| AppError::Store(e.to_string()))?;
        debug!("🗑️ Jornada eliminada del store para {}", driver_id);
        Ok(())
    }

    /// Recuperar el agregado activo, si existe y es íntegro
    pub async fn load(&self, driver_id: &str) -> Option<JourneyAggregate> {
        let record: StoredJourney = self.read_json(&self.journey_key(driver_id)).await?;

        match checksum(&record.aggregate) {
            Ok(expected) if expected == record.checksum => {}
            _ => {
                warn!("⚠️ Checksum inválido en la jornada guardada de {}, se descarta", driver_id);
                return None;
            }
        }

        if !record.aggregate.active {
            warn!("⚠️ Jornada guardada inactiva para {}, se ignora", driver_id);
            return None;
        }

        info!(
            "✅ Jornada recuperada para {} en estado {}",
            driver_id, record.aggregate.status
        );
        Some(record.aggregate)
    }

    // ── Cierres pendientes ──

    pub async fn load_pending_finalizations(&self, driver_id: &str) -> Vec<PendingFinalize> {
        self.read_json(&self.pending_key(driver_id))
            .await
            .unwrap_or_default()
    }

    pub async fn enqueue_pending_finalize(
        &self,
        driver_id: &str,
        entry: PendingFinalize,
    ) -> AppResult<()> {
        let _lock = self.pending_lock.lock().await;
        let mut pending = self.load_pending_finalizations(driver_id).await;
        pending.retain(|existing| existing.journey_id != entry.journey_id);
        pending.push(entry);
        self.write_pending(driver_id, &pending).await
    }

    /// Aplicar el resultado de un reintento sobre la cola actual.
    ///
    /// `resolved` se elimina y cada entrada de `retried` reemplaza a la de su
    /// misma jornada si sigue en cola. Lo encolado mientras tanto se conserva.
    /// Devuelve cuántas entradas quedan.
    pub async fn settle_pending_finalizations(
        &self,
        driver_id: &str,
        resolved: &[String],
        retried: &[PendingFinalize],
    ) -> AppResult<usize> {
        let _lock = self.pending_lock.lock().await;
        let mut pending = self.load_pending_finalizations(driver_id).await;
        pending.retain(|entry| !resolved.contains(&entry.journey_id));
        for entry in pending.iter_mut() {
            if let Some(updated) = retried.iter().find(|r| r.journey_id == entry.journey_id) {
                *entry = updated.clone();
            }
        }
        self.write_pending(driver_id, &pending).await?;
        Ok(pending.len())
    }

    /// Cola vacía = eliminar la clave
    async fn write_pending(&self, driver_id: &str, pending: &[PendingFinalize]) -> AppResult<()> {
        let key = self.pending_key(driver_id);
        if pending.is_empty() {
            return self
                .cache
                .delete(&key)
                .await
                .map_err(|e| AppError::Store(e.to_string()));
        }
        self.write(&key, to_json(&pending)?, None).await
    }

    // ── Helpers ──

    async fn write(&self, key: &str, json: String, ttl: Option<u64>) -> AppResult<()> {
        let result = match ttl {
            Some(ttl) => self.cache.set_raw(key, json, ttl).await,
            None => self.cache.set_persistent(key, json).await,
        };
        result.map_err(|e| {
            error!("❌ Error escribiendo {} en el store: {}", key, e);
            AppError::Store(e.to_string())
        })
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.cache.get_raw(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!("❌ Error leyendo {} del store: {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("⚠️ Registro ilegible en {}: {}", key, e);
                None
            }
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string(value).map_err(|e| AppError::Internal(e.to_string()))
}

/// Checksum MD5 del agregado serializado
fn checksum(aggregate: &JourneyAggregate) -> AppResult<String> {
    let json = to_json(aggregate)?;
    Ok(format!("{:x}", md5::compute(json.as_bytes())))
}
