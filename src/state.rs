//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum: un registro de sesiones por conductor y los
//! colaboradores que todas comparten.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::CacheOperations;
use crate::clients::RemoteSyncClient;
use crate::config::environment::EnvironmentConfig;
use crate::services::{
    Clock, InFlightRegistry, JourneySession, JourneyStore, Outbox, OutboxWorker, SessionDeps,
};

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    deps: SessionDeps,
    sessions: Arc<RwLock<HashMap<String, Arc<JourneySession>>>>,
}

impl AppState {
    /// Crear el estado y el worker del outbox (que el llamador debe lanzar)
    pub fn new(
        config: EnvironmentConfig,
        cache: Arc<dyn CacheOperations>,
        remote: Arc<dyn RemoteSyncClient>,
        clock: Arc<dyn Clock>,
    ) -> (Self, OutboxWorker) {
        let (outbox, rx) = Outbox::channel();
        let worker = OutboxWorker::new(rx, Arc::clone(&remote));

        let deps = SessionDeps {
            store: JourneyStore::new(cache, config.cache_config()),
            remote,
            clock,
            in_flight: InFlightRegistry::new(),
            outbox,
            checklist_template: Arc::new(config.checklist_items.clone()),
            policy: config.reconciliation_policy,
        };

        let state = Self {
            config,
            deps,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        };
        (state, worker)
    }

    /// Obtener la sesión del conductor, creándola y restaurándola la primera vez
    pub async fn session(&self, driver_id: &str) -> Arc<JourneySession> {
        let existing = self.sessions.read().await.get(driver_id).cloned();
        let session = match existing {
            Some(session) => session,
            None => {
                let mut sessions = self.sessions.write().await;
                let session = sessions
                    .entry(driver_id.to_string())
                    .or_insert_with(|| {
                        info!("🔍 Sesión creada para {}", driver_id);
                        Arc::new(JourneySession::new(driver_id, self.deps.clone()))
                    });
                Arc::clone(session)
            }
        };

        // Fuera del lock del registro: cada conductor restaura por su cuenta
        session.restore().await;
        session
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Liberar las sesiones ociosas que nadie está usando. Devuelve cuántas.
    ///
    /// El registro queda bloqueado durante la revisión, así que ninguna
    /// petición puede tomar una sesión entre la comprobación y el borrado.
    pub async fn evict_idle_sessions(&self) -> usize {
        let mut sessions = self.sessions.write().await;

        let mut idle = Vec::new();
        for (driver_id, session) in sessions.iter() {
            if Arc::strong_count(session) == 1 && session.is_idle().await {
                idle.push(driver_id.clone());
            }
        }

        for driver_id in &idle {
            sessions.remove(driver_id);
            debug!("🧹 Sesión liberada para {}", driver_id);
        }
        idle.len()
    }

    /// Reintentar los cierres pendientes de todas las sesiones conocidas
    pub async fn retry_pending_finalizations(&self) -> usize {
        let sessions: Vec<Arc<JourneySession>> =
            self.sessions.read().await.values().cloned().collect();

        // Los conductores son independientes: reintentos en paralelo
        join_all(sessions.iter().map(|session| session.retry_pending_finalizations()))
            .await
            .into_iter()
            .sum()
    }
}
