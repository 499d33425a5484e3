//! Sesión de jornada por conductor
//!
//! Dueña única del agregado de un conductor. Cada comando aplica la
//! transición local bajo el lock de escritura, persiste el resultado y, si
//! corresponde, habla con el sistema remoto:
//!
//! - `start_journey` solo avanza si el sistema remoto devuelve un id.
//! - pausas y reanudaciones publican en el outbox sin esperar respuesta.
//! - `end_journey` limpia el estado local siempre; un cierre fallido queda
//!   en la cola de cierres pendientes.
//! - `cancel_journey` nunca llama al sistema remoto.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, error, info, warn};

use crate::clients::RemoteSyncClient;
use crate::dto::sync_dto::{FinalizePayload, JourneyEventType, StartJourneyPayload};
use crate::models::{DutyStatus, Evaluation, JourneyAggregate, JourneySnapshot, PauseKind, VehicleRef};
use crate::services::in_flight::InFlightRegistry;
use crate::services::journey_store::{JourneyStore, PendingFinalize};
use crate::services::outbox::{Outbox, OutboxMessage};
use crate::services::reconciliation_probe::{ProbeOutcome, ReconciliationPolicy, ReconciliationProbe};
use crate::services::segment_clock::Clock;
use crate::utils::errors::{validation_error, AppError, AppResult};
use crate::utils::validation::{require_driver_id, require_odometer};

/// Resultado observable de un comando
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandOutcome {
    Applied,
    /// El estado actual no define la transición; nada cambió
    Ignored,
    FinalizeQueued { reason: String },
}

/// Origen del estado inicial de la sesión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    Store,
    Remote,
    Fresh,
}

/// Datos de inicio de jornada
#[derive(Debug, Clone, Default)]
pub struct StartJourneyCommand {
    pub odometer: String,
    pub location: String,
    pub vehicle: Option<VehicleRef>,
}

/// Colaboradores compartidos por todas las sesiones
#[derive(Clone)]
pub struct SessionDeps {
    pub store: JourneyStore,
    pub remote: Arc<dyn RemoteSyncClient>,
    pub clock: Arc<dyn Clock>,
    pub in_flight: InFlightRegistry,
    pub outbox: Outbox,
    pub checklist_template: Arc<Vec<String>>,
    pub policy: ReconciliationPolicy,
}

pub struct JourneySession {
    driver_id: String,
    aggregate: RwLock<JourneyAggregate>,
    restored: OnceCell<RestoreSource>,
    deps: SessionDeps,
}

impl JourneySession {
    pub fn new(driver_id: impl Into<String>, deps: SessionDeps) -> Self {
        Self {
            driver_id: driver_id.into(),
            aggregate: RwLock::new(JourneyAggregate::default()),
            restored: OnceCell::new(),
            deps,
        }
    }

    pub fn driver_id(&self) -> &str {
        &self.driver_id
    }

    /// Arranque en frío: store local, después sonda remota, después reintentos.
    /// Solo se ejecuta una vez por sesión; las llamadas siguientes devuelven el
    /// origen ya resuelto.
    pub async fn restore(&self) -> RestoreSource {
        *self.restored.get_or_init(|| self.load_initial_state()).await
    }

    async fn load_initial_state(&self) -> RestoreSource {
        let source = match self.deps.store.load(&self.driver_id).await {
            Some(stored) => {
                *self.aggregate.write().await = stored;
                RestoreSource::Store
            }
            None => self.reconcile().await,
        };

        let remaining = self.retry_pending_finalizations().await;
        if remaining > 0 {
            warn!(
                "⚠️ {} cierres de jornada siguen pendientes para {}",
                remaining, self.driver_id
            );
        }

        source
    }

    async fn reconcile(&self) -> RestoreSource {
        let probe = ReconciliationProbe::new(Arc::clone(&self.deps.remote), self.deps.policy);
        match probe.probe(&self.driver_id).await {
            ProbeOutcome::Adopted(aggregate) => {
                let mut current = self.aggregate.write().await;
                *current = aggregate;
                self.persist(&current).await;
                RestoreSource::Remote
            }
            ProbeOutcome::NotAuthenticated => {
                debug!("🔍 Sin identidad de conductor, se omite la reconciliación");
                RestoreSource::Fresh
            }
            ProbeOutcome::Ignored { journey_id } => {
                info!(
                    "ℹ️ {} arranca inactivo; la jornada remota {} queda sin adoptar",
                    self.driver_id, journey_id
                );
                RestoreSource::Fresh
            }
            ProbeOutcome::NoRemoteJourney | ProbeOutcome::Unavailable(_) => RestoreSource::Fresh,
        }
    }

    // ── Lecturas ──

    pub async fn snapshot(&self) -> JourneySnapshot {
        let now = self.deps.clock.now();
        self.aggregate.read().await.snapshot(now)
    }

    pub async fn aggregate(&self) -> JourneyAggregate {
        self.aggregate.read().await.clone()
    }

    /// Restaurada, inactiva y sin cierres pendientes: se puede liberar
    pub async fn is_idle(&self) -> bool {
        if self.restored.get().is_none() {
            return false;
        }
        if self.aggregate.read().await.status != DutyStatus::Inactive {
            return false;
        }
        self.deps
            .store
            .load_pending_finalizations(&self.driver_id)
            .await
            .is_empty()
    }

    // ── Comandos locales ──

    pub async fn select_vehicle(&self, vehicle: VehicleRef) -> AppResult<CommandOutcome> {
        if vehicle.id.trim().is_empty() {
            return Err(validation_error("vehicle", "vehicle id is required"));
        }

        let now = self.deps.clock.now();
        let mut aggregate = self.aggregate.write().await;
        let from = aggregate.status;
        if !aggregate.select_vehicle(vehicle, now) {
            return Ok(self.ignored("select_vehicle", from));
        }
        self.persist(&aggregate).await;
        Ok(self.applied(from, aggregate.status))
    }

    pub async fn start_inspection(&self) -> AppResult<CommandOutcome> {
        let now = self.deps.clock.now();
        let mut aggregate = self.aggregate.write().await;
        let from = aggregate.status;
        if !aggregate.start_inspection(self.deps.checklist_template.as_slice(), now) {
            return Ok(self.ignored("start_inspection", from));
        }
        self.persist(&aggregate).await;
        Ok(self.applied(from, aggregate.status))
    }

    /// Alias de `start_inspection`
    pub async fn confirm_vehicle_selection(&self) -> AppResult<CommandOutcome> {
        self.start_inspection().await
    }

    pub async fn evaluate_item(
        &self,
        item_id: &str,
        evaluation: Evaluation,
    ) -> AppResult<CommandOutcome> {
        if item_id.trim().is_empty() {
            return Err(validation_error("item_id", "checklist item id is required"));
        }

        let mut aggregate = self.aggregate.write().await;
        if !aggregate.evaluate_item(item_id, evaluation) {
            return Ok(self.ignored("evaluate_item", aggregate.status));
        }
        self.persist(&aggregate).await;
        debug!("🔍 Ítem {} evaluado para {}", item_id, self.driver_id);
        Ok(CommandOutcome::Applied)
    }

    pub async fn complete_inspection(&self, has_problems: bool) -> AppResult<CommandOutcome> {
        let now = self.deps.clock.now();
        let mut aggregate = self.aggregate.write().await;
        let from = aggregate.status;
        if !aggregate.complete_inspection(has_problems, now) {
            return Ok(self.ignored("complete_inspection", from));
        }
        self.persist(&aggregate).await;
        Ok(self.applied(from, aggregate.status))
    }

    pub async fn update_location(&self, location: &str) -> AppResult<CommandOutcome> {
        if location.trim().is_empty() {
            return Err(validation_error("location", "location is required"));
        }

        let mut aggregate = self.aggregate.write().await;
        if !aggregate.update_location(location.trim().to_string()) {
            return Ok(self.ignored("update_location", aggregate.status));
        }
        self.persist(&aggregate).await;
        Ok(CommandOutcome::Applied)
    }

    // ── Comandos con sistema remoto ──

    pub async fn start_journey(&self, command: StartJourneyCommand) -> AppResult<CommandOutcome> {
        // Debe ser el primer paso, antes de cualquier await
        let _guard = self
            .deps
            .in_flight
            .try_acquire(&format!("start:{}", self.driver_id))
            .ok_or_else(|| AppError::StartInFlight(self.driver_id.clone()))?;

        let (payload, vehicle) = {
            let aggregate = self.aggregate.read().await;
            if aggregate.status != DutyStatus::ReadyToStart {
                return Ok(self.ignored("start_journey", aggregate.status));
            }

            require_driver_id(&self.driver_id)?;
            let vehicle = command
                .vehicle
                .clone()
                .or_else(|| aggregate.vehicle.clone())
                .filter(|vehicle| !vehicle.id.trim().is_empty())
                .ok_or_else(|| validation_error("vehicle", "a vehicle must be selected"))?;
            require_odometer(&command.odometer)?;

            let location = if command.location.trim().is_empty() {
                aggregate.last_location.clone()
            } else {
                command.location.trim().to_string()
            };

            let payload = StartJourneyPayload {
                driver_id: self.driver_id.clone(),
                vehicle_id: vehicle.id.clone(),
                start_location: location,
                start_odometer: command.odometer.trim().to_string(),
                checklist: aggregate.checklist.to_payload(aggregate.has_problems),
            };
            (payload, vehicle)
        };

        let response = self.deps.remote.start_journey(&payload).await.map_err(|e| {
            warn!("⚠️ Inicio de jornada rechazado para {}: {}", self.driver_id, e);
            AppError::Remote(e)
        })?;

        let now = self.deps.clock.now();
        let mut aggregate = self.aggregate.write().await;
        if aggregate.status != DutyStatus::ReadyToStart {
            warn!(
                "⚠️ Jornada remota {} huérfana: {} pasó a {} durante el inicio",
                response.journey_id, self.driver_id, aggregate.status
            );
            return Err(AppError::StateChanged(format!(
                "status is {} (remote journey {} not applied)",
                aggregate.status, response.journey_id
            )));
        }

        let from = aggregate.status;
        aggregate.begin_journey(
            response.journey_id.clone(),
            vehicle,
            payload.start_location,
            payload.start_odometer,
            now,
        );
        self.persist(&aggregate).await;
        info!(
            "🚚 Jornada {} iniciada para {}",
            response.journey_id, self.driver_id
        );
        Ok(self.applied(from, aggregate.status))
    }

    pub async fn pause_journey(&self, kind: PauseKind) -> AppResult<CommandOutcome> {
        let now = self.deps.clock.now();
        let mut aggregate = self.aggregate.write().await;
        let from = aggregate.status;
        if !aggregate.pause(kind, now) {
            return Ok(self.ignored("pause_journey", from));
        }
        self.persist(&aggregate).await;
        self.publish(&aggregate, JourneyEventType::starting(kind), now);
        Ok(self.applied(from, aggregate.status))
    }

    pub async fn resume_journey(&self) -> AppResult<CommandOutcome> {
        let now = self.deps.clock.now();
        let mut aggregate = self.aggregate.write().await;
        let from = aggregate.status;
        let Some(closed) = aggregate.resume(now) else {
            return Ok(self.ignored("resume_journey", from));
        };
        self.persist(&aggregate).await;
        self.publish(&aggregate, JourneyEventType::ending(closed), now);
        Ok(self.applied(from, aggregate.status))
    }

    pub async fn start_checkout(&self) -> AppResult<CommandOutcome> {
        let now = self.deps.clock.now();
        let mut aggregate = self.aggregate.write().await;
        let from = aggregate.status;
        let Some(closed) = aggregate.start_checkout(now) else {
            return Ok(self.ignored("start_checkout", from));
        };
        self.persist(&aggregate).await;
        if let Some(kind) = closed {
            self.publish(&aggregate, JourneyEventType::ending(kind), now);
        }
        Ok(self.applied(from, aggregate.status))
    }

    pub async fn end_journey(&self, odometer: &str, notes: &str) -> AppResult<CommandOutcome> {
        // Igual que el inicio: un solo cierre en vuelo por conductor
        let _guard = self
            .deps
            .in_flight
            .try_acquire(&format!("end:{}", self.driver_id))
            .ok_or_else(|| AppError::EndInFlight(self.driver_id.clone()))?;

        let (journey_id, payload) = {
            let aggregate = self.aggregate.read().await;
            if aggregate.status != DutyStatus::Checkout {
                return Ok(self.ignored("end_journey", aggregate.status));
            }
            require_odometer(odometer)?;

            let journey_id = aggregate
                .journey_id
                .clone()
                .ok_or_else(|| AppError::Internal("checkout without journey id".to_string()))?;

            let mut checklist = aggregate.checklist.to_payload(aggregate.has_problems);
            let notes = notes.trim();
            if !notes.is_empty() {
                checklist.notes = if checklist.notes.is_empty() {
                    notes.to_string()
                } else {
                    format!("{}; {}", checklist.notes, notes)
                };
            }

            let payload = FinalizePayload {
                end_location: aggregate.last_location.clone(),
                end_odometer: odometer.trim().to_string(),
                checklist,
            };
            (journey_id, payload)
        };

        let result = self.deps.remote.finalize_journey(&journey_id, &payload).await;

        {
            let mut aggregate = self.aggregate.write().await;
            if aggregate.journey_id.as_deref() == Some(journey_id.as_str()) {
                aggregate.reset();
                self.persist(&aggregate).await;
            }
        }

        match result {
            Ok(()) => {
                info!("🏁 Jornada {} finalizada para {}", journey_id, self.driver_id);
                Ok(CommandOutcome::Applied)
            }
            Err(e) if e.is_retryable() => {
                warn!(
                    "⚠️ Cierre de la jornada {} no confirmado, queda pendiente: {}",
                    journey_id, e
                );
                let entry = PendingFinalize {
                    journey_id,
                    payload,
                    attempts: 1,
                    queued_at: self.deps.clock.now(),
                    last_error: Some(e.to_string()),
                };
                if let Err(store_error) = self
                    .deps
                    .store
                    .enqueue_pending_finalize(&self.driver_id, entry)
                    .await
                {
                    error!(
                        "❌ No se pudo encolar el cierre pendiente de {}: {}",
                        self.driver_id, store_error
                    );
                }
                Ok(CommandOutcome::FinalizeQueued {
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                error!(
                    "❌ Cierre de la jornada {} rechazado por el sistema remoto: {}",
                    journey_id, e
                );
                Err(AppError::Remote(e))
            }
        }
    }

    /// Cancelación local inmediata, sin llamada remota
    pub async fn cancel_journey(&self) -> AppResult<CommandOutcome> {
        let mut aggregate = self.aggregate.write().await;
        let from = aggregate.status;
        if from == DutyStatus::Inactive {
            return Ok(self.ignored("cancel_journey", from));
        }
        aggregate.reset();
        self.persist(&aggregate).await;
        Ok(self.applied(from, aggregate.status))
    }

    /// Reintentar los cierres pendientes. Devuelve cuántos siguen en cola.
    pub async fn retry_pending_finalizations(&self) -> usize {
        let Some(_guard) = self
            .deps
            .in_flight
            .try_acquire(&format!("finalize:{}", self.driver_id))
        else {
            debug!("🔄 Reintento de cierres ya en curso para {}", self.driver_id);
            return 0;
        };

        let pending = self.deps.store.load_pending_finalizations(&self.driver_id).await;
        if pending.is_empty() {
            return 0;
        }

        let mut resolved = Vec::new();
        let mut retried = Vec::new();
        for mut entry in pending {
            match self
                .deps
                .remote
                .finalize_journey(&entry.journey_id, &entry.payload)
                .await
            {
                Ok(()) => {
                    info!(
                        "✅ Cierre pendiente de la jornada {} confirmado tras {} intentos",
                        entry.journey_id, entry.attempts
                    );
                    resolved.push(entry.journey_id);
                }
                Err(e) if !e.is_retryable() => {
                    error!(
                        "❌ Cierre pendiente de la jornada {} rechazado, se descarta: {}",
                        entry.journey_id, e
                    );
                    resolved.push(entry.journey_id);
                }
                Err(e) => {
                    entry.attempts += 1;
                    entry.last_error = Some(e.to_string());
                    retried.push(entry);
                }
            }
        }

        // Se asienta sobre la cola actual: lo encolado durante los reintentos se conserva
        match self
            .deps
            .store
            .settle_pending_finalizations(&self.driver_id, &resolved, &retried)
            .await
        {
            Ok(remaining) => remaining,
            Err(e) => {
                error!("❌ No se pudo actualizar la cola de cierres de {}: {}", self.driver_id, e);
                retried.len()
            }
        }
    }

    // ── Helpers ──

    /// Guardar o limpiar según el estado; un fallo del store no es fatal
    async fn persist(&self, aggregate: &JourneyAggregate) {
        let result = if aggregate.should_persist() {
            self.deps.store.save(&self.driver_id, aggregate).await
        } else if !aggregate.active {
            self.deps.store.clear(&self.driver_id).await
        } else {
            Ok(())
        };

        if let Err(e) = result {
            error!("❌ Error de persistencia para {}: {}", self.driver_id, e);
        }
    }

    fn publish(
        &self,
        aggregate: &JourneyAggregate,
        event_type: JourneyEventType,
        occurred_at: chrono::DateTime<Utc>,
    ) {
        if let Some(journey_id) = &aggregate.journey_id {
            self.deps.outbox.publish(OutboxMessage::new(
                &self.driver_id,
                journey_id,
                event_type,
                &aggregate.last_location,
                occurred_at,
            ));
        }
    }

    fn applied(&self, from: DutyStatus, to: DutyStatus) -> CommandOutcome {
        info!("✅ {}: {} -> {}", self.driver_id, from, to);
        CommandOutcome::Applied
    }

    fn ignored(&self, command: &str, status: DutyStatus) -> CommandOutcome {
        debug!("{} ignorado para {} en estado {}", command, self.driver_id, status);
        CommandOutcome::Ignored
    }
}
