//! Helpers compartidos por los tests de integración

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use duty_journey::cache::{CacheConfig, MemoryCache};
use duty_journey::clients::RemoteSyncClient;
use duty_journey::dto::sync_dto::{
    FinalizePayload, JourneyRecord, RegisterEventPayload, StartJourneyPayload,
    StartJourneyResponse,
};
use duty_journey::models::VehicleRef;
use duty_journey::services::{
    InFlightRegistry, JourneySession, JourneyStore, ManualClock, Outbox, OutboxWorker,
    ReconciliationPolicy, SessionDeps,
};
use duty_journey::utils::RemoteError;

pub const DRIVER: &str = "D-1";

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 8, 18, 6, 0, 0).unwrap()
}

pub fn vehicle() -> VehicleRef {
    VehicleRef {
        id: "veh-1".into(),
        plate: "AB-123-CD".into(),
        model: "Renault Master".into(),
    }
}

/// Sistema de registro simulado con respuestas programables
#[derive(Default)]
pub struct FakeRemote {
    pub start_calls: Mutex<Vec<StartJourneyPayload>>,
    pub events: Mutex<Vec<(String, RegisterEventPayload)>>,
    pub finalized: Mutex<Vec<(String, FinalizePayload)>>,
    pub start_error: Mutex<Option<RemoteError>>,
    pub event_error: Mutex<Option<RemoteError>>,
    pub finalize_error: Mutex<Option<RemoteError>>,
    pub active_journey: Mutex<Option<JourneyRecord>>,
    pub probe_error: Mutex<Option<RemoteError>>,
    /// Jornada cuyo cierre queda retenido hasta `release_finalize`
    pub held_finalize: Mutex<Option<String>>,
    pub finalize_entered: Notify,
    pub finalize_released: Notify,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn start_count(&self) -> usize {
        self.start_calls.lock().unwrap().len()
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, event)| event.event_type.as_str().to_string())
            .collect()
    }

    pub fn fail_starts(&self, error: Option<RemoteError>) {
        *self.start_error.lock().unwrap() = error;
    }

    pub fn fail_events(&self, error: Option<RemoteError>) {
        *self.event_error.lock().unwrap() = error;
    }

    pub fn fail_finalize(&self, error: Option<RemoteError>) {
        *self.finalize_error.lock().unwrap() = error;
    }

    pub fn hold_finalize(&self, journey_id: &str) {
        *self.held_finalize.lock().unwrap() = Some(journey_id.to_string());
    }

    pub fn release_finalize(&self) {
        self.finalize_released.notify_one();
    }

    pub fn finalize_count(&self) -> usize {
        self.finalized.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteSyncClient for FakeRemote {
    async fn start_journey(
        &self,
        payload: &StartJourneyPayload,
    ) -> Result<StartJourneyResponse, RemoteError> {
        let call = {
            let mut calls = self.start_calls.lock().unwrap();
            calls.push(payload.clone());
            calls.len()
        };
        // Simula latencia de red: cede el turno antes de responder
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        if let Some(error) = self.start_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(StartJourneyResponse {
            journey_id: format!("J-{}", call),
        })
    }

    async fn register_event(
        &self,
        journey_id: &str,
        event: &RegisterEventPayload,
    ) -> Result<(), RemoteError> {
        if let Some(error) = self.event_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.events
            .lock()
            .unwrap()
            .push((journey_id.to_string(), event.clone()));
        Ok(())
    }

    async fn finalize_journey(
        &self,
        journey_id: &str,
        payload: &FinalizePayload,
    ) -> Result<(), RemoteError> {
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        let held = self.held_finalize.lock().unwrap().as_deref() == Some(journey_id);
        if held {
            self.finalize_entered.notify_one();
            self.finalize_released.notified().await;
        }

        if let Some(error) = self.finalize_error.lock().unwrap().clone() {
            return Err(error);
        }
        self.finalized
            .lock()
            .unwrap()
            .push((journey_id.to_string(), payload.clone()));
        Ok(())
    }

    async fn fetch_active_journey(
        &self,
        _driver_id: &str,
    ) -> Result<Option<JourneyRecord>, RemoteError> {
        if let Some(error) = self.probe_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(self.active_journey.lock().unwrap().clone())
    }
}

/// Entorno de test: sesión, reloj manual, store en memoria y outbox
pub struct Harness {
    pub remote: Arc<FakeRemote>,
    pub clock: ManualClock,
    pub cache: MemoryCache,
    pub store: JourneyStore,
    pub deps: SessionDeps,
    pub worker: OutboxWorker,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_policy(ReconciliationPolicy::ServerWins)
    }

    pub fn with_policy(policy: ReconciliationPolicy) -> Self {
        let remote = FakeRemote::new();
        let clock = ManualClock::new(t0());
        let cache = MemoryCache::new();
        let store = JourneyStore::new(Arc::new(cache.clone()), CacheConfig::default());
        let (outbox, rx) = Outbox::channel();
        let worker = OutboxWorker::new(rx, remote.clone());

        let deps = SessionDeps {
            store: store.clone(),
            remote: remote.clone(),
            clock: Arc::new(clock.clone()),
            in_flight: InFlightRegistry::new(),
            outbox,
            checklist_template: Arc::new(vec![
                "tires".to_string(),
                "lights".to_string(),
                "brakes".to_string(),
            ]),
            policy,
        };

        Self {
            remote,
            clock,
            cache,
            store,
            deps,
            worker,
        }
    }

    /// Nueva sesión sobre el mismo store (simula un reinicio del proceso)
    pub fn session(&self) -> JourneySession {
        JourneySession::new(DRIVER, self.deps.clone())
    }
}
