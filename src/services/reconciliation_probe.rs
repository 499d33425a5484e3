//! Sonda de reconciliación
//!
//! En un arranque en frío sin jornada local, pregunta al sistema remoto si el
//! conductor tiene una jornada activa. Con `ServerWins` el agregado se
//! reconstruye reproduciendo el registro remoto sobre las mismas transiciones
//! que usan los comandos, de modo que acumuladores y ancla de segmento quedan
//! coherentes por construcción.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::RemoteSyncClient;
use crate::dto::sync_dto::{JourneyEventType, JourneyRecord};
use crate::models::{Checklist, DutyStatus, JourneyAggregate, PauseKind, VehicleRef};

/// Política de fusión cuando el servidor conoce una jornada que el cliente no
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationPolicy {
    #[default]
    ServerWins, // El servidor siempre gana: se reconstruye la jornada local
    LocalWins,  // El cliente gana: se registra la divergencia y se sigue inactivo
}

impl FromStr for ReconciliationPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "server_wins" | "server" => Ok(ReconciliationPolicy::ServerWins),
            "local_wins" | "local" | "client_wins" => Ok(ReconciliationPolicy::LocalWins),
            other => Err(format!("unknown reconciliation policy: {}", other)),
        }
    }
}

/// Resultado de la sonda
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    NotAuthenticated,
    NoRemoteJourney,
    Adopted(JourneyAggregate),
    Ignored { journey_id: String },
    Unavailable(String),
}

pub struct ReconciliationProbe {
    remote: Arc<dyn RemoteSyncClient>,
    policy: ReconciliationPolicy,
}

impl ReconciliationProbe {
    pub fn new(remote: Arc<dyn RemoteSyncClient>, policy: ReconciliationPolicy) -> Self {
        Self { remote, policy }
    }

    pub async fn probe(&self, driver_id: &str) -> ProbeOutcome {
        if driver_id.trim().is_empty() {
            return ProbeOutcome::NotAuthenticated;
        }

        let record = match self.remote.fetch_active_journey(driver_id).await {
            Ok(Some(record)) => record,
            Ok(None) => return ProbeOutcome::NoRemoteJourney,
            Err(e) => {
                warn!("⚠️ No se pudo consultar la jornada activa de {}: {}", driver_id, e);
                return ProbeOutcome::Unavailable(e.to_string());
            }
        };

        match self.policy {
            ReconciliationPolicy::ServerWins => {
                let aggregate = reconstruct(&record);
                info!(
                    "🔄 Jornada remota {} adoptada para {} en estado {}",
                    record.journey_id, driver_id, aggregate.status
                );
                ProbeOutcome::Adopted(aggregate)
            }
            ReconciliationPolicy::LocalWins => {
                warn!(
                    "⚠️ Divergencia: jornada remota {} activa para {} sin estado local (política local_wins)",
                    record.journey_id, driver_id
                );
                ProbeOutcome::Ignored {
                    journey_id: record.journey_id,
                }
            }
        }
    }
}

/// Reconstruir el agregado a partir del registro remoto
pub fn reconstruct(record: &JourneyRecord) -> JourneyAggregate {
    let started_at = record.started_at;
    let vehicle = record.vehicle.clone().unwrap_or_else(|| VehicleRef {
        id: String::new(),
        plate: String::new(),
        model: String::new(),
    });

    let mut aggregate = JourneyAggregate {
        active: true,
        status: DutyStatus::ReadyToStart,
        checklist: record
            .checklist
            .as_ref()
            .map(Checklist::from_payload)
            .unwrap_or_default(),
        has_problems: record
            .checklist
            .as_ref()
            .map(|checklist| checklist.has_problems)
            .unwrap_or(false),
        ..JourneyAggregate::default()
    };

    aggregate.begin_journey(
        record.journey_id.clone(),
        vehicle,
        record.start_location.clone(),
        record.start_odometer.clone(),
        started_at,
    );

    let mut events = record.events.clone();
    events.sort_by_key(|event| event.occurred_at);

    for event in events {
        let at = event.occurred_at.max(started_at);
        let applied = match event.event_type {
            JourneyEventType::StartRest => aggregate.pause(PauseKind::Rest, at),
            JourneyEventType::StartMeal => aggregate.pause(PauseKind::Meal, at),
            JourneyEventType::EndRest => resume_if(&mut aggregate, DutyStatus::Resting, at),
            JourneyEventType::EndMeal => resume_if(&mut aggregate, DutyStatus::Meal, at),
        };
        if !applied {
            warn!(
                "⚠️ Evento {} fuera de secuencia en la jornada {}, ignorado",
                event.event_type.as_str(),
                record.journey_id
            );
        }
    }

    aggregate
}

fn resume_if(
    aggregate: &mut JourneyAggregate,
    expected: DutyStatus,
    at: chrono::DateTime<chrono::Utc>,
) -> bool {
    aggregate.status == expected && aggregate.resume(at).is_some()
}
