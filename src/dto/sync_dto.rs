//! DTOs del sistema de registro remoto
//!
//! Formas JSON intercambiadas con el sistema de registro (camelCase).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChecklistPayload, PauseKind, VehicleRef};

/// Envoltorio estándar de las respuestas remotas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

/// Payload de inicio de jornada
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJourneyPayload {
    pub driver_id: String,
    pub vehicle_id: String,
    pub start_location: String,
    pub start_odometer: String,
    pub checklist: ChecklistPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartJourneyResponse {
    pub journey_id: String,
}

/// Hitos de pausa registrados en el sistema remoto
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JourneyEventType {
    StartRest,
    EndRest,
    StartMeal,
    EndMeal,
}

impl JourneyEventType {
    pub fn starting(kind: PauseKind) -> Self {
        match kind {
            PauseKind::Rest => JourneyEventType::StartRest,
            PauseKind::Meal => JourneyEventType::StartMeal,
        }
    }

    pub fn ending(kind: PauseKind) -> Self {
        match kind {
            PauseKind::Rest => JourneyEventType::EndRest,
            PauseKind::Meal => JourneyEventType::EndMeal,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JourneyEventType::StartRest => "start_rest",
            JourneyEventType::EndRest => "end_rest",
            JourneyEventType::StartMeal => "start_meal",
            JourneyEventType::EndMeal => "end_meal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterEventPayload {
    #[serde(rename = "type")]
    pub event_type: JourneyEventType,
    pub location: String,
    pub occurred_at: DateTime<Utc>,
}

/// Payload de cierre de jornada
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizePayload {
    pub end_location: String,
    pub end_odometer: String,
    pub checklist: ChecklistPayload,
}

/// Evento ya registrado en el sistema remoto
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyEventRecord {
    #[serde(rename = "type")]
    pub event_type: JourneyEventType,
    pub occurred_at: DateTime<Utc>,
}

/// Jornada activa según el sistema remoto
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyRecord {
    pub journey_id: String,
    pub driver_id: String,
    pub vehicle: Option<VehicleRef>,
    #[serde(default)]
    pub start_location: String,
    #[serde(default)]
    pub start_odometer: String,
    pub started_at: DateTime<Utc>,
    pub checklist: Option<ChecklistPayload>,
    #[serde(default)]
    pub events: Vec<JourneyEventRecord>,
}
