//! Modelo de Journey
//!
//! El agregado de la jornada: estado, acumulador, checklist y datos del
//! vehículo. Todas las transiciones son síncronas y puras respecto al
//! instante recibido; la persistencia y la sincronización remota viven en
//! `services::journey_session`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::checklist::{Checklist, Evaluation};
use crate::models::duty_status::{Bucket, DutyStatus, PauseKind};
use crate::services::segment_clock::elapsed_seconds;
use crate::services::time_accumulator::{Accumulated, TimeAccumulator};

/// Vehículo seleccionado para la jornada
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleRef {
    pub id: String,
    pub plate: String,
    pub model: String,
}

/// Agregado de la jornada activa de un conductor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JourneyAggregate {
    pub active: bool,
    pub journey_id: Option<String>,
    pub status: DutyStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub vehicle: Option<VehicleRef>,
    pub last_location: String,
    pub start_odometer: String,
    #[serde(flatten)]
    pub time: TimeAccumulator,
    pub checklist: Checklist,
    pub has_problems: bool,
}

/// Vista de solo lectura para la capa de presentación
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneySnapshot {
    pub active: bool,
    pub status: DutyStatus,
    pub journey_id: Option<String>,
    pub vehicle: Option<VehicleRef>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_location: String,
    pub start_odometer: String,
    pub has_problems: bool,
    pub checklist: Checklist,
    pub total_elapsed: u64,
    pub drive_seconds: u64,
    pub rest_seconds: u64,
    pub meal_seconds: u64,
}

impl JourneyAggregate {
    // ── Transiciones ──

    /// inactive → vehicle_selection
    pub fn select_vehicle(&mut self, vehicle: VehicleRef, now: DateTime<Utc>) -> bool {
        if self.status != DutyStatus::Inactive {
            return false;
        }
        self.active = true;
        self.vehicle = Some(vehicle);
        self.transition(DutyStatus::VehicleSelection, now);
        true
    }

    /// vehicle_selection → inspection, sembrando el checklist con la plantilla
    pub fn start_inspection<S: AsRef<str>>(&mut self, template: &[S], now: DateTime<Utc>) -> bool {
        if self.status != DutyStatus::VehicleSelection {
            return false;
        }
        self.checklist = Checklist::from_template(template);
        self.transition(DutyStatus::Inspection, now);
        true
    }

    /// Evaluar un ítem; el checklist no se bloquea al completar la inspección
    pub fn evaluate_item(&mut self, item_id: &str, evaluation: Evaluation) -> bool {
        if !matches!(
            self.status,
            DutyStatus::Inspection | DutyStatus::ReadyToStart
        ) {
            return false;
        }
        self.checklist.evaluate(item_id, evaluation);
        true
    }

    /// inspection → ready_to_start
    pub fn complete_inspection(&mut self, has_problems: bool, now: DateTime<Utc>) -> bool {
        if self.status != DutyStatus::Inspection {
            return false;
        }
        self.has_problems = has_problems;
        self.transition(DutyStatus::ReadyToStart, now);
        true
    }

    /// ready_to_start → on_journey, una vez que el sistema remoto asignó el id
    pub fn begin_journey(
        &mut self,
        journey_id: String,
        vehicle: VehicleRef,
        location: String,
        odometer: String,
        now: DateTime<Utc>,
    ) -> bool {
        if self.status != DutyStatus::ReadyToStart {
            return false;
        }
        if self.journey_id.is_none() {
            self.journey_id = Some(journey_id);
        }
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        self.vehicle = Some(vehicle);
        self.last_location = location;
        self.start_odometer = odometer;
        self.transition(DutyStatus::OnJourney, now);
        true
    }

    /// on_journey → resting | meal
    pub fn pause(&mut self, kind: PauseKind, now: DateTime<Utc>) -> bool {
        if self.status != DutyStatus::OnJourney {
            return false;
        }
        self.transition(kind.status(), now);
        true
    }

    /// resting | meal → on_journey. Devuelve la pausa que se cerró.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Option<PauseKind> {
        let closed = self.current_pause()?;
        self.transition(DutyStatus::OnJourney, now);
        Some(closed)
    }

    /// on_journey | resting | meal → checkout. Devuelve la pausa abierta, si la había.
    pub fn start_checkout(&mut self, now: DateTime<Utc>) -> Option<Option<PauseKind>> {
        if !self.status.is_accruing() {
            return None;
        }
        let closed = self.current_pause();
        self.transition(DutyStatus::Checkout, now);
        Some(closed)
    }

    pub fn update_location(&mut self, location: String) -> bool {
        if self.status == DutyStatus::Inactive {
            return false;
        }
        self.last_location = location;
        true
    }

    /// Volver a los valores por defecto (fin o cancelación)
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn current_pause(&self) -> Option<PauseKind> {
        match self.status {
            DutyStatus::Resting => Some(PauseKind::Rest),
            DutyStatus::Meal => Some(PauseKind::Meal),
            _ => None,
        }
    }

    fn transition(&mut self, to: DutyStatus, now: DateTime<Utc>) {
        let from = self.status;
        self.time.on_transition(from, to, now);
        self.status = to;
        debug_assert!(self.is_consistent(), "inconsistent aggregate after {from} -> {to}");
    }

    // ── Getters derivados ──

    pub fn accumulated(&self) -> Accumulated {
        self.time.accumulated
    }

    pub fn total_elapsed(&self, now: DateTime<Utc>) -> u64 {
        match (self.active, self.started_at) {
            (true, Some(started_at)) => elapsed_seconds(started_at, now),
            _ => 0,
        }
    }

    pub fn drive_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.time.live_seconds(self.status, Bucket::Drive, now)
    }

    pub fn rest_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.time.live_seconds(self.status, Bucket::Rest, now)
    }

    pub fn meal_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.time.live_seconds(self.status, Bucket::Meal, now)
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> JourneySnapshot {
        JourneySnapshot {
            active: self.active,
            status: self.status,
            journey_id: self.journey_id.clone(),
            vehicle: self.vehicle.clone(),
            started_at: self.started_at,
            last_location: self.last_location.clone(),
            start_odometer: self.start_odometer.clone(),
            has_problems: self.has_problems,
            checklist: self.checklist.clone(),
            total_elapsed: self.total_elapsed(now),
            drive_seconds: self.drive_seconds(now),
            rest_seconds: self.rest_seconds(now),
            meal_seconds: self.meal_seconds(now),
        }
    }

    /// El store solo guarda la jornada a partir de la inspección
    pub fn should_persist(&self) -> bool {
        self.active && self.status != DutyStatus::VehicleSelection
    }

    /// Invariantes estructurales del agregado
    pub fn is_consistent(&self) -> bool {
        let segment_ok = self.time.current_segment_start.is_some() == self.status.is_accruing();
        let inactive_ok = self.active || *self == Self::default();
        let id_ok = match self.status {
            DutyStatus::OnJourney
            | DutyStatus::Resting
            | DutyStatus::Meal
            | DutyStatus::Checkout => true,
            _ => self.journey_id.is_none(),
        };
        segment_ok && inactive_ok && id_ok
    }
}
