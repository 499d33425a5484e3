//! Estado de servicio del conductor
//!
//! Este módulo define las fases del ciclo de una jornada y el tipo de pausa.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fase actual de la jornada
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyStatus {
    #[default]
    Inactive,
    VehicleSelection,
    Inspection,
    ReadyToStart,
    OnJourney,
    Resting,
    Meal,
    Checkout,
}

/// Acumulador al que contribuye un segmento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Drive,
    Rest,
    Meal,
}

impl DutyStatus {
    /// Acumulador que corre mientras la jornada está en este estado
    pub fn bucket(self) -> Option<Bucket> {
        match self {
            DutyStatus::OnJourney => Some(Bucket::Drive),
            DutyStatus::Resting => Some(Bucket::Rest),
            DutyStatus::Meal => Some(Bucket::Meal),
            _ => None,
        }
    }

    /// Verificar si el estado acumula tiempo
    pub fn is_accruing(self) -> bool {
        self.bucket().is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DutyStatus::Inactive => "inactive",
            DutyStatus::VehicleSelection => "vehicle_selection",
            DutyStatus::Inspection => "inspection",
            DutyStatus::ReadyToStart => "ready_to_start",
            DutyStatus::OnJourney => "on_journey",
            DutyStatus::Resting => "resting",
            DutyStatus::Meal => "meal",
            DutyStatus::Checkout => "checkout",
        }
    }
}

impl fmt::Display for DutyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tipo de pausa solicitada por el conductor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseKind {
    Rest,
    Meal,
}

impl PauseKind {
    pub fn status(self) -> DutyStatus {
        match self {
            PauseKind::Rest => DutyStatus::Resting,
            PauseKind::Meal => DutyStatus::Meal,
        }
    }
}
