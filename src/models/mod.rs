//! Modelos del sistema
//! 
//! Este módulo contiene el agregado de la jornada y los tipos que lo componen:
//! estado de servicio, checklist de inspección y vehículo.

pub mod checklist;
pub mod duty_status;
pub mod journey;

pub use checklist::{Checklist, ChecklistItem, ChecklistPayload, Evaluation};
pub use duty_status::{Bucket, DutyStatus, PauseKind};
pub use journey::{JourneyAggregate, JourneySnapshot, VehicleRef};
