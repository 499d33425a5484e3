use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{JourneySnapshot, PauseKind, VehicleRef};
use crate::services::journey_session::CommandOutcome;

// Request para seleccionar vehículo
#[derive(Debug, Deserialize, Validate)]
pub struct SelectVehicleRequest {
    #[validate(length(min = 1, max = 64))]
    pub id: String,
    #[validate(length(min = 1, max = 20))]
    pub plate: String,
    #[serde(default)]
    pub model: String,
}

impl From<SelectVehicleRequest> for VehicleRef {
    fn from(request: SelectVehicleRequest) -> Self {
        VehicleRef {
            id: request.id,
            plate: request.plate,
            model: request.model,
        }
    }
}

// Request para evaluar un ítem del checklist
#[derive(Debug, Deserialize, Validate)]
pub struct EvaluateItemRequest {
    pub passed: bool,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompleteInspectionRequest {
    #[serde(default)]
    pub has_problems: bool,
}

// Request para iniciar la jornada
#[derive(Debug, Deserialize, Validate)]
pub struct StartJourneyRequest {
    #[validate(length(min = 1, max = 20))]
    pub odometer: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub location: String,
    pub vehicle: Option<VehicleRef>,
}

#[derive(Debug, Deserialize)]
pub struct PauseJourneyRequest {
    pub kind: PauseKind,
}

// Request para finalizar la jornada
#[derive(Debug, Deserialize, Validate)]
pub struct EndJourneyRequest {
    #[validate(length(min = 1, max = 20))]
    pub odometer: String,
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    #[validate(length(min = 1, max = 500))]
    pub location: String,
}

// Response común de los comandos
#[derive(Debug, Serialize)]
pub struct JourneyCommandResponse {
    pub success: bool,
    pub outcome: CommandOutcome,
    pub journey: JourneySnapshot,
}
