use std::sync::Arc;

use crate::dto::journey_dto::{
    CompleteInspectionRequest, EndJourneyRequest, EvaluateItemRequest, JourneyCommandResponse,
    PauseJourneyRequest, SelectVehicleRequest, StartJourneyRequest, UpdateLocationRequest,
};
use crate::models::{Evaluation, JourneySnapshot};
use crate::services::{CommandOutcome, JourneySession, StartJourneyCommand};
use crate::utils::errors::AppError;

pub struct JourneyController {
    session: Arc<JourneySession>,
}

impl JourneyController {
    pub fn new(session: Arc<JourneySession>) -> Self {
        Self { session }
    }

    pub async fn get(&self) -> JourneySnapshot {
        self.session.snapshot().await
    }

    pub async fn select_vehicle(
        &self,
        request: SelectVehicleRequest,
    ) -> Result<JourneyCommandResponse, AppError> {
        let outcome = self.session.select_vehicle(request.into()).await?;
        Ok(self.respond(outcome).await)
    }

    pub async fn start_inspection(&self) -> Result<JourneyCommandResponse, AppError> {
        let outcome = self.session.confirm_vehicle_selection().await?;
        Ok(self.respond(outcome).await)
    }

    pub async fn evaluate_item(
        &self,
        item_id: &str,
        request: EvaluateItemRequest,
    ) -> Result<JourneyCommandResponse, AppError> {
        let evaluation = if request.passed {
            Evaluation::Passed
        } else {
            Evaluation::Failed {
                note: request.note.unwrap_or_default().trim().to_string(),
            }
        };
        let outcome = self.session.evaluate_item(item_id, evaluation).await?;
        Ok(self.respond(outcome).await)
    }

    pub async fn complete_inspection(
        &self,
        request: CompleteInspectionRequest,
    ) -> Result<JourneyCommandResponse, AppError> {
        let outcome = self.session.complete_inspection(request.has_problems).await?;
        Ok(self.respond(outcome).await)
    }

    pub async fn start(
        &self,
        request: StartJourneyRequest,
    ) -> Result<JourneyCommandResponse, AppError> {
        let command = StartJourneyCommand {
            odometer: request.odometer,
            location: request.location,
            vehicle: request.vehicle,
        };
        let outcome = self.session.start_journey(command).await?;
        Ok(self.respond(outcome).await)
    }

    pub async fn pause(
        &self,
        request: PauseJourneyRequest,
    ) -> Result<JourneyCommandResponse, AppError> {
        let outcome = self.session.pause_journey(request.kind).await?;
        Ok(self.respond(outcome).await)
    }

    pub async fn resume(&self) -> Result<JourneyCommandResponse, AppError> {
        let outcome = self.session.resume_journey().await?;
        Ok(self.respond(outcome).await)
    }

    pub async fn checkout(&self) -> Result<JourneyCommandResponse, AppError> {
        let outcome = self.session.start_checkout().await?;
        Ok(self.respond(outcome).await)
    }

    pub async fn end(&self, request: EndJourneyRequest) -> Result<JourneyCommandResponse, AppError> {
        let outcome = self
            .session
            .end_journey(&request.odometer, &request.notes)
            .await?;
        Ok(self.respond(outcome).await)
    }

    pub async fn cancel(&self) -> Result<JourneyCommandResponse, AppError> {
        let outcome = self.session.cancel_journey().await?;
        Ok(self.respond(outcome).await)
    }

    pub async fn update_location(
        &self,
        request: UpdateLocationRequest,
    ) -> Result<JourneyCommandResponse, AppError> {
        let outcome = self.session.update_location(&request.location).await?;
        Ok(self.respond(outcome).await)
    }

    // Un comando ignorado no es un error HTTP; `success` refleja si hubo cambio
    async fn respond(&self, outcome: CommandOutcome) -> JourneyCommandResponse {
        JourneyCommandResponse {
            success: outcome != CommandOutcome::Ignored,
            outcome,
            journey: self.session.snapshot().await,
        }
    }
}
