use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use validator::Validate;

use crate::controllers::journey_controller::JourneyController;
use crate::dto::journey_dto::{
    CompleteInspectionRequest, EndJourneyRequest, EvaluateItemRequest, JourneyCommandResponse,
    PauseJourneyRequest, SelectVehicleRequest, StartJourneyRequest, UpdateLocationRequest,
};
use crate::models::JourneySnapshot;
use crate::state::AppState;
use crate::utils::errors::AppError;
use crate::utils::validation::require_driver_id;

type CommandResult = Result<Json<JourneyCommandResponse>, AppError>;

pub fn create_journey_router() -> Router<AppState> {
    Router::new()
        .route("/:driver_id", get(get_journey))
        .route("/:driver_id/vehicle", post(select_vehicle))
        .route("/:driver_id/inspection/start", post(start_inspection))
        .route("/:driver_id/inspection/items/:item_id", put(evaluate_item))
        .route("/:driver_id/inspection/complete", post(complete_inspection))
        .route("/:driver_id/start", post(start_journey))
        .route("/:driver_id/pause", post(pause_journey))
        .route("/:driver_id/resume", post(resume_journey))
        .route("/:driver_id/checkout", post(start_checkout))
        .route("/:driver_id/end", post(end_journey))
        .route("/:driver_id/cancel", post(cancel_journey))
        .route("/:driver_id/location", post(update_location))
}

async fn controller(state: &AppState, driver_id: &str) -> Result<JourneyController, AppError> {
    require_driver_id(driver_id)?;
    Ok(JourneyController::new(state.session(driver_id).await))
}

async fn get_journey(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
) -> Result<Json<JourneySnapshot>, AppError> {
    let controller = controller(&state, &driver_id).await?;
    Ok(Json(controller.get().await))
}

async fn select_vehicle(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
    Json(request): Json<SelectVehicleRequest>,
) -> CommandResult {
    request.validate()?;
    let controller = controller(&state, &driver_id).await?;
    Ok(Json(controller.select_vehicle(request).await?))
}

async fn start_inspection(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
) -> CommandResult {
    let controller = controller(&state, &driver_id).await?;
    Ok(Json(controller.start_inspection().await?))
}

async fn evaluate_item(
    State(state): State<AppState>,
    Path((driver_id, item_id)): Path<(String, String)>,
    Json(request): Json<EvaluateItemRequest>,
) -> CommandResult {
    request.validate()?;
    let controller = controller(&state, &driver_id).await?;
    Ok(Json(controller.evaluate_item(&item_id, request).await?))
}

async fn complete_inspection(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
    Json(request): Json<CompleteInspectionRequest>,
) -> CommandResult {
    let controller = controller(&state, &driver_id).await?;
    Ok(Json(controller.complete_inspection(request).await?))
}

async fn start_journey(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
    Json(request): Json<StartJourneyRequest>,
) -> CommandResult {
    request.validate()?;
    let controller = controller(&state, &driver_id).await?;
    Ok(Json(controller.start(request).await?))
}

async fn pause_journey(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
    Json(request): Json<PauseJourneyRequest>,
) -> CommandResult {
    let controller = controller(&state, &driver_id).await?;
    Ok(Json(controller.pause(request).await?))
}

async fn resume_journey(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
) -> CommandResult {
    let controller = controller(&state, &driver_id).await?;
    Ok(Json(controller.resume().await?))
}

async fn start_checkout(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
) -> CommandResult {
    let controller = controller(&state, &driver_id).await?;
    Ok(Json(controller.checkout().await?))
}

async fn end_journey(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
    Json(request): Json<EndJourneyRequest>,
) -> CommandResult {
    request.validate()?;
    let controller = controller(&state, &driver_id).await?;
    Ok(Json(controller.end(request).await?))
}

async fn cancel_journey(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
) -> CommandResult {
    let controller = controller(&state, &driver_id).await?;
    Ok(Json(controller.cancel().await?))
}

async fn update_location(
    State(state): State<AppState>,
    Path(driver_id): Path<String>,
    Json(request): Json<UpdateLocationRequest>,
) -> CommandResult {
    request.validate()?;
    let controller = controller(&state, &driver_id).await?;
    Ok(Json(controller.update_location(request).await?))
}
