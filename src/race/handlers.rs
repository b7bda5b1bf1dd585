use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::models::{require_race_positions, RaceResult, UpdateResultRequest};
use crate::event::ResultWrittenEvent;
use crate::shared::{AppError, AppState};

/// POST /results
///
/// Stores the official finishing order and triggers re-scoring for the race.
#[instrument(name = "update_race_result", skip(state, request))]
pub async fn update_race_result(
    State(state): State<AppState>,
    Json(request): Json<UpdateResultRequest>,
) -> Result<Json<Value>, AppError> {
    let (race_id, positions) = require_race_positions(request.race_id, request.result, "result")?;

    let result = RaceResult::new(race_id, positions);
    state.result_repository.upsert_result(&result).await?;

    info!(race_id = %result.race_id, "Race result updated");
    state.event_bus.emit(ResultWrittenEvent::written(result));

    Ok(Json(json!({ "message": "Race result updated" })))
}

/// GET /results/:race_id
#[instrument(name = "get_race_result", skip(state))]
pub async fn get_race_result(
    State(state): State<AppState>,
    Path(race_id): Path<String>,
) -> Result<Json<RaceResult>, AppError> {
    state
        .result_repository
        .get_result(&race_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No result for race {}", race_id)))
}

/// DELETE /results/:race_id
///
/// Scores already computed for the race are left untouched.
#[instrument(name = "delete_race_result", skip(state))]
pub async fn delete_race_result(
    State(state): State<AppState>,
    Path(race_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.result_repository.delete_result(&race_id).await? {
        return Err(AppError::NotFound(format!("No result for race {}", race_id)));
    }

    info!(race_id = %race_id, "Race result deleted");
    state.event_bus.emit(ResultWrittenEvent::deleted(race_id));

    Ok(StatusCode::NO_CONTENT)
}
