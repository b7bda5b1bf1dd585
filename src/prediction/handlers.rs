use axum::{extract::State, Extension, Json};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::models::{Prediction, SubmitPredictionRequest};
use crate::race::require_race_positions;
use crate::shared::{AppError, AppState};
use crate::user::UserClaims;

/// POST /predictions
///
/// Requires a bearer token; the prediction is stored for the token's user and
/// replaces any earlier submission for the same race.
#[instrument(name = "submit_prediction", skip(state, claims, request), fields(uid = %claims.uid))]
pub async fn submit_prediction(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Json(request): Json<SubmitPredictionRequest>,
) -> Result<Json<Value>, AppError> {
    let (race_id, positions) =
        require_race_positions(request.race_id, request.prediction, "prediction")?;

    let prediction = Prediction::new(claims.uid, race_id, positions);
    state
        .prediction_repository
        .upsert_prediction(&prediction)
        .await?;

    info!(race_id = %prediction.race_id, "Prediction submitted");

    Ok(Json(json!({ "message": "Prediction submitted successfully" })))
}
