use axum::{extract::State, Json};
use tracing::{info, instrument};

use super::models::LeaderboardEntry;
use crate::shared::{AppError, AppState};

/// GET /leaderboard
#[instrument(name = "get_leaderboard", skip(state))]
pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    let entries = state.leaderboard_service.build_leaderboard().await?;

    info!(entries = entries.len(), "Leaderboard served");

    Ok(Json(entries))
}
