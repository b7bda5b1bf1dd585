use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use tracing::{info, instrument, warn};

use super::types::{RegisterUserRequest, RegisterUserResponse};
use crate::shared::{AppError, AppState};

/// POST /users
///
/// An empty body registers with a generated name. Returns the new uid, its display
/// name and a bearer token.
#[instrument(name = "register_user", skip(state, body))]
pub async fn register_user(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<RegisterUserResponse>), AppError> {
    let request = parse_register_request(&body)?;

    let response = state.user_service.register_user(request.username).await?;

    info!(uid = %response.uid, "User created");

    Ok((StatusCode::CREATED, Json(response)))
}

fn parse_register_request(body: &[u8]) -> Result<RegisterUserRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RegisterUserRequest::default());
    }

    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Malformed registration body");
        AppError::Validation(format!("Invalid request body: {}", e))
    })
}
