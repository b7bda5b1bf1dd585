use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{
    leaderboard::get_leaderboard,
    prediction::submit_prediction,
    race::{delete_race_result, get_race_result, update_race_result},
    shared::AppState,
    user::{jwt_auth, register_user},
};

/// All HTTP routes; `/predictions` requires a bearer token
pub fn build_router(state: AppState) -> Router {
    let authenticated = Router::new()
        .route("/predictions", post(submit_prediction))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/users", post(register_user))
        .route("/results", post(update_race_result))
        .route(
            "/results/:race_id",
            get(get_race_result).delete(delete_race_result),
        )
        .route("/leaderboard", get(get_leaderboard))
        .merge(authenticated)
        .with_state(state)
}
