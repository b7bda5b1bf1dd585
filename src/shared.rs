use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::{migrate::Migrator, PgPool};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::event::EventBus;
use crate::leaderboard::LeaderboardService;
use crate::prediction::repository::{
    InMemoryPredictionRepository, PostgresPredictionRepository, PredictionRepository,
};
use crate::race::repository::{InMemoryResultRepository, PostgresResultRepository, ResultRepository};
use crate::scoring::{
    repository::{InMemoryScoreRepository, PostgresScoreRepository, ScoreRepository},
    ScoreAggregationJob,
};
use crate::user::{
    repository::{InMemoryUserRepository, PostgresUserRepository, UserRepository},
    TokenConfig, UserService,
};

/// Schema in `migrations/`, embedded at compile time
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// The four collections the service reads and writes, constructed once at startup
#[derive(Clone)]
pub struct Stores {
    pub results: Arc<dyn ResultRepository>,
    pub predictions: Arc<dyn PredictionRepository>,
    pub scores: Arc<dyn ScoreRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Stores {
    /// In-memory stores for development and tests; data is lost on restart
    pub fn in_memory() -> Self {
        Self {
            results: Arc::new(InMemoryResultRepository::new()),
            predictions: Arc::new(InMemoryPredictionRepository::new()),
            scores: Arc::new(InMemoryScoreRepository::new()),
            users: Arc::new(InMemoryUserRepository::new()),
        }
    }

    /// Connects to PostgreSQL and brings the schema up to date
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPool::connect(database_url).await?;
        MIGRATOR.run(&pool).await.map_err(|e| {
            error!(error = %e, "Failed to apply database migrations");
            AppError::DatabaseError(e.to_string())
        })?;
        info!("Database migrations applied");

        Ok(Self::postgres(pool))
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            results: Arc::new(PostgresResultRepository::new(pool.clone())),
            predictions: Arc::new(PostgresPredictionRepository::new(pool.clone())),
            scores: Arc::new(PostgresScoreRepository::new(pool.clone())),
            users: Arc::new(PostgresUserRepository::new(pool)),
        }
    }

    /// Builds the aggregation job over these stores
    pub fn aggregation_job(&self) -> ScoreAggregationJob {
        ScoreAggregationJob::new(
            self.results.clone(),
            self.predictions.clone(),
            self.scores.clone(),
        )
    }
}

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub result_repository: Arc<dyn ResultRepository>,
    pub prediction_repository: Arc<dyn PredictionRepository>,
    pub user_service: Arc<UserService>,
    pub leaderboard_service: Arc<LeaderboardService>,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(stores: Stores, token_config: TokenConfig, event_bus: EventBus) -> Self {
        Self {
            result_repository: stores.results,
            prediction_repository: stores.predictions,
            user_service: Arc::new(UserService::new(stores.users.clone(), token_config)),
            leaderboard_service: Arc::new(LeaderboardService::new(stores.scores, stores.users)),
            event_bus,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::JwtError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::DatabaseError(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Database error: {}", msg),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}
