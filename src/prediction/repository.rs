use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::Prediction;
use crate::race::PositionMap;
use crate::shared::AppError;

#[async_trait]
pub trait PredictionRepository: Send + Sync {
    /// Stores the prediction under `<raceId>_<uid>`, replacing any earlier submission
    async fn upsert_prediction(&self, prediction: &Prediction) -> Result<(), AppError>;
    async fn get_prediction(
        &self,
        race_id: &str,
        uid: &str,
    ) -> Result<Option<Prediction>, AppError>;
    async fn list_predictions_for_race(&self, race_id: &str) -> Result<Vec<Prediction>, AppError>;
}

#[derive(Debug, Default)]
pub struct InMemoryPredictionRepository {
    predictions: Arc<RwLock<HashMap<String, Prediction>>>,
}

impl InMemoryPredictionRepository {
    pub fn new() -> Self {
        Self {
            predictions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn prediction_count(&self) -> usize {
        self.predictions.read().await.len()
    }
}

#[async_trait]
impl PredictionRepository for InMemoryPredictionRepository {
    #[instrument(skip(self, prediction), fields(race_id = %prediction.race_id, uid = %prediction.uid))]
    async fn upsert_prediction(&self, prediction: &Prediction) -> Result<(), AppError> {
        let mut predictions = self.predictions.write().await;
        let replaced = predictions
            .insert(prediction.key(), prediction.clone())
            .is_some();
        debug!(replaced, "Prediction stored in memory");
        Ok(())
    }

    async fn get_prediction(
        &self,
        race_id: &str,
        uid: &str,
    ) -> Result<Option<Prediction>, AppError> {
        let predictions = self.predictions.read().await;
        Ok(predictions
            .get(&super::models::prediction_key(race_id, uid))
            .cloned())
    }

    #[instrument(skip(self))]
    async fn list_predictions_for_race(&self, race_id: &str) -> Result<Vec<Prediction>, AppError> {
        let predictions = self.predictions.read().await;
        let found: Vec<Prediction> = predictions
            .values()
            .filter(|p| p.race_id == race_id)
            .cloned()
            .collect();
        debug!(count = found.len(), "Predictions listed from memory");
        Ok(found)
    }
}

/// PostgreSQL implementation of the prediction store
pub struct PostgresPredictionRepository {
    pool: PgPool,
}

impl PostgresPredictionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PredictionRepository for PostgresPredictionRepository {
    #[instrument(skip(self, prediction), fields(race_id = %prediction.race_id, uid = %prediction.uid))]
    async fn upsert_prediction(&self, prediction: &Prediction) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO predictions (id, uid, race_id, positions, submitted_at) VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE SET positions = EXCLUDED.positions, submitted_at = EXCLUDED.submitted_at",
        )
        .bind(prediction.key())
        .bind(&prediction.uid)
        .bind(&prediction.race_id)
        .bind(Json(&prediction.positions))
        .bind(prediction.submitted_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to store prediction in database");
            AppError::from(e)
        })?;

        debug!("Prediction stored in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_prediction(
        &self,
        race_id: &str,
        uid: &str,
    ) -> Result<Option<Prediction>, AppError> {
        let row = sqlx::query(
            "SELECT uid, race_id, positions, submitted_at FROM predictions WHERE id = $1",
        )
        .bind(super::models::prediction_key(race_id, uid))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch prediction from database");
            AppError::from(e)
        })?;

        row.map(prediction_from_row)
            .transpose()
            .map_err(AppError::from)
    }

    #[instrument(skip(self))]
    async fn list_predictions_for_race(&self, race_id: &str) -> Result<Vec<Prediction>, AppError> {
        let rows = sqlx::query(
            "SELECT uid, race_id, positions, submitted_at FROM predictions WHERE race_id = $1",
        )
        .bind(race_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list predictions from database");
            AppError::from(e)
        })?;

        rows.into_iter()
            .map(prediction_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(AppError::from)
    }
}

fn prediction_from_row(row: PgRow) -> Result<Prediction, sqlx::Error> {
    let positions: Json<PositionMap> = row.try_get("positions")?;
    let submitted_at: DateTime<Utc> = row.try_get("submitted_at")?;
    Ok(Prediction {
        uid: row.try_get("uid")?,
        race_id: row.try_get("race_id")?,
        positions: positions.0,
        submitted_at,
    })
}
