use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{PositionMap, RaceResult};
use crate::shared::AppError;

#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Creates or overwrites the result for `result.race_id`
    async fn upsert_result(&self, result: &RaceResult) -> Result<(), AppError>;
    async fn get_result(&self, race_id: &str) -> Result<Option<RaceResult>, AppError>;
    /// Returns whether a result was removed
    async fn delete_result(&self, race_id: &str) -> Result<bool, AppError>;
}

#[derive(Debug, Default)]
pub struct InMemoryResultRepository {
    results: Arc<RwLock<HashMap<String, RaceResult>>>,
}

impl InMemoryResultRepository {
    pub fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ResultRepository for InMemoryResultRepository {
    #[instrument(skip(self, result), fields(race_id = %result.race_id))]
    async fn upsert_result(&self, result: &RaceResult) -> Result<(), AppError> {
        let mut results = self.results.write().await;
        results.insert(result.race_id.clone(), result.clone());
        debug!("Race result stored in memory");
        Ok(())
    }

    async fn get_result(&self, race_id: &str) -> Result<Option<RaceResult>, AppError> {
        let results = self.results.read().await;
        Ok(results.get(race_id).cloned())
    }

    #[instrument(skip(self))]
    async fn delete_result(&self, race_id: &str) -> Result<bool, AppError> {
        let mut results = self.results.write().await;
        let removed = results.remove(race_id).is_some();
        if !removed {
            warn!(race_id = %race_id, "No race result to delete in memory");
        }
        Ok(removed)
    }
}

/// PostgreSQL implementation of the result store
pub struct PostgresResultRepository {
    pool: PgPool,
}

impl PostgresResultRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultRepository for PostgresResultRepository {
    #[instrument(skip(self, result), fields(race_id = %result.race_id))]
    async fn upsert_result(&self, result: &RaceResult) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO race_results (race_id, positions, updated_at) VALUES ($1, $2, $3)
             ON CONFLICT (race_id) DO UPDATE SET positions = EXCLUDED.positions, updated_at = EXCLUDED.updated_at",
        )
        .bind(&result.race_id)
        .bind(Json(&result.positions))
        .bind(result.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to store race result in database");
            AppError::from(e)
        })?;

        debug!("Race result stored in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_result(&self, race_id: &str) -> Result<Option<RaceResult>, AppError> {
        let row = sqlx::query(
            "SELECT race_id, positions, updated_at FROM race_results WHERE race_id = $1",
        )
        .bind(race_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to fetch race result from database");
            AppError::from(e)
        })?;

        row.map(result_from_row).transpose().map_err(AppError::from)
    }

    #[instrument(skip(self))]
    async fn delete_result(&self, race_id: &str) -> Result<bool, AppError> {
        let outcome = sqlx::query("DELETE FROM race_results WHERE race_id = $1")
            .bind(race_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to delete race result from database");
                AppError::from(e)
            })?;

        Ok(outcome.rows_affected() > 0)
    }
}

fn result_from_row(row: PgRow) -> Result<RaceResult, sqlx::Error> {
    let positions: Json<PositionMap> = row.try_get("positions")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
    Ok(RaceResult {
        race_id: row.try_get("race_id")?,
        positions: positions.0,
        updated_at,
    })
}
