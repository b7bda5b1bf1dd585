use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::ScoreRecord;
use crate::shared::AppError;

/// A set of score writes applied all-or-nothing.
///
/// Dropping a batch without calling `commit` discards every pending write.
#[async_trait]
pub trait ScoreBatch: Send {
    /// Queues a write; a later record with the same id replaces an earlier one
    async fn add(&mut self, record: ScoreRecord) -> Result<(), AppError>;

    /// Applies every queued write at once and returns how many were applied
    async fn commit(self: Box<Self>) -> Result<usize, AppError>;

    /// Discards every queued write
    async fn abort(self: Box<Self>);
}

#[async_trait]
pub trait ScoreRepository: Send + Sync {
    async fn begin_batch(&self) -> Result<Box<dyn ScoreBatch>, AppError>;
    async fn list_scores(&self) -> Result<Vec<ScoreRecord>, AppError>;
    async fn list_scores_for_race(&self, race_id: &str) -> Result<Vec<ScoreRecord>, AppError>;
}

#[derive(Debug, Default)]
pub struct InMemoryScoreRepository {
    scores: Arc<RwLock<HashMap<String, ScoreRecord>>>,
}

impl InMemoryScoreRepository {
    pub fn new() -> Self {
        Self {
            scores: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ScoreRepository for InMemoryScoreRepository {
    async fn begin_batch(&self) -> Result<Box<dyn ScoreBatch>, AppError> {
        Ok(Box::new(InMemoryScoreBatch {
            scores: self.scores.clone(),
            pending: Vec::new(),
        }))
    }

    async fn list_scores(&self) -> Result<Vec<ScoreRecord>, AppError> {
        let scores = self.scores.read().await;
        Ok(scores.values().cloned().collect())
    }

    async fn list_scores_for_race(&self, race_id: &str) -> Result<Vec<ScoreRecord>, AppError> {
        let scores = self.scores.read().await;
        Ok(scores
            .values()
            .filter(|record| record.race_id == race_id)
            .cloned()
            .collect())
    }
}

/// Buffers writes and applies them under a single write lock
pub struct InMemoryScoreBatch {
    scores: Arc<RwLock<HashMap<String, ScoreRecord>>>,
    pending: Vec<ScoreRecord>,
}

#[async_trait]
impl ScoreBatch for InMemoryScoreBatch {
    async fn add(&mut self, record: ScoreRecord) -> Result<(), AppError> {
        self.pending.push(record);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<usize, AppError> {
        let InMemoryScoreBatch { scores, pending } = *self;
        let count = pending.len();
        let mut scores = scores.write().await;
        for record in pending {
            scores.insert(record.id.clone(), record);
        }
        debug!(count, "Score batch committed in memory");
        Ok(count)
    }

    async fn abort(self: Box<Self>) {
        debug!(discarded = self.pending.len(), "Score batch aborted in memory");
    }
}

/// PostgreSQL implementation of the score store
pub struct PostgresScoreRepository {
    pool: PgPool,
}

impl PostgresScoreRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScoreRepository for PostgresScoreRepository {
    #[instrument(skip(self))]
    async fn begin_batch(&self) -> Result<Box<dyn ScoreBatch>, AppError> {
        let tx = self.pool.begin().await.map_err(|e| {
            warn!(error = %e, "Failed to open score transaction");
            AppError::from(e)
        })?;
        Ok(Box::new(PostgresScoreBatch { tx, written: 0 }))
    }

    #[instrument(skip(self))]
    async fn list_scores(&self) -> Result<Vec<ScoreRecord>, AppError> {
        sqlx::query_as::<_, ScoreRecord>(
            "SELECT id, uid, race_id, score, computed_at FROM scores",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list scores from database");
            AppError::from(e)
        })
    }

    #[instrument(skip(self))]
    async fn list_scores_for_race(&self, race_id: &str) -> Result<Vec<ScoreRecord>, AppError> {
        sqlx::query_as::<_, ScoreRecord>(
            "SELECT id, uid, race_id, score, computed_at FROM scores WHERE race_id = $1",
        )
        .bind(race_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to list race scores from database");
            AppError::from(e)
        })
    }
}

/// One database transaction; rolled back on abort or drop
pub struct PostgresScoreBatch {
    tx: Transaction<'static, Postgres>,
    written: usize,
}

#[async_trait]
impl ScoreBatch for PostgresScoreBatch {
    async fn add(&mut self, record: ScoreRecord) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO scores (id, uid, race_id, score, computed_at) VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (id) DO UPDATE SET score = EXCLUDED.score, computed_at = EXCLUDED.computed_at",
        )
        .bind(&record.id)
        .bind(&record.uid)
        .bind(&record.race_id)
        .bind(record.score)
        .bind(record.computed_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| {
            warn!(error = %e, score_id = %record.id, "Failed to stage score write");
            AppError::from(e)
        })?;

        self.written += 1;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<usize, AppError> {
        let PostgresScoreBatch { tx, written } = *self;
        tx.commit().await.map_err(|e| {
            warn!(error = %e, "Failed to commit score transaction");
            AppError::from(e)
        })?;
        debug!(count = written, "Score batch committed in database");
        Ok(written)
    }

    async fn abort(self: Box<Self>) {
        let PostgresScoreBatch { tx, .. } = *self;
        if let Err(e) = tx.rollback().await {
            warn!(error = %e, "Failed to roll back score transaction");
        }
    }
}
