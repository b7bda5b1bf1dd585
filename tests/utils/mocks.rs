use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use podium::{
    prediction::{
        repository::{InMemoryPredictionRepository, PredictionRepository},
        Prediction,
    },
    scoring::{InMemoryScoreRepository, ScoreBatch, ScoreRecord, ScoreRepository},
    user::{models::UserModel, repository::UserRepository},
    AppError,
};

// ============================================================================
// Store doubles that fail on demand
// ============================================================================

/// Score store over an in-memory one whose batches can fail at a chosen step
pub struct FlakyScoreRepository {
    inner: InMemoryScoreRepository,
    fail_on_add: Option<usize>,
    fail_on_commit: bool,
    aborts: Arc<AtomicU32>,
}

impl FlakyScoreRepository {
    pub fn new() -> Self {
        Self {
            inner: InMemoryScoreRepository::new(),
            fail_on_add: None,
            fail_on_commit: false,
            aborts: Arc::new(AtomicU32::new(0)),
        }
    }

    /// The zero-based `index`th add of every batch fails
    pub fn failing_on_add(mut self, index: usize) -> Self {
        self.fail_on_add = Some(index);
        self
    }

    pub fn failing_on_commit(mut self) -> Self {
        self.fail_on_commit = true;
        self
    }

    pub fn abort_count(&self) -> u32 {
        self.aborts.load(Ordering::SeqCst)
    }

    /// Writes straight through, bypassing the configured failures
    pub async fn seed(&self, records: Vec<ScoreRecord>) {
        let mut batch = self.inner.begin_batch().await.unwrap();
        for record in records {
            batch.add(record).await.unwrap();
        }
        batch.commit().await.unwrap();
    }
}

#[async_trait]
impl ScoreRepository for FlakyScoreRepository {
    async fn begin_batch(&self) -> Result<Box<dyn ScoreBatch>, AppError> {
        Ok(Box::new(FlakyScoreBatch {
            inner: self.inner.begin_batch().await?,
            added: 0,
            fail_on_add: self.fail_on_add,
            fail_on_commit: self.fail_on_commit,
            aborts: self.aborts.clone(),
        }))
    }

    async fn list_scores(&self) -> Result<Vec<ScoreRecord>, AppError> {
        self.inner.list_scores().await
    }

    async fn list_scores_for_race(&self, race_id: &str) -> Result<Vec<ScoreRecord>, AppError> {
        self.inner.list_scores_for_race(race_id).await
    }
}

struct FlakyScoreBatch {
    inner: Box<dyn ScoreBatch>,
    added: usize,
    fail_on_add: Option<usize>,
    fail_on_commit: bool,
    aborts: Arc<AtomicU32>,
}

#[async_trait]
impl ScoreBatch for FlakyScoreBatch {
    async fn add(&mut self, record: ScoreRecord) -> Result<(), AppError> {
        if self.fail_on_add == Some(self.added) {
            return Err(AppError::DatabaseError("simulated write failure".to_string()));
        }
        self.added += 1;
        self.inner.add(record).await
    }

    async fn commit(self: Box<Self>) -> Result<usize, AppError> {
        let FlakyScoreBatch {
            inner,
            fail_on_commit,
            ..
        } = *self;
        if fail_on_commit {
            inner.abort().await;
            return Err(AppError::DatabaseError("simulated commit failure".to_string()));
        }
        inner.commit().await
    }

    async fn abort(self: Box<Self>) {
        let FlakyScoreBatch { inner, aborts, .. } = *self;
        aborts.fetch_add(1, Ordering::SeqCst);
        inner.abort().await;
    }
}

/// Prediction store whose reads always fail
pub struct UnavailablePredictionRepository;

#[async_trait]
impl PredictionRepository for UnavailablePredictionRepository {
    async fn upsert_prediction(&self, _prediction: &Prediction) -> Result<(), AppError> {
        Err(AppError::DatabaseError("store unavailable".to_string()))
    }

    async fn get_prediction(
        &self,
        _race_id: &str,
        _uid: &str,
    ) -> Result<Option<Prediction>, AppError> {
        Err(AppError::DatabaseError("store unavailable".to_string()))
    }

    async fn list_predictions_for_race(
        &self,
        _race_id: &str,
    ) -> Result<Vec<Prediction>, AppError> {
        Err(AppError::DatabaseError("store unavailable".to_string()))
    }
}

/// Prediction store whose first race listing stalls for `delay`
pub struct SlowPredictionRepository {
    inner: InMemoryPredictionRepository,
    delay: Duration,
    list_calls: AtomicU32,
}

impl SlowPredictionRepository {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryPredictionRepository::new(),
            delay,
            list_calls: AtomicU32::new(0),
        }
    }

    pub fn list_calls(&self) -> u32 {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PredictionRepository for SlowPredictionRepository {
    async fn upsert_prediction(&self, prediction: &Prediction) -> Result<(), AppError> {
        self.inner.upsert_prediction(prediction).await
    }

    async fn get_prediction(&self, race_id: &str, uid: &str) -> Result<Option<Prediction>, AppError> {
        self.inner.get_prediction(race_id, uid).await
    }

    async fn list_predictions_for_race(&self, race_id: &str) -> Result<Vec<Prediction>, AppError> {
        if self.list_calls.fetch_add(1, Ordering::SeqCst) == 0 {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.list_predictions_for_race(race_id).await
    }
}

/// Identity store whose lookups always fail
pub struct UnavailableUserRepository;

#[async_trait]
impl UserRepository for UnavailableUserRepository {
    async fn create_user(&self, _user: &UserModel) -> Result<(), AppError> {
        Err(AppError::DatabaseError("identity store unavailable".to_string()))
    }

    async fn get_user(&self, _uid: &str) -> Result<Option<UserModel>, AppError> {
        Err(AppError::DatabaseError("identity store unavailable".to_string()))
    }
}
