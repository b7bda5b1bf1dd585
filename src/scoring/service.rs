use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, error, info, instrument};

use crate::event::{EventError, EventHandler, ResultWrittenEvent};
use crate::prediction::repository::PredictionRepository;
use crate::race::repository::ResultRepository;

use super::{
    calculator::score,
    repository::{ScoreBatch, ScoreRepository},
    AggregationOutcome, ScoreRecord, ScoringError,
};

/// Re-scores every prediction for a race whenever its result is written.
///
/// Scores are keyed `<uid>_<raceId>` and written as one batch. Runs for the same
/// race are serialized and always score against the result currently stored, so
/// the last run to finish reflects the latest result no matter which event
/// triggered it. The job never retries on its own; failures go back to whoever
/// delivered the event.
pub struct ScoreAggregationJob {
    results: Arc<dyn ResultRepository>,
    predictions: Arc<dyn PredictionRepository>,
    scores: Arc<dyn ScoreRepository>,
    race_locks: RwLock<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ScoreAggregationJob {
    pub fn new(
        results: Arc<dyn ResultRepository>,
        predictions: Arc<dyn PredictionRepository>,
        scores: Arc<dyn ScoreRepository>,
    ) -> Self {
        Self {
            results,
            predictions,
            scores,
            race_locks: RwLock::new(HashMap::new()),
        }
    }

    #[instrument(skip(self, event), fields(race_id = %event.race_id))]
    pub async fn on_result_written(
        &self,
        event: &ResultWrittenEvent,
    ) -> Result<AggregationOutcome, ScoringError> {
        let Some(result) = &event.result else {
            info!("Race result deleted, keeping existing scores");
            return Ok(self.skipped(event));
        };

        if result.race_id != event.race_id {
            return Err(ScoringError::MalformedResult(format!(
                "event for race {} carries result for race {}",
                event.race_id, result.race_id
            )));
        }

        let lock = self.race_lock(&event.race_id).await;
        let _guard = lock.lock().await;

        let current = self.results.get_result(&event.race_id).await.map_err(|e| {
            error!(error = %e, "Failed to load stored result for scoring");
            ScoringError::from(e)
        })?;
        let Some(current) = current else {
            info!("Race result no longer stored, keeping existing scores");
            return Ok(self.skipped(event));
        };
        if current.updated_at != result.updated_at {
            debug!("Event is stale, scoring against the stored result");
        }

        let predictions = self
            .predictions
            .list_predictions_for_race(&event.race_id)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load predictions for scoring");
                ScoringError::from(e)
            })?;

        let computed_at = Utc::now();
        let mut batch = self.scores.begin_batch().await?;

        for prediction in &predictions {
            let points = score(&prediction.positions, &current.positions);
            let record = ScoreRecord::new(&prediction.uid, &event.race_id, points, computed_at);

            if let Err(e) = batch.add(record).await {
                error!(error = %e, uid = %prediction.uid, "Failed to stage score, aborting batch");
                batch.abort().await;
                return Err(e.into());
            }
        }

        let scored = batch.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit score batch");
            ScoringError::from(e)
        })?;

        info!(scored, "Race scored");

        Ok(AggregationOutcome::Scored {
            race_id: event.race_id.clone(),
            scored,
        })
    }

    fn skipped(&self, event: &ResultWrittenEvent) -> AggregationOutcome {
        AggregationOutcome::Skipped {
            race_id: event.race_id.clone(),
        }
    }

    async fn race_lock(&self, race_id: &str) -> Arc<AsyncMutex<()>> {
        {
            let guard = self.race_locks.read().await;
            if let Some(lock) = guard.get(race_id) {
                return lock.clone();
            }
        }

        let mut guard = self.race_locks.write().await;
        guard
            .entry(race_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// Connects the aggregation job to the event dispatcher
pub struct ScoreAggregationHandler {
    job: Arc<ScoreAggregationJob>,
}

impl ScoreAggregationHandler {
    pub fn new(job: Arc<ScoreAggregationJob>) -> Self {
        Self { job }
    }
}

#[async_trait::async_trait]
impl EventHandler for ScoreAggregationHandler {
    async fn handle(&self, event: &ResultWrittenEvent) -> Result<(), EventError> {
        self.job.on_result_written(event).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "ScoreAggregationHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::{repository::InMemoryPredictionRepository, Prediction};
    use crate::race::{repository::InMemoryResultRepository, PositionMap, RaceResult};
    use crate::scoring::repository::InMemoryScoreRepository;

    fn podium(p1: &str, p2: &str, p3: &str) -> PositionMap {
        [("p1", p1), ("p2", p2), ("p3", p3)].into_iter().collect()
    }

    struct Fixture {
        results: Arc<InMemoryResultRepository>,
        predictions: Arc<InMemoryPredictionRepository>,
        scores: Arc<InMemoryScoreRepository>,
        job: ScoreAggregationJob,
    }

    impl Fixture {
        /// Stores the result and returns the event its write would emit
        async fn write_result(&self, race_id: &str, positions: PositionMap) -> ResultWrittenEvent {
            let result = RaceResult::new(race_id, positions);
            self.results.upsert_result(&result).await.unwrap();
            ResultWrittenEvent::written(result)
        }

        async fn predict(&self, uid: &str, race_id: &str, positions: PositionMap) {
            self.predictions
                .upsert_prediction(&Prediction::new(uid, race_id, positions))
                .await
                .unwrap();
        }
    }

    fn fixture() -> Fixture {
        let results = Arc::new(InMemoryResultRepository::new());
        let predictions = Arc::new(InMemoryPredictionRepository::new());
        let scores = Arc::new(InMemoryScoreRepository::new());
        let job = ScoreAggregationJob::new(results.clone(), predictions.clone(), scores.clone());
        Fixture {
            results,
            predictions,
            scores,
            job,
        }
    }

    #[tokio::test]
    async fn writes_one_score_per_prediction() {
        let f = fixture();
        f.predict("alice", "r1", podium("A", "B", "C")).await;
        f.predict("bob", "r1", podium("D", "E", "F")).await;
        f.predict("carol", "r2", podium("A", "B", "C")).await;

        let event = f.write_result("r1", podium("A", "C", "B")).await;
        let outcome = f.job.on_result_written(&event).await.unwrap();

        assert_eq!(
            outcome,
            AggregationOutcome::Scored {
                race_id: "r1".to_string(),
                scored: 2
            }
        );

        let mut scores = f.scores.list_scores_for_race("r1").await.unwrap();
        scores.sort_by(|a, b| a.uid.cmp(&b.uid));
        assert_eq!(scores.len(), 2);
        assert_eq!((scores[0].id.as_str(), scores[0].score), ("alice_r1", 5));
        assert_eq!((scores[1].id.as_str(), scores[1].score), ("bob_r1", 0));
        assert!(f.scores.list_scores_for_race("r2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deletion_leaves_scores_untouched() {
        let f = fixture();
        f.predict("alice", "r1", podium("A", "B", "C")).await;
        let event = f.write_result("r1", podium("A", "B", "C")).await;
        f.job.on_result_written(&event).await.unwrap();

        let outcome = f
            .job
            .on_result_written(&ResultWrittenEvent::deleted("r1"))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AggregationOutcome::Skipped {
                race_id: "r1".to_string()
            }
        );
        let scores = f.scores.list_scores_for_race("r1").await.unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, 9);
    }

    #[tokio::test]
    async fn corrected_result_overwrites_previous_scores() {
        let f = fixture();
        f.predict("alice", "r1", podium("A", "B", "C")).await;

        for actual in [podium("A", "B", "C"), podium("C", "B", "A")] {
            let event = f.write_result("r1", actual).await;
            f.job.on_result_written(&event).await.unwrap();
        }

        let scores = f.scores.list_scores_for_race("r1").await.unwrap();
        assert_eq!(scores.len(), 1);
        // p2 exact, p1 and p3 swapped
        assert_eq!(scores[0].score, 5);
    }

    #[tokio::test]
    async fn stale_event_scores_against_the_stored_result() {
        let f = fixture();
        f.predict("alice", "r1", podium("A", "B", "C")).await;
        let stale = f.write_result("r1", podium("X", "Y", "Z")).await;
        f.write_result("r1", podium("A", "B", "C")).await;

        f.job.on_result_written(&stale).await.unwrap();

        let scores = f.scores.list_scores_for_race("r1").await.unwrap();
        assert_eq!(scores[0].score, 9);
    }

    #[tokio::test]
    async fn skips_when_the_result_is_no_longer_stored() {
        let f = fixture();
        f.predict("alice", "r1", podium("A", "B", "C")).await;
        let event = f.write_result("r1", podium("A", "B", "C")).await;
        f.results.delete_result("r1").await.unwrap();

        let outcome = f.job.on_result_written(&event).await.unwrap();

        assert!(matches!(outcome, AggregationOutcome::Skipped { .. }));
        assert!(f.scores.list_scores().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_event_whose_payload_names_another_race() {
        let f = fixture();
        let event = ResultWrittenEvent {
            race_id: "r1".to_string(),
            result: Some(RaceResult::new("r2", podium("A", "B", "C"))),
        };

        let err = f.job.on_result_written(&event).await.unwrap_err();
        assert!(matches!(err, ScoringError::MalformedResult(_)));
        assert!(f.scores.list_scores().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn handler_maps_malformed_results_to_permanent_failures() {
        let f = fixture();
        let handler = ScoreAggregationHandler::new(Arc::new(f.job));
        let event = ResultWrittenEvent {
            race_id: "r1".to_string(),
            result: Some(RaceResult::new("r2", podium("A", "B", "C"))),
        };

        let err = handler.handle(&event).await.unwrap_err();
        assert!(!err.is_retryable());
    }
}
