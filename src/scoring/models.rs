use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Points one user earned for one race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    /// `<uid>_<raceId>`
    pub id: String,
    pub uid: String,
    pub race_id: String,
    pub score: i32,
    pub computed_at: DateTime<Utc>,
}

impl ScoreRecord {
    pub fn new(uid: &str, race_id: &str, score: u32, computed_at: DateTime<Utc>) -> Self {
        Self {
            id: score_key(uid, race_id),
            uid: uid.to_string(),
            race_id: race_id.to_string(),
            score: score as i32,
            computed_at,
        }
    }
}

pub fn score_key(uid: &str, race_id: &str) -> String {
    format!("{}_{}", uid, race_id)
}

/// What a single result-written trigger did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationOutcome {
    /// The result was deleted; existing scores were left alone
    Skipped { race_id: String },
    /// One score was written per prediction for the race
    Scored { race_id: String, scored: usize },
}
