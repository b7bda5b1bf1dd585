use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::race::PositionMap;

/// One user's guessed finishing order for one race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub uid: String,
    pub race_id: String,
    pub positions: PositionMap,
    pub submitted_at: DateTime<Utc>,
}

impl Prediction {
    pub fn new(uid: impl Into<String>, race_id: impl Into<String>, positions: PositionMap) -> Self {
        Self {
            uid: uid.into(),
            race_id: race_id.into(),
            positions,
            submitted_at: Utc::now(),
        }
    }

    /// Storage key `<raceId>_<uid>`; one prediction per user per race
    pub fn key(&self) -> String {
        prediction_key(&self.race_id, &self.uid)
    }
}

pub fn prediction_key(race_id: &str, uid: &str) -> String {
    format!("{}_{}", race_id, uid)
}

/// Body of `POST /predictions`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitPredictionRequest {
    pub race_id: Option<String>,
    pub prediction: Option<PositionMap>,
}
