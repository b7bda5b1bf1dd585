use serde::{Deserialize, Serialize};

use crate::race::RaceResult;

/// A race result record was created, overwritten or deleted.
///
/// `result` carries the post-write payload; `None` means the record was deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultWrittenEvent {
    pub race_id: String,
    pub result: Option<RaceResult>,
}

impl ResultWrittenEvent {
    pub fn written(result: RaceResult) -> Self {
        Self {
            race_id: result.race_id.clone(),
            result: Some(result),
        }
    }

    pub fn deleted(race_id: impl Into<String>) -> Self {
        Self {
            race_id: race_id.into(),
            result: None,
        }
    }

    pub fn race_id(&self) -> &str {
        &self.race_id
    }

    pub fn is_deletion(&self) -> bool {
        self.result.is_none()
    }

    /// Get a human-readable description of the event type
    pub fn event_type(&self) -> &'static str {
        if self.is_deletion() {
            "result_deleted"
        } else {
            "result_written"
        }
    }
}
