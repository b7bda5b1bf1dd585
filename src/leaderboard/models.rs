use serde::{Deserialize, Serialize};

/// One row of the all-time leaderboard; computed per query, never stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub uid: String,
    /// Display name, or the uid when no identity record resolves
    pub username: String,
    pub total_score: i64,
}
