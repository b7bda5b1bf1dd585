use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::models::LeaderboardEntry;
use crate::scoring::{repository::ScoreRepository, ScoringError};
use crate::user::repository::UserRepository;

/// Sums every stored score per user and ranks the totals
pub struct LeaderboardService {
    scores: Arc<dyn ScoreRepository>,
    users: Arc<dyn UserRepository>,
}

impl LeaderboardService {
    pub fn new(scores: Arc<dyn ScoreRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { scores, users }
    }

    /// Ranked by total score descending, ties by uid ascending.
    ///
    /// Every uid with at least one score appears; a failed or empty identity
    /// lookup falls back to the uid as display name.
    #[instrument(skip(self))]
    pub async fn build_leaderboard(&self) -> Result<Vec<LeaderboardEntry>, ScoringError> {
        let records = self.scores.list_scores().await?;

        let mut totals: HashMap<String, i64> = HashMap::new();
        for record in &records {
            *totals.entry(record.uid.clone()).or_default() += i64::from(record.score);
        }

        let totals: Vec<(String, i64)> = totals.into_iter().collect();
        let names = join_all(totals.iter().map(|(uid, _)| self.display_name(uid))).await;

        let mut entries: Vec<LeaderboardEntry> = totals
            .into_iter()
            .zip(names)
            .map(|((uid, total_score), username)| LeaderboardEntry {
                uid,
                username,
                total_score,
            })
            .collect();

        entries.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.uid.cmp(&b.uid))
        });

        debug!(
            users = entries.len(),
            records = records.len(),
            "Leaderboard built"
        );

        Ok(entries)
    }

    async fn display_name(&self, uid: &str) -> String {
        match self.users.get_user(uid).await {
            Ok(Some(user)) => user.username,
            Ok(None) => {
                debug!(uid = %uid, "No identity record, using uid as display name");
                uid.to_string()
            }
            Err(e) => {
                warn!(uid = %uid, error = %e, "Identity lookup failed, using uid as display name");
                uid.to_string()
            }
        }
    }
}
