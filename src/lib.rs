// Library crate for the race prediction backend
// This file exposes the public API for the binary and integration tests

pub mod config;
pub mod event;
pub mod leaderboard;
pub mod prediction;
pub mod race;
pub mod routes;
pub mod scoring;
pub mod shared;
pub mod user;

pub use config::Config;
pub use event::{EventBus, EventDispatcher, ResultWrittenEvent};
pub use leaderboard::{LeaderboardEntry, LeaderboardService};
pub use routes::build_router;
pub use scoring::{AggregationOutcome, ScoreAggregationHandler, ScoreAggregationJob, ScoringError};
pub use shared::{AppError, AppState, Stores};
