pub mod calculator;
pub mod repository;
pub mod service;

mod errors;
pub mod models;

pub use calculator::{score, EXACT_POSITION_POINTS, PARTIAL_CREDIT_POINTS};
pub use errors::ScoringError;
pub use models::*;
pub use repository::{InMemoryScoreRepository, ScoreBatch, ScoreRepository};
pub use service::{ScoreAggregationHandler, ScoreAggregationJob};
