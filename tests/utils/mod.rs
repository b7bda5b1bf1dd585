pub mod mocks;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use mocks::{
    FlakyScoreRepository, SlowPredictionRepository, UnavailablePredictionRepository,
    UnavailableUserRepository,
};
#[allow(unused_imports)]
pub use setup::{podium, predict, TestApp};
