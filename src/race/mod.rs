pub use handlers::{delete_race_result, get_race_result, update_race_result};
pub use models::{require_race_positions, PositionLabel, PositionMap, RaceResult};

mod handlers;
pub mod models;
pub mod repository;
