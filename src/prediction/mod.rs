pub use handlers::submit_prediction;
pub use models::Prediction;

mod handlers;
pub mod models;
pub mod repository;
