pub use handlers::register_user;
pub use middleware::jwt_auth;
pub use service::UserService;
pub use token::TokenConfig;
pub use types::{RegisterUserResponse, UserClaims};

mod generators;
mod handlers;
mod middleware;
pub mod models;
pub mod repository;
mod service;
mod token;
mod types;
