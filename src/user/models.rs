use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for the users table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserModel {
    pub uid: String, // UUID v4 as string
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl UserModel {
    pub fn new(username: String) -> Self {
        Self {
            uid: Uuid::new_v4().to_string(),
            username,
            created_at: Utc::now(),
        }
    }
}
