use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::UserModel;
use crate::shared::AppError;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError>;
    async fn get_user(&self, uid: &str) -> Result<Option<UserModel>, AppError>;
}

/// In-memory implementation of UserRepository for development and testing
#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<HashMap<String, UserModel>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates an in-memory repository with pre-populated users
    pub fn with_users(users: Vec<UserModel>) -> Self {
        let users = users
            .into_iter()
            .map(|user| (user.uid.clone(), user))
            .collect();
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user), fields(uid = %user.uid))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.uid) {
            warn!("User already exists in memory");
            return Err(AppError::DatabaseError("User already exists".to_string()));
        }
        users.insert(user.uid.clone(), user.clone());

        debug!(username = %user.username, "User created in memory");
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> Result<Option<UserModel>, AppError> {
        let users = self.users.read().await;
        Ok(users.get(uid).cloned())
    }
}

/// PostgreSQL implementation of the user identity store
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, user), fields(uid = %user.uid))]
    async fn create_user(&self, user: &UserModel) -> Result<(), AppError> {
        sqlx::query("INSERT INTO users (uid, username, created_at) VALUES ($1, $2, $3)")
            .bind(&user.uid)
            .bind(&user.username)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create user in database");
                AppError::from(e)
            })?;

        debug!(username = %user.username, "User created in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_user(&self, uid: &str) -> Result<Option<UserModel>, AppError> {
        sqlx::query_as::<_, UserModel>("SELECT uid, username, created_at FROM users WHERE uid = $1")
            .bind(uid)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to fetch user from database");
                AppError::from(e)
            })
    }
}
