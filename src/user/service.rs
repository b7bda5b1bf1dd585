use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    generators::generate_username,
    models::UserModel,
    repository::UserRepository,
    token::TokenConfig,
    types::{RegisterUserResponse, UserClaims},
};
use crate::shared::AppError;

const MAX_USERNAME_LEN: usize = 32;

/// Registers users and checks their bearer tokens
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    token_config: TokenConfig,
}

impl UserService {
    pub fn new(repository: Arc<dyn UserRepository>, token_config: TokenConfig) -> Self {
        Self {
            repository,
            token_config,
        }
    }

    /// Creates a user with a fresh uid and returns a token for it
    #[instrument(skip(self))]
    pub async fn register_user(
        &self,
        username: Option<String>,
    ) -> Result<RegisterUserResponse, AppError> {
        let username = match username.map(|name| name.trim().to_string()) {
            Some(name) if name.is_empty() => {
                return Err(AppError::Validation("Username must not be blank".to_string()))
            }
            Some(name) if name.chars().count() > MAX_USERNAME_LEN => {
                return Err(AppError::Validation(format!(
                    "Username must be at most {} characters",
                    MAX_USERNAME_LEN
                )))
            }
            Some(name) => name,
            None => generate_username(),
        };

        let user = UserModel::new(username);
        self.repository.create_user(&user).await?;
        let token = self.token_config.create_token(&user.uid, &user.username)?;

        info!(uid = %user.uid, username = %user.username, "User registered");

        Ok(RegisterUserResponse {
            uid: user.uid,
            username: user.username,
            token,
        })
    }

    /// Validates the token and confirms its user still exists
    #[instrument(skip(self, token))]
    pub async fn validate_token(&self, token: &str) -> Result<UserClaims, AppError> {
        let claims = self.token_config.validate_token(token)?;

        if self.repository.get_user(&claims.uid).await?.is_none() {
            warn!(uid = %claims.uid, "Token refers to an unknown user");
            return Err(AppError::Unauthorized("Unknown user".to_string()));
        }

        Ok(claims)
    }
}
