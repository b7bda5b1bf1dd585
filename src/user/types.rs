use serde::{Deserialize, Serialize};

/// JWT claims identifying a registered user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserClaims {
    pub uid: String,
    pub username: String,
    pub exp: usize, // Expiration timestamp (standard JWT claim)
    pub iat: usize, // Issued at timestamp (standard JWT claim)
}

/// Body of `POST /users`
#[derive(Debug, Default, Deserialize)]
pub struct RegisterUserRequest {
    pub username: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct RegisterUserResponse {
    pub uid: String,
    pub username: String,
    pub token: String,
}
