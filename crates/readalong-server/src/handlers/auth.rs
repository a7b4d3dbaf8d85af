use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use readalong_auth::{hash_password, verify_password};
use readalong_core::{Role, UserId};
use readalong_store::users::{UserRepo, UserRow};
use readalong_store::StoreError;

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public projection of a user row; never carries the password digest.
#[derive(Debug, Serialize)]
pub struct UserPublic {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<UserRow> for UserPublic {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row.role,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserPublic,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest(
            "email and password are required".to_string(),
        ));
    }

    let digest = hash_password(&req.password);
    let user = UserRepo::new(state.db.clone()).create(&req.name, &req.email, &digest, req.role)?;

    let token = state
        .tokens
        .issue(user.id, &user.email, user.role)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    // Unknown email and wrong password produce the same response; the
    // endpoint must not reveal which accounts exist.
    let user = match UserRepo::new(state.db.clone()).find_by_email(&req.email) {
        Ok(user) => user,
        Err(StoreError::NotFound(_)) => {
            return Err(ApiError::Unauthorized("invalid credentials".to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let valid = verify_password(&req.password, &user.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !valid {
        return Err(ApiError::Unauthorized("invalid credentials".to_string()));
    }

    let token = state
        .tokens
        .issue(user.id, &user.email, user.role)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}
