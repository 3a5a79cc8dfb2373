//! Registration, login and profile.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use otherproteins_core::validation::validate_password;
use otherproteins_core::{NewUser, Role, UserProfile};
use otherproteins_db::credentials::{hash_password, verify_password};

use crate::auth::{AuthUser, IssuedToken};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_names: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: IssuedToken,
    pub user: UserProfile,
}

/// Creates a customer account. Admins only come from the seed binary.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    validate_password(&req.password)?;

    let user = state
        .db()
        .users()
        .create(
            &NewUser {
                email: req.email,
                password_hash: hash_password(&req.password)?,
                first_name: req.first_name,
                last_names: req.last_names,
                phone: req.phone.filter(|p| !p.trim().is_empty()),
                role: Role::Customer,
            },
            Utc::now(),
        )
        .await?;

    info!(user_id = user.id, "Customer registered");
    Ok((StatusCode::CREATED, Json(user.profile())))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let user = state.db().users().find_by_email(&req.email.to_lowercase()).await?;

    let user = match user {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        _ => {
            warn!("Failed login attempt");
            return Err(ApiError::unauthorized("Email edo pasahitz okerra."));
        }
    };

    let token = state.jwt().issue(&user)?;
    info!(user_id = user.id, role = user.role.as_str(), "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: user.profile(),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> ApiResult<Json<UserProfile>> {
    let user = state.db().users().get_by_id(actor.user_id).await?;
    Ok(Json(user.profile()))
}
