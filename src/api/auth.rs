//! Authentication and account endpoints

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::user::{Login, RegisterAdmin, RegisterUser, UpdateProfile, UserShort, VerifyEmail},
};

use super::AuthenticatedUser;

/// Login response with bearer token
#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub user: UserShort,
}

/// Registration response
#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user: UserShort,
    pub message: String,
}

/// Register a member account
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterUser,
    responses(
        (status = 201, description = "Account created, verification email sent", body = RegisterResponse),
        (status = 400, description = "Invalid payload"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<crate::AppState>,
    Json(payload): Json<RegisterUser>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    payload.validate()?;

    let user = state.services.users.register_member(&payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            message: "Account created. Check your email for the verification code.".to_string(),
        }),
    ))
}

/// Register an admin account (requires the configured secret code)
#[utoipa::path(
    post,
    path = "/auth/register-admin",
    tag = "auth",
    request_body = RegisterAdmin,
    responses(
        (status = 201, description = "Admin account created", body = RegisterResponse),
        (status = 403, description = "Invalid secret code"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register_admin(
    State(state): State<crate::AppState>,
    Json(payload): Json<RegisterAdmin>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    payload.validate()?;

    let user = state.services.users.register_admin(&payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            message: "Admin account created.".to_string(),
        }),
    ))
}

/// Confirm an emailed verification code
#[utoipa::path(
    post,
    path = "/auth/verify-email",
    tag = "auth",
    request_body = VerifyEmail,
    responses(
        (status = 204, description = "Email verified"),
        (status = 400, description = "Invalid or expired code")
    )
)]
pub async fn verify_email(
    State(state): State<crate::AppState>,
    Json(payload): Json<VerifyEmail>,
) -> AppResult<StatusCode> {
    payload.validate()?;

    state.services.users.verify_email(&payload.email, &payload.code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Authenticate and receive a bearer token
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = Login,
    responses(
        (status = 200, description = "Authenticated", body = LoginResponse),
        (status = 401, description = "Invalid credentials or unverified email")
    )
)]
pub async fn login(
    State(state): State<crate::AppState>,
    Json(payload): Json<Login>,
) -> AppResult<Json<LoginResponse>> {
    let (token, user) = state
        .services
        .users
        .authenticate(&payload.email, &payload.password)
        .await?;

    Ok(Json(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        user: user.into(),
    }))
}

/// Current principal's profile
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserShort),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<UserShort>> {
    let user = state.services.users.get_profile(claims.user_id).await?;
    Ok(Json(user.into()))
}

/// Update the caller's profile
#[utoipa::path(
    put,
    path = "/auth/profile",
    tag = "auth",
    security(("bearer_auth" = [])),
    request_body = UpdateProfile,
    responses(
        (status = 200, description = "Profile updated", body = UserShort),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn update_my_profile(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<UpdateProfile>,
) -> AppResult<Json<UserShort>> {
    payload.validate()?;

    let user = state
        .services
        .users
        .update_profile(claims.user_id, &payload)
        .await?;
    Ok(Json(user.into()))
}
