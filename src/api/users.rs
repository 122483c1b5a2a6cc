//! User management endpoints (admin surface)

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{error::AppResult, models::user::UserShort};

use super::AuthenticatedUser;

/// Paginated user listing
#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub items: Vec<UserShort>,
    pub total: i64,
}

/// User listing query
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct UserQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Account activation payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateActive {
    pub active: bool,
}

/// List users (admin)
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    params(UserQuery),
    responses(
        (status = 200, description = "Users", body = UserListResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_users(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<UserQuery>,
) -> AppResult<Json<UserListResponse>> {
    claims.require_admin()?;

    let (items, total) = state
        .services
        .users
        .list(query.page.unwrap_or(1), query.per_page.unwrap_or(20))
        .await?;
    Ok(Json(UserListResponse { items, total }))
}

/// Get a user (admin)
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User", body = UserShort),
        (status = 404, description = "User not found")
    )
)]
pub async fn get_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<UserShort>> {
    claims.require_admin()?;

    let user = state.services.users.get(id).await?;
    Ok(Json(user))
}

/// Activate or deactivate an account (admin)
#[utoipa::path(
    put,
    path = "/users/{id}/active",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "User ID")),
    request_body = UpdateActive,
    responses(
        (status = 200, description = "Account updated", body = UserShort),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_active(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateActive>,
) -> AppResult<Json<UserShort>> {
    claims.require_admin()?;

    state.services.users.set_active(id, payload.active).await?;
    let user = state.services.users.get(id).await?;
    Ok(Json(user))
}
