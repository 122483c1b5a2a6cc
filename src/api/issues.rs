//! Issuance ledger endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{
        copy::CopyStatus,
        issue::{CreateDirectIssue, IssueDetails, IssueQuery, ReturnIssueRequest},
    },
};

use super::AuthenticatedUser;

/// Paginated issue listing
#[derive(Serialize, ToSchema)]
pub struct IssueListResponse {
    pub items: Vec<IssueDetails>,
    pub total: i64,
}

/// Return response with the copy's resulting shelf status
#[derive(Serialize, ToSchema)]
pub struct ReturnIssueResponse {
    pub issue: IssueDetails,
    pub copy_status: CopyStatus,
}

/// Filter for own-issue listing
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct MyIssuesQuery {
    pub include_returned: Option<bool>,
}

/// Direct (walk-in) issuance (admin): hand an available copy to a member
/// with no prior request
#[utoipa::path(
    post,
    path = "/issues",
    tag = "issues",
    security(("bearer_auth" = [])),
    request_body = CreateDirectIssue,
    responses(
        (status = 201, description = "Issue created", body = IssueDetails),
        (status = 404, description = "Member or copy not found"),
        (status = 422, description = "Copy is not available")
    )
)]
pub async fn create_issue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<CreateDirectIssue>,
) -> AppResult<(StatusCode, Json<IssueDetails>)> {
    claims.require_admin()?;

    let issue = state
        .services
        .issuance
        .direct_issue(&payload, claims.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(issue.into())))
}

/// List issues with filters (admin)
#[utoipa::path(
    get,
    path = "/issues",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(IssueQuery),
    responses(
        (status = 200, description = "Matching issues", body = IssueListResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_issues(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<IssueQuery>,
) -> AppResult<Json<IssueListResponse>> {
    claims.require_admin()?;

    let (issues, total) = state.services.issuance.list(&query).await?;
    Ok(Json(IssueListResponse {
        items: issues.into_iter().map(Into::into).collect(),
        total,
    }))
}

/// List the caller's issues
#[utoipa::path(
    get,
    path = "/issues/mine",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(MyIssuesQuery),
    responses(
        (status = 200, description = "Caller's issues", body = Vec<IssueDetails>)
    )
)]
pub async fn list_my_issues(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<MyIssuesQuery>,
) -> AppResult<Json<Vec<IssueDetails>>> {
    claims.require_member()?;

    let issues = state
        .services
        .issuance
        .list_own(claims.user_id, query.include_returned.unwrap_or(false))
        .await?;
    Ok(Json(issues.into_iter().map(Into::into).collect()))
}

/// Get an issue (own, or any for admins)
#[utoipa::path(
    get,
    path = "/issues/{id}",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Issue ID")),
    responses(
        (status = 200, description = "Issue", body = IssueDetails),
        (status = 403, description = "Issue belongs to another member"),
        (status = 404, description = "Issue not found")
    )
)]
pub async fn get_issue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<IssueDetails>> {
    let issue = state.services.issuance.get(id, &claims).await?;
    Ok(Json(issue.into()))
}

/// Return a copy by issue id (admin). Completes the linked request when one
/// exists, skipping the member return-request step.
#[utoipa::path(
    post,
    path = "/issues/{id}/return",
    tag = "issues",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Issue ID")),
    request_body = ReturnIssueRequest,
    responses(
        (status = 200, description = "Copy returned", body = ReturnIssueResponse),
        (status = 404, description = "Issue not found"),
        (status = 409, description = "Issue already returned")
    )
)]
pub async fn return_issue(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<ReturnIssueRequest>,
) -> AppResult<Json<ReturnIssueResponse>> {
    claims.require_admin()?;

    let (issue, copy) = state
        .services
        .issuance
        .return_by_id(id, payload.condition)
        .await?;
    Ok(Json(ReturnIssueResponse {
        issue: issue.into(),
        copy_status: copy.status,
    }))
}
