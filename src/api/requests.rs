//! Borrow and donation request endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::AppResult,
    models::request::{
        ApproveResult, BookRequest, CollectRequest, CollectResult, CompleteDonationRequest,
        CompleteDonationResult, ConfirmReturnRequest, CreateBorrowRequest, CreateDonationRequest,
        RejectResult, RequestQuery, RequestStatus, ReturnResult,
    },
};

use super::AuthenticatedUser;

/// Paginated request listing
#[derive(Serialize, ToSchema)]
pub struct RequestListResponse {
    pub items: Vec<BookRequest>,
    pub total: i64,
}

/// Status filter for own-request listing
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct MyRequestsQuery {
    pub status: Option<RequestStatus>,
}

/// Create a borrow request for a catalog title
#[utoipa::path(
    post,
    path = "/requests/borrow",
    tag = "requests",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Request created", body = BookRequest),
        (status = 404, description = "Book not found"),
        (status = 409, description = "Open request for this book already exists")
    )
)]
pub async fn create_borrow_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<BookRequest>)> {
    claims.require_member()?;

    let request = state
        .services
        .requests
        .create_borrow(claims.user_id, payload.book_id)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Propose a donation
#[utoipa::path(
    post,
    path = "/requests/donation",
    tag = "requests",
    security(("bearer_auth" = [])),
    request_body = CreateDonationRequest,
    responses(
        (status = 201, description = "Request created", body = BookRequest),
        (status = 400, description = "Invalid payload")
    )
)]
pub async fn create_donation_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<CreateDonationRequest>,
) -> AppResult<(StatusCode, Json<BookRequest>)> {
    claims.require_member()?;
    payload.validate()?;

    let request = state
        .services
        .requests
        .create_donation(claims.user_id, &payload)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// List all requests with filters (admin)
#[utoipa::path(
    get,
    path = "/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(RequestQuery),
    responses(
        (status = 200, description = "Matching requests", body = RequestListResponse),
        (status = 403, description = "Admin role required")
    )
)]
pub async fn list_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<RequestQuery>,
) -> AppResult<Json<RequestListResponse>> {
    claims.require_admin()?;

    let (items, total) = state.services.requests.list(&query).await?;
    Ok(Json(RequestListResponse { items, total }))
}

/// List the caller's requests
#[utoipa::path(
    get,
    path = "/requests/mine",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(MyRequestsQuery),
    responses(
        (status = 200, description = "Caller's requests", body = Vec<BookRequest>)
    )
)]
pub async fn list_my_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<MyRequestsQuery>,
) -> AppResult<Json<Vec<BookRequest>>> {
    claims.require_member()?;

    let requests = state
        .services
        .requests
        .list_own(claims.user_id, query.status)
        .await?;
    Ok(Json(requests))
}

/// Get a request (own, or any for admins)
#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request", body = BookRequest),
        (status = 403, description = "Request belongs to another member"),
        (status = 404, description = "Request not found")
    )
)]
pub async fn get_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BookRequest>> {
    let request = state.services.requests.get(id, &claims).await?;
    Ok(Json(request))
}

/// Cancel an own pending request
#[utoipa::path(
    delete,
    path = "/requests/{id}",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Request ID")),
    responses(
        (status = 204, description = "Request cancelled"),
        (status = 403, description = "Request belongs to another member"),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Request is no longer pending")
    )
)]
pub async fn cancel_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    claims.require_member()?;

    state.services.requests.cancel(id, claims.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Approve a pending request (admin). Borrow requests reserve a copy.
#[utoipa::path(
    post,
    path = "/requests/{id}/approve",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request approved", body = ApproveResult),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Not pending, or no available copy")
    )
)]
pub async fn approve_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApproveResult>> {
    claims.require_admin()?;

    let result = state.services.requests.approve(id, claims.user_id).await?;
    Ok(Json(result))
}

/// Reject a pending or approved request (admin)
#[utoipa::path(
    post,
    path = "/requests/{id}/reject",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request rejected", body = RejectResult),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Request is not pending or approved")
    )
)]
pub async fn reject_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<RejectResult>> {
    claims.require_admin()?;

    let result = state.services.requests.reject(id, claims.user_id).await?;
    Ok(Json(result))
}

/// Hand over the reserved copy (admin): approved -> collected
#[utoipa::path(
    post,
    path = "/requests/{id}/collect",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Request ID")),
    request_body = CollectRequest,
    responses(
        (status = 200, description = "Copy handed over", body = CollectResult),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Request is not approved")
    )
)]
pub async fn collect_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<CollectRequest>,
) -> AppResult<Json<CollectResult>> {
    claims.require_admin()?;

    let (result, _issue) = state
        .services
        .requests
        .collect(id, claims.user_id, payload.due_date)
        .await?;
    Ok(Json(result))
}

/// Announce a return (member): collected -> return_requested
#[utoipa::path(
    post,
    path = "/requests/{id}/return-request",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Return requested", body = BookRequest),
        (status = 403, description = "Request belongs to another member"),
        (status = 422, description = "Request is not collected")
    )
)]
pub async fn request_return(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
) -> AppResult<Json<BookRequest>> {
    claims.require_member()?;

    let request = state
        .services
        .requests
        .request_return(id, claims.user_id)
        .await?;
    Ok(Json(request))
}

/// Confirm a member-announced return (admin): return_requested -> completed
#[utoipa::path(
    post,
    path = "/requests/{id}/confirm-return",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Request ID")),
    request_body = ConfirmReturnRequest,
    responses(
        (status = 200, description = "Return confirmed", body = ReturnResult),
        (status = 404, description = "Request not found"),
        (status = 422, description = "Request is not awaiting return confirmation")
    )
)]
pub async fn confirm_return(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<ConfirmReturnRequest>,
) -> AppResult<Json<ReturnResult>> {
    claims.require_admin()?;

    let result = state
        .services
        .requests
        .confirm_return(id, payload.condition)
        .await?;
    Ok(Json(result))
}

/// Accept an approved donation into the catalog (admin)
#[utoipa::path(
    post,
    path = "/requests/{id}/complete",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i64, Path, description = "Request ID")),
    request_body = CompleteDonationRequest,
    responses(
        (status = 200, description = "Donation accepted", body = CompleteDonationResult),
        (status = 400, description = "Invalid copy count or not a donation"),
        (status = 422, description = "Request is not approved")
    )
)]
pub async fn complete_donation(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i64>,
    Json(payload): Json<CompleteDonationRequest>,
) -> AppResult<Json<CompleteDonationResult>> {
    claims.require_admin()?;
    payload.validate()?;

    let result = state.services.requests.complete_donation(id, &payload).await?;
    Ok(Json(result))
}
