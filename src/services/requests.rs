//! Request lifecycle service: borrow and donation workflows.
//!
//! Transactional state changes live in the repository; this layer adds
//! ownership checks, catalog lookups, and review notifications.

use chrono::{DateTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        issue::{IssueBook, ReturnCondition},
        request::{
            ApproveResult, BookRequest, CollectResult, CompleteDonationRequest,
            CompleteDonationResult, CreateDonationRequest, RejectResult, RequestQuery,
            RequestStatus, ReturnResult,
        },
        user::UserClaims,
    },
    repository::Repository,
    services::email::{notify_detached, EmailService},
};

#[derive(Clone)]
pub struct RequestsService {
    repository: Repository,
    email: EmailService,
}

impl RequestsService {
    pub fn new(repository: Repository, email: EmailService) -> Self {
        Self { repository, email }
    }

    /// Create a borrow request for a catalog title
    pub async fn create_borrow(&self, member_id: i64, book_id: i64) -> AppResult<BookRequest> {
        let request = self.repository.requests.create_borrow(member_id, book_id).await?;
        tracing::info!(request_id = request.id, member_id, book_id, "Borrow request created");
        Ok(request)
    }

    /// Create a donation proposal
    pub async fn create_donation(
        &self,
        member_id: i64,
        donation: &CreateDonationRequest,
    ) -> AppResult<BookRequest> {
        let request = self.repository.requests.create_donation(member_id, donation).await?;
        tracing::info!(request_id = request.id, member_id, "Donation request created");
        Ok(request)
    }

    /// Get a request. Members can read their own; admins can read any.
    pub async fn get(&self, request_id: i64, claims: &UserClaims) -> AppResult<BookRequest> {
        let request = self.repository.requests.get_by_id(request_id).await?;
        if claims.require_admin().is_err() && request.member_id != claims.user_id {
            return Err(AppError::Forbidden(
                "Request belongs to another member".to_string(),
            ));
        }
        Ok(request)
    }

    /// List requests with filters (admin surface)
    pub async fn list(&self, query: &RequestQuery) -> AppResult<(Vec<BookRequest>, i64)> {
        self.repository.requests.list(query).await
    }

    /// List the calling member's requests
    pub async fn list_own(
        &self,
        member_id: i64,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<BookRequest>> {
        self.repository.requests.list_for_member(member_id, status).await
    }

    /// Cancel an own pending request
    pub async fn cancel(&self, request_id: i64, member_id: i64) -> AppResult<()> {
        self.repository.requests.cancel(request_id, member_id).await?;
        tracing::info!(request_id, member_id, "Request cancelled");
        Ok(())
    }

    /// Approve a pending request; borrow requests reserve a copy
    pub async fn approve(&self, request_id: i64, admin_id: i64) -> AppResult<ApproveResult> {
        let result = self.repository.requests.approve(request_id, admin_id).await?;
        tracing::info!(
            request_id,
            admin_id,
            reserved_copy_id = ?result.reserved_copy_id,
            "Request approved"
        );
        self.notify_review_outcome(request_id, true).await;
        Ok(result)
    }

    /// Reject a pending or approved request; a held copy goes back on the shelf
    pub async fn reject(&self, request_id: i64, admin_id: i64) -> AppResult<RejectResult> {
        let result = self.repository.requests.reject(request_id, admin_id).await?;
        tracing::info!(
            request_id,
            admin_id,
            released_copy_id = ?result.released_copy_id,
            "Request rejected"
        );
        self.notify_review_outcome(request_id, false).await;
        Ok(result)
    }

    /// Hand over the reserved copy: approved -> collected
    pub async fn collect(
        &self,
        request_id: i64,
        admin_id: i64,
        due_date: Option<DateTime<Utc>>,
    ) -> AppResult<(CollectResult, IssueBook)> {
        let result = self.repository.requests.collect(request_id, admin_id, due_date).await?;
        tracing::info!(request_id, admin_id, issue_id = result.0.issue_id, "Request collected");
        Ok(result)
    }

    /// Member announces a return: collected -> return_requested
    pub async fn request_return(&self, request_id: i64, member_id: i64) -> AppResult<BookRequest> {
        self.repository.requests.request_return(request_id, member_id).await
    }

    /// Admin confirms the return: return_requested -> completed
    pub async fn confirm_return(
        &self,
        request_id: i64,
        condition: ReturnCondition,
    ) -> AppResult<ReturnResult> {
        let result = self.repository.requests.confirm_return(request_id, condition).await?;
        tracing::info!(request_id, %condition, "Return confirmed");
        Ok(result)
    }

    /// Accept an approved donation into the catalog
    pub async fn complete_donation(
        &self,
        request_id: i64,
        payload: &CompleteDonationRequest,
    ) -> AppResult<CompleteDonationResult> {
        let result = self.repository.requests.complete_donation(request_id, payload).await?;
        tracing::info!(
            request_id,
            book_id = result.book_id,
            copies_added = result.copies_added,
            book_created = result.book_created,
            "Donation completed"
        );
        Ok(result)
    }

    /// Queue a review-outcome email without blocking or failing the
    /// transition. Lookup problems are logged and swallowed.
    async fn notify_review_outcome(&self, request_id: i64, approved: bool) {
        let (recipient, title) = match self.review_notification_context(request_id).await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::warn!(request_id, "Skipping review notification: {}", e);
                return;
            }
        };

        let email = self.email.clone();
        notify_detached(async move {
            if approved {
                email.send_request_approved(&recipient, &title).await
            } else {
                email.send_request_rejected(&recipient, &title).await
            }
        });
    }

    async fn review_notification_context(&self, request_id: i64) -> AppResult<(String, String)> {
        let request = self.repository.requests.get_by_id(request_id).await?;
        let member = self.repository.users.get_by_id(request.member_id).await?;
        let title = match request.book_id {
            Some(book_id) => self.repository.books.get_by_id(book_id).await?.title,
            None => request
                .donation_title
                .unwrap_or_else(|| "your donation".to_string()),
        };
        Ok((member.email, title))
    }
}
