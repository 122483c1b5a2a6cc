//! Book requests repository: the request lifecycle state machine.
//!
//! Every transition locks the request row, re-validates the current status
//! against the transition table, and performs all entity writes (request,
//! copy, issue) inside one transaction. On any guard failure the transaction
//! is dropped and nothing is persisted.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        copy::CopyStatus,
        issue::{IssueBook, ReturnCondition},
        request::{
            ApproveResult, BookRequest, CollectResult, CompleteDonationRequest,
            CompleteDonationResult, CreateDonationRequest, RejectResult, RequestQuery,
            RequestStatus, RequestType, ReturnResult,
        },
    },
    repository::{books, copies, is_unique_violation, issues},
};

/// Lock a request row for the duration of the enclosing transaction.
async fn lock_request(conn: &mut PgConnection, id: i64) -> AppResult<BookRequest> {
    sqlx::query_as::<_, BookRequest>("SELECT * FROM book_requests WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Request with id {} not found", id)))
}

/// Guard a status move against the transition table.
fn ensure_transition(request: &BookRequest, target: RequestStatus) -> AppResult<()> {
    if request.status.can_transition_to(target, request.request_type) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            entity: "book request",
            current: request.status.to_string(),
            attempted: target.to_string(),
        })
    }
}

#[derive(Clone)]
pub struct RequestsRepository {
    pool: Pool<Postgres>,
}

impl RequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get request by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<BookRequest> {
        sqlx::query_as::<_, BookRequest>("SELECT * FROM book_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Request with id {} not found", id)))
    }

    /// List requests with filters and pagination
    pub async fn list(&self, query: &RequestQuery) -> AppResult<(Vec<BookRequest>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM book_requests WHERE 1=1");
        let mut qb = QueryBuilder::new("SELECT * FROM book_requests WHERE 1=1");
        for builder in [&mut count_qb, &mut qb] {
            if let Some(status) = query.status {
                builder.push(" AND status = ").push_bind(status);
            }
            if let Some(request_type) = query.request_type {
                builder.push(" AND request_type = ").push_bind(request_type);
            }
            if let Some(member_id) = query.member_id {
                builder.push(" AND member_id = ").push_bind(member_id);
            }
        }
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind((page - 1) * per_page);
        let requests = qb
            .build_query_as::<BookRequest>()
            .fetch_all(&self.pool)
            .await?;

        Ok((requests, total))
    }

    /// List a member's own requests, newest first
    pub async fn list_for_member(
        &self,
        member_id: i64,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<BookRequest>> {
        let requests = match status {
            Some(status) => {
                sqlx::query_as::<_, BookRequest>(
                    "SELECT * FROM book_requests WHERE member_id = $1 AND status = $2 ORDER BY created_at DESC",
                )
                .bind(member_id)
                .bind(status)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, BookRequest>(
                    "SELECT * FROM book_requests WHERE member_id = $1 ORDER BY created_at DESC",
                )
                .bind(member_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(requests)
    }

    /// Create a borrow request in `pending` status.
    /// A member may hold only one live (pending/approved) borrow request per
    /// book; the partial unique index backs the check under concurrency.
    pub async fn create_borrow(&self, member_id: i64, book_id: i64) -> AppResult<BookRequest> {
        let book_exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(book_id)
            .fetch_one(&self.pool)
            .await?;
        if !book_exists {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }

        let duplicate: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM book_requests
                WHERE member_id = $1 AND book_id = $2
                  AND request_type = 'borrow'
                  AND status IN ('pending', 'approved')
            )
            "#,
        )
        .bind(member_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        if duplicate {
            return Err(AppError::DuplicateRequest { book_id });
        }

        sqlx::query_as::<_, BookRequest>(
            r#"
            INSERT INTO book_requests (request_type, status, member_id, book_id)
            VALUES ('borrow', 'pending', $1, $2)
            RETURNING *
            "#,
        )
        .bind(member_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::DuplicateRequest { book_id }
            } else {
                AppError::Database(e)
            }
        })
    }

    /// Create a donation request in `pending` status
    pub async fn create_donation(
        &self,
        member_id: i64,
        donation: &CreateDonationRequest,
    ) -> AppResult<BookRequest> {
        let request = sqlx::query_as::<_, BookRequest>(
            r#"
            INSERT INTO book_requests
                (request_type, status, member_id,
                 donation_title, donation_author, donation_year, donation_pages)
            VALUES ('donation', 'pending', $1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(member_id)
        .bind(&donation.title)
        .bind(&donation.author)
        .bind(donation.year)
        .bind(donation.pages)
        .fetch_one(&self.pool)
        .await?;
        Ok(request)
    }

    /// Cancel a pending request. Member-initiated; the row is deleted.
    pub async fn cancel(&self, request_id: i64, member_id: i64) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut tx, request_id).await?;
        if request.member_id != member_id {
            return Err(AppError::Forbidden(
                "Request belongs to another member".to_string(),
            ));
        }
        if request.status != RequestStatus::Pending {
            return Err(AppError::InvalidTransition {
                entity: "book request",
                current: request.status.to_string(),
                attempted: "cancelled".to_string(),
            });
        }

        sqlx::query("DELETE FROM book_requests WHERE id = $1")
            .bind(request_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Approve a pending request. For borrow requests this reserves one
    /// available copy in the same transaction; with none on the shelf the
    /// request stays pending and `NoAvailableCopy` is reported.
    pub async fn approve(&self, request_id: i64, admin_id: i64) -> AppResult<ApproveResult> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut tx, request_id).await?;
        ensure_transition(&request, RequestStatus::Approved)?;

        let reserved_copy_id = match request.request_type {
            RequestType::Borrow => {
                let book_id = request
                    .book_id
                    .ok_or_else(|| AppError::Internal("Borrow request has no book".to_string()))?;
                let copy = copies::reserve_first_available(&mut tx, book_id)
                    .await?
                    .ok_or(AppError::NoAvailableCopy { book_id })?;
                Some(copy.id)
            }
            RequestType::Donation => None,
        };

        sqlx::query(
            r#"
            UPDATE book_requests
            SET status = 'approved', reserved_copy_id = $1, reviewer_id = $2,
                reviewed_at = NOW(), updated_at = NOW()
            WHERE id = $3
            "#,
        )
        .bind(reserved_copy_id)
        .bind(admin_id)
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ApproveResult {
            request_id,
            status: RequestStatus::Approved,
            reserved_copy_id,
        })
    }

    /// Reject a pending or approved request. An approved borrow gives its
    /// reserved copy back to the shelf in the same transaction.
    pub async fn reject(&self, request_id: i64, admin_id: i64) -> AppResult<RejectResult> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut tx, request_id).await?;
        ensure_transition(&request, RequestStatus::Rejected)?;

        let released_copy_id = match request.reserved_copy_id {
            Some(copy_id) => {
                copies::release(&mut tx, copy_id, CopyStatus::Available).await?;
                Some(copy_id)
            }
            None => None,
        };

        sqlx::query(
            r#"
            UPDATE book_requests
            SET status = 'rejected', reserved_copy_id = NULL, reviewer_id = $1,
                reviewed_at = COALESCE(reviewed_at, NOW()), updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(admin_id)
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(RejectResult {
            request_id,
            status: RequestStatus::Rejected,
            released_copy_id,
        })
    }

    /// Hand the reserved copy over to the member: approved -> collected.
    /// Creates the issue record and flips the copy to issued, atomically.
    pub async fn collect(
        &self,
        request_id: i64,
        admin_id: i64,
        due_date: Option<DateTime<Utc>>,
    ) -> AppResult<(CollectResult, IssueBook)> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut tx, request_id).await?;
        ensure_transition(&request, RequestStatus::Collected)?;

        let copy_id = request.reserved_copy_id.ok_or_else(|| {
            AppError::Internal(format!("Approved request {} holds no copy", request_id))
        })?;

        copies::transition(&mut tx, copy_id, &[CopyStatus::Reserved], CopyStatus::Issued).await?;

        let issue = issues::create(
            &mut tx,
            request.member_id,
            copy_id,
            admin_id,
            Some(request_id),
            due_date,
        )
        .await?;

        sqlx::query(
            r#"
            UPDATE book_requests
            SET status = 'collected', collected_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((
            CollectResult {
                request_id,
                status: RequestStatus::Collected,
                issue_id: issue.id,
                due_date: issue.due_date,
            },
            issue,
        ))
    }

    /// Member announces the return: collected -> return_requested
    pub async fn request_return(&self, request_id: i64, member_id: i64) -> AppResult<BookRequest> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut tx, request_id).await?;
        if request.member_id != member_id {
            return Err(AppError::Forbidden(
                "Request belongs to another member".to_string(),
            ));
        }
        ensure_transition(&request, RequestStatus::ReturnRequested)?;

        let updated = sqlx::query_as::<_, BookRequest>(
            r#"
            UPDATE book_requests
            SET status = 'return_requested', updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    /// Admin confirms the physical return: return_requested -> completed.
    /// Closes the issue record and releases the copy under the recorded
    /// condition, atomically.
    pub async fn confirm_return(
        &self,
        request_id: i64,
        condition: ReturnCondition,
    ) -> AppResult<ReturnResult> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut tx, request_id).await?;
        // Direct returns from `collected` go through the issue endpoints;
        // this path confirms a member-announced return only.
        if request.status != RequestStatus::ReturnRequested {
            return Err(AppError::InvalidTransition {
                entity: "book request",
                current: request.status.to_string(),
                attempted: RequestStatus::Completed.to_string(),
            });
        }

        let copy_id = request.reserved_copy_id.ok_or_else(|| {
            AppError::Internal(format!("Request {} holds no copy", request_id))
        })?;

        let issue = issues::close_open_for_request(&mut tx, request_id).await?;
        let copy = copies::release(&mut tx, copy_id, condition.into()).await?;

        sqlx::query(
            r#"
            UPDATE book_requests
            SET status = 'completed', reserved_copy_id = NULL,
                completed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ReturnResult {
            request_id,
            status: RequestStatus::Completed,
            issue_id: issue.id,
            copy_status: copy.status,
        })
    }

    /// Accept an approved donation: approved -> completed. Resolves the
    /// catalog entry by exact (title, author) match and adds the promised
    /// copies. Two spellings of the same title produce two catalog entries;
    /// the dedup is exact-match only.
    pub async fn complete_donation(
        &self,
        request_id: i64,
        payload: &CompleteDonationRequest,
    ) -> AppResult<CompleteDonationResult> {
        let mut tx = self.pool.begin().await?;

        let request = lock_request(&mut tx, request_id).await?;
        if request.request_type != RequestType::Donation {
            return Err(AppError::Validation(
                "Only donation requests can be completed with copies".to_string(),
            ));
        }
        ensure_transition(&request, RequestStatus::Completed)?;

        let title = request
            .donation_title
            .as_deref()
            .ok_or_else(|| AppError::Internal("Donation request has no title".to_string()))?;
        let author = request
            .donation_author
            .as_deref()
            .ok_or_else(|| AppError::Internal("Donation request has no author".to_string()))?;

        let (book_id, book_created) =
            match books::find_by_title_author(&mut tx, title, author).await? {
                Some(book) => (book.id, false),
                None => {
                    let book = books::create_from_donation(
                        &mut tx,
                        title,
                        author,
                        request.donation_year,
                        request.donation_pages,
                    )
                    .await?;
                    (book.id, true)
                }
            };

        copies::add_copies(&mut tx, book_id, payload.copies_to_add).await?;

        sqlx::query(
            r#"
            UPDATE book_requests
            SET status = 'completed', book_id = $1,
                completed_at = NOW(), updated_at = NOW()
            WHERE id = $2
            "#,
        )
        .bind(book_id)
        .bind(request_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(CompleteDonationResult {
            request_id,
            status: RequestStatus::Completed,
            book_id,
            copies_added: payload.copies_to_add,
            book_created,
        })
    }
}
