//! Issues repository: the physical-possession ledger.
//!
//! Issue records are append-only: the only mutation ever applied is setting
//! `return_date`, once. Copy status changes ride in the same transaction as
//! the issue write so the ledger and the shelf can never disagree.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        copy::{BookCopy, CopyStatus},
        issue::{due_date_for, IssueBook, IssueQuery, ReturnCondition},
    },
    repository::{copies, is_unique_violation},
};

/// Insert an issue record. The caller is responsible for having moved the
/// copy to `issued` in the same transaction.
pub(crate) async fn create(
    conn: &mut PgConnection,
    member_id: i64,
    copy_id: i64,
    issued_by: i64,
    request_id: Option<i64>,
    due_override: Option<DateTime<Utc>>,
) -> AppResult<IssueBook> {
    let already_held: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM issue_books
            WHERE member_id = $1 AND copy_id = $2 AND return_date IS NULL
        )
        "#,
    )
    .bind(member_id)
    .bind(copy_id)
    .fetch_one(&mut *conn)
    .await?;
    if already_held {
        return Err(AppError::Conflict(
            "Member already holds an unreturned issue of this copy".to_string(),
        ));
    }

    let now = Utc::now();
    let due_date = due_date_for(now, due_override);

    sqlx::query_as::<_, IssueBook>(
        r#"
        INSERT INTO issue_books (member_id, copy_id, issued_by, request_id, issue_date, due_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(member_id)
    .bind(copy_id)
    .bind(issued_by)
    .bind(request_id)
    .bind(now)
    .bind(due_date)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Copy is already out on another issue".to_string())
        } else {
            AppError::Database(e)
        }
    })
}

/// Close the open issue belonging to a request; the conditional update is
/// the guard against double returns.
pub(crate) async fn close_open_for_request(
    conn: &mut PgConnection,
    request_id: i64,
) -> AppResult<IssueBook> {
    sqlx::query_as::<_, IssueBook>(
        r#"
        UPDATE issue_books
        SET return_date = NOW()
        WHERE request_id = $1 AND return_date IS NULL
        RETURNING *
        "#,
    )
    .bind(request_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No open issue for request {}", request_id)))
}

#[derive(Clone)]
pub struct IssuesRepository {
    pool: Pool<Postgres>,
}

impl IssuesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get issue by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<IssueBook> {
        sqlx::query_as::<_, IssueBook>("SELECT * FROM issue_books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Issue with id {} not found", id)))
    }

    /// List issues with filters and pagination
    pub async fn list(&self, query: &IssueQuery) -> AppResult<(Vec<IssueBook>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM issue_books WHERE 1=1");
        let mut qb = QueryBuilder::new("SELECT * FROM issue_books WHERE 1=1");
        for builder in [&mut count_qb, &mut qb] {
            if let Some(member_id) = query.member_id {
                builder.push(" AND member_id = ").push_bind(member_id);
            }
            if query.overdue.unwrap_or(false) {
                builder.push(" AND return_date IS NULL AND due_date < NOW()");
            } else if !query.include_returned.unwrap_or(false) {
                builder.push(" AND return_date IS NULL");
            }
        }
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        qb.push(" ORDER BY issue_date DESC LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind((page - 1) * per_page);
        let issues = qb.build_query_as::<IssueBook>().fetch_all(&self.pool).await?;

        Ok((issues, total))
    }

    /// Direct (walk-in) issuance: an available copy is handed straight to a
    /// member with no prior request. The issue carries no request link; the
    /// origin tag distinguishes it in history.
    pub async fn direct_issue(
        &self,
        member_id: i64,
        copy_id: i64,
        admin_id: i64,
        due_date: Option<DateTime<Utc>>,
    ) -> AppResult<IssueBook> {
        let mut tx = self.pool.begin().await?;

        copies::transition(&mut tx, copy_id, &[CopyStatus::Available], CopyStatus::Issued).await?;
        let issue = create(&mut tx, member_id, copy_id, admin_id, None, due_date).await?;

        tx.commit().await?;
        Ok(issue)
    }

    /// Return by issue id. Closes the issue, releases the copy under the
    /// recorded condition, and completes the linked request when one exists
    /// (the admin-direct return path skips `return_requested`).
    pub async fn return_by_id(
        &self,
        issue_id: i64,
        condition: ReturnCondition,
    ) -> AppResult<(IssueBook, BookCopy)> {
        let mut tx = self.pool.begin().await?;

        let issue = sqlx::query_as::<_, IssueBook>(
            "SELECT * FROM issue_books WHERE id = $1 FOR UPDATE",
        )
        .bind(issue_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Issue with id {} not found", issue_id)))?;

        if issue.return_date.is_some() {
            return Err(AppError::AlreadyReturned { issue_id });
        }

        let issue = sqlx::query_as::<_, IssueBook>(
            "UPDATE issue_books SET return_date = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(issue_id)
        .fetch_one(&mut *tx)
        .await?;

        let copy = copies::release(&mut tx, issue.copy_id, condition.into()).await?;

        if let Some(request_id) = issue.request_id {
            let result = sqlx::query(
                r#"
                UPDATE book_requests
                SET status = 'completed', reserved_copy_id = NULL,
                    completed_at = NOW(), updated_at = NOW()
                WHERE id = $1 AND status IN ('collected', 'return_requested')
                "#,
            )
            .bind(request_id)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                tracing::warn!(
                    "Issue {} returned but linked request {} was not in a returnable status",
                    issue_id,
                    request_id
                );
            }
        }

        tx.commit().await?;
        Ok((issue, copy))
    }

    /// Count unreturned issues
    pub async fn count_active(&self) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM issue_books WHERE return_date IS NULL")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Count unreturned issues past their due date
    pub async fn count_overdue(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM issue_books WHERE return_date IS NULL AND due_date < NOW()",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
