//! Book copies repository: the single write path for copy status.
//!
//! Every copy-status mutation in the system goes through the functions in
//! this module. The guard and the write are always one conditional statement
//! checking the affected-row count, so a concurrent transition on the same
//! copy cannot slip between a status check and a status write.

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::copy::{BookCopy, CopyCounts, CopyStatus},
};

/// Atomically claim one available copy of a book and mark it reserved.
/// Picks the lowest id; returns None when the book has no available copy.
pub(crate) async fn reserve_first_available(
    conn: &mut PgConnection,
    book_id: i64,
) -> AppResult<Option<BookCopy>> {
    let copy = sqlx::query_as::<_, BookCopy>(
        r#"
        UPDATE book_copies
        SET status = 'reserved', updated_at = NOW()
        WHERE id = (
            SELECT id FROM book_copies
            WHERE book_id = $1 AND status = 'available'
            ORDER BY id
            LIMIT 1
            FOR UPDATE SKIP LOCKED
        )
        RETURNING *
        "#,
    )
    .bind(book_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(copy)
}

/// Conditionally move a copy from one of `expected` statuses to `target`.
/// Zero rows affected means the copy is missing or not in an expected status;
/// the follow-up read distinguishes the two for the error report.
pub(crate) async fn transition(
    conn: &mut PgConnection,
    copy_id: i64,
    expected: &[CopyStatus],
    target: CopyStatus,
) -> AppResult<BookCopy> {
    let expected_strs: Vec<String> = expected.iter().map(|s| s.as_str().to_string()).collect();

    let updated = sqlx::query_as::<_, BookCopy>(
        r#"
        UPDATE book_copies
        SET status = $1, updated_at = NOW()
        WHERE id = $2 AND status = ANY($3)
        RETURNING *
        "#,
    )
    .bind(target)
    .bind(copy_id)
    .bind(&expected_strs)
    .fetch_optional(&mut *conn)
    .await?;

    match updated {
        Some(copy) => Ok(copy),
        None => {
            let current: Option<String> =
                sqlx::query_scalar("SELECT status FROM book_copies WHERE id = $1")
                    .bind(copy_id)
                    .fetch_optional(&mut *conn)
                    .await?;
            match current {
                Some(current) => Err(AppError::InvalidTransition {
                    entity: "book copy",
                    current,
                    attempted: target.to_string(),
                }),
                None => Err(AppError::NotFound(format!("Copy with id {} not found", copy_id))),
            }
        }
    }
}

/// Put a copy back on the shelf or retire it. Releasing to `available` is
/// legal from `reserved` (rejection, cancellation) and from `issued`
/// (return); `damaged`/`lost` only from `issued`.
pub(crate) async fn release(
    conn: &mut PgConnection,
    copy_id: i64,
    target: CopyStatus,
) -> AppResult<BookCopy> {
    let expected: &[CopyStatus] = match target {
        CopyStatus::Available => &[CopyStatus::Reserved, CopyStatus::Issued],
        CopyStatus::Damaged | CopyStatus::Lost => &[CopyStatus::Issued],
        CopyStatus::Reserved | CopyStatus::Issued => {
            return Err(AppError::Validation(format!(
                "'{}' is not a release target",
                target
            )))
        }
    };
    transition(conn, copy_id, expected, target).await
}

/// Create `count` copies of a book, all available.
pub(crate) async fn add_copies(
    conn: &mut PgConnection,
    book_id: i64,
    count: i32,
) -> AppResult<Vec<BookCopy>> {
    if count < 1 {
        return Err(AppError::Validation("Copy count must be at least 1".to_string()));
    }

    let copies = sqlx::query_as::<_, BookCopy>(
        r#"
        INSERT INTO book_copies (book_id, status)
        SELECT $1, 'available' FROM generate_series(1, $2)
        RETURNING *
        "#,
    )
    .bind(book_id)
    .bind(count)
    .fetch_all(&mut *conn)
    .await?;

    Ok(copies)
}

#[derive(Clone)]
pub struct CopiesRepository {
    pool: Pool<Postgres>,
}

impl CopiesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get copy by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<BookCopy> {
        sqlx::query_as::<_, BookCopy>("SELECT * FROM book_copies WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Copy with id {} not found", id)))
    }

    /// List copies of a book
    pub async fn list_for_book(&self, book_id: i64) -> AppResult<Vec<BookCopy>> {
        let copies = sqlx::query_as::<_, BookCopy>(
            "SELECT * FROM book_copies WHERE book_id = $1 ORDER BY id",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(copies)
    }

    /// Any one available copy of a book, lowest id first
    pub async fn find_available_copy(&self, book_id: i64) -> AppResult<Option<BookCopy>> {
        let copy = sqlx::query_as::<_, BookCopy>(
            "SELECT * FROM book_copies WHERE book_id = $1 AND status = 'available' ORDER BY id LIMIT 1",
        )
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(copy)
    }

    /// Per-status copy counts for a book
    pub async fn counts_for_book(&self, book_id: i64) -> AppResult<CopyCounts> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM book_copies WHERE book_id = $1 GROUP BY status",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = CopyCounts::default();
        for (status, n) in rows {
            counts.total += n;
            match status.parse::<CopyStatus>() {
                Ok(CopyStatus::Available) => counts.available = n,
                Ok(CopyStatus::Reserved) => counts.reserved = n,
                Ok(CopyStatus::Issued) => counts.issued = n,
                Ok(CopyStatus::Damaged) => counts.damaged = n,
                Ok(CopyStatus::Lost) => counts.lost = n,
                Err(e) => return Err(AppError::Internal(e)),
            }
        }
        Ok(counts)
    }

    /// Reserve a specific copy: available -> reserved
    pub async fn reserve(&self, copy_id: i64) -> AppResult<BookCopy> {
        let mut conn = self.pool.acquire().await?;
        transition(&mut conn, copy_id, &[CopyStatus::Available], CopyStatus::Reserved).await
    }

    /// Issue a copy: reserved -> issued, or available -> issued for walk-ins
    pub async fn issue(&self, copy_id: i64) -> AppResult<BookCopy> {
        let mut conn = self.pool.acquire().await?;
        transition(
            &mut conn,
            copy_id,
            &[CopyStatus::Reserved, CopyStatus::Available],
            CopyStatus::Issued,
        )
        .await
    }

    /// Release a copy back to the shelf or retire it
    pub async fn release(&self, copy_id: i64, target: CopyStatus) -> AppResult<BookCopy> {
        let mut conn = self.pool.acquire().await?;
        release(&mut conn, copy_id, target).await
    }

    /// Add copies of a book, all available
    pub async fn add_copies(&self, book_id: i64, count: i32) -> AppResult<Vec<BookCopy>> {
        let mut conn = self.pool.acquire().await?;
        add_copies(&mut conn, book_id, count).await
    }

    /// Delete a copy. Copies that are reserved or issued cannot be deleted,
    /// nor can copies with issuance history (the ledger is immutable).
    pub async fn delete(&self, copy_id: i64) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM book_copies WHERE id = $1 AND status NOT IN ('reserved', 'issued')",
        )
        .bind(copy_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if super::is_fk_violation(&e) {
                AppError::Conflict("Copy has issuance history and cannot be deleted".to_string())
            } else {
                AppError::Database(e)
            }
        })?;

        if result.rows_affected() == 0 {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM book_copies WHERE id = $1)")
                    .bind(copy_id)
                    .fetch_one(&self.pool)
                    .await?;
            if exists {
                return Err(AppError::Conflict(
                    "Copy is reserved or issued and cannot be deleted".to_string(),
                ));
            }
            return Err(AppError::NotFound(format!("Copy with id {} not found", copy_id)));
        }
        Ok(())
    }
}
