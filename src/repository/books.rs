//! Books repository for catalog operations

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookQuery, BookShort, CreateBook, UpdateBook},
    repository::is_fk_violation,
};

/// Exact (title, author) lookup used by donation acceptance. No
/// normalization or fuzzy matching: two spellings are two catalog entries.
pub(crate) async fn find_by_title_author(
    conn: &mut PgConnection,
    title: &str,
    author: &str,
) -> AppResult<Option<Book>> {
    let book = sqlx::query_as::<_, Book>(
        "SELECT * FROM books WHERE title = $1 AND author = $2 ORDER BY id LIMIT 1",
    )
    .bind(title)
    .bind(author)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(book)
}

/// Create a catalog entry from donation metadata
pub(crate) async fn create_from_donation(
    conn: &mut PgConnection,
    title: &str,
    author: &str,
    year: Option<i32>,
    pages: Option<i32>,
) -> AppResult<Book> {
    let book = sqlx::query_as::<_, Book>(
        r#"
        INSERT INTO books (title, author, published_year, pages)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(title)
    .bind(author)
    .bind(year)
    .bind(pages)
    .fetch_one(&mut *conn)
    .await?;
    Ok(book)
}

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i64) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Create a new book
    pub async fn create(&self, book: &CreateBook) -> AppResult<Book> {
        let created = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author, published_year, pages, cover_url, category_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.published_year)
        .bind(book.pages)
        .bind(&book.cover_url)
        .bind(book.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_fk_violation(&e) {
                AppError::NotFound("Category not found".to_string())
            } else {
                AppError::Database(e)
            }
        })?;
        Ok(created)
    }

    /// Update a book; absent fields keep their current value
    pub async fn update(&self, id: i64, book: &UpdateBook) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                author = COALESCE($3, author),
                published_year = COALESCE($4, published_year),
                pages = COALESCE($5, pages),
                cover_url = COALESCE($6, cover_url),
                category_id = COALESCE($7, category_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.published_year)
        .bind(book.pages)
        .bind(&book.cover_url)
        .bind(book.category_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Delete a book. Refused while any copy is off the shelf, and refused
    /// when request or issue history references it.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let has_unavailable: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM book_copies
                WHERE book_id = $1 AND status != 'available'
            )
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        if has_unavailable {
            return Err(AppError::Conflict(
                "Book has copies that are reserved, issued, damaged or lost".to_string(),
            ));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_fk_violation(&e) {
                    AppError::Conflict(
                        "Book is referenced by request or issue history".to_string(),
                    )
                } else {
                    AppError::Database(e)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    /// Search books with filters and pagination; copy counts come along for
    /// availability display.
    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<BookShort>, i64)> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM books b WHERE 1=1");
        let mut qb = QueryBuilder::new(
            r#"
            SELECT b.id, b.title, b.author, b.published_year, b.category_id,
                   (SELECT COUNT(*) FROM book_copies c WHERE c.book_id = b.id) AS nb_copies,
                   (SELECT COUNT(*) FROM book_copies c
                    WHERE c.book_id = b.id AND c.status = 'available') AS nb_available
            FROM books b WHERE 1=1
            "#,
        );
        for builder in [&mut count_qb, &mut qb] {
            if let Some(ref title) = query.title {
                builder
                    .push(" AND b.title ILIKE ")
                    .push_bind(format!("%{}%", title));
            }
            if let Some(ref author) = query.author {
                builder
                    .push(" AND b.author ILIKE ")
                    .push_bind(format!("%{}%", author));
            }
            if let Some(category_id) = query.category_id {
                builder.push(" AND b.category_id = ").push_bind(category_id);
            }
        }
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        qb.push(" ORDER BY b.title, b.id LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind((page - 1) * per_page);
        let books = qb.build_query_as::<BookShort>().fetch_all(&self.pool).await?;

        Ok((books, total))
    }

    /// Whether a book exists
    pub async fn exists(&self, id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}
