//! Catalog management service: books and categories

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookQuery, BookShort, CreateBook, UpdateBook},
        category::{Category, CreateCategory},
        copy::CopyCounts,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books with filters
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<(Vec<BookShort>, i64)> {
        self.repository.books.search(query).await
    }

    /// Get book by ID
    pub async fn get_book(&self, id: i64) -> AppResult<Book> {
        self.repository.books.get_by_id(id).await
    }

    /// Get book by ID together with its copy counts
    pub async fn get_book_with_counts(&self, id: i64) -> AppResult<(Book, CopyCounts)> {
        let book = self.repository.books.get_by_id(id).await?;
        let counts = self.repository.copies.counts_for_book(id).await?;
        Ok((book, counts))
    }

    /// Create a new book. Title-level entries are not deduplicated here;
    /// explicit admin creation trusts the admin.
    pub async fn create_book(&self, book: &CreateBook) -> AppResult<Book> {
        let created = self.repository.books.create(book).await?;
        tracing::info!(book_id = created.id, title = %created.title, "Book created");
        Ok(created)
    }

    /// Update an existing book
    pub async fn update_book(&self, id: i64, book: &UpdateBook) -> AppResult<Book> {
        self.repository.books.update(id, book).await
    }

    /// Delete a book with no off-shelf copies and no history
    pub async fn delete_book(&self, id: i64) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = id, "Book deleted");
        Ok(())
    }

    /// List categories
    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.repository.categories.list().await
    }

    /// Create a category
    pub async fn create_category(&self, category: &CreateCategory) -> AppResult<Category> {
        self.repository.categories.create(category).await
    }

    /// Delete a category
    pub async fn delete_category(&self, id: i64) -> AppResult<()> {
        self.repository.categories.delete(id).await
    }
}
