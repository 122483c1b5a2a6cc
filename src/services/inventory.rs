//! Inventory management service: copy availability and shelf state.
//!
//! All copy-status changes in the system are requested through this service
//! (or through a request/issue transaction that uses the same repository
//! primitives); nothing mutates `book_copies.status` anywhere else.

use crate::{
    error::{AppError, AppResult},
    models::copy::{BookCopy, CopyCounts, CopyStatus},
    repository::Repository,
};

#[derive(Clone)]
pub struct InventoryService {
    repository: Repository,
}

impl InventoryService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Get a copy by ID
    pub async fn get_copy(&self, copy_id: i64) -> AppResult<BookCopy> {
        self.repository.copies.get_by_id(copy_id).await
    }

    /// List all copies of a book
    pub async fn list_for_book(&self, book_id: i64) -> AppResult<Vec<BookCopy>> {
        if !self.repository.books.exists(book_id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }
        self.repository.copies.list_for_book(book_id).await
    }

    /// Per-status copy counts for a book
    pub async fn counts_for_book(&self, book_id: i64) -> AppResult<CopyCounts> {
        self.repository.copies.counts_for_book(book_id).await
    }

    /// Any one available copy of a book
    pub async fn find_available_copy(&self, book_id: i64) -> AppResult<Option<BookCopy>> {
        self.repository.copies.find_available_copy(book_id).await
    }

    /// Reserve a specific copy: available -> reserved
    pub async fn reserve(&self, copy_id: i64) -> AppResult<BookCopy> {
        self.repository.copies.reserve(copy_id).await
    }

    /// Issue a copy: reserved -> issued (or available -> issued for walk-ins)
    pub async fn issue(&self, copy_id: i64) -> AppResult<BookCopy> {
        self.repository.copies.issue(copy_id).await
    }

    /// Release a copy: reserved -> available, or issued -> available/damaged/lost
    pub async fn release(&self, copy_id: i64, target: CopyStatus) -> AppResult<BookCopy> {
        self.repository.copies.release(copy_id, target).await
    }

    /// Add copies of a book, all available
    pub async fn add_copies(&self, book_id: i64, count: i32) -> AppResult<Vec<BookCopy>> {
        if !self.repository.books.exists(book_id).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", book_id)));
        }
        self.repository.copies.add_copies(book_id, count).await
    }

    /// Delete a copy that is not reserved or issued
    pub async fn delete_copy(&self, copy_id: i64) -> AppResult<()> {
        self.repository.copies.delete(copy_id).await
    }
}
