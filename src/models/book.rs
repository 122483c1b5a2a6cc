//! Book (title-level catalog entry) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Accepted publication year range: movable type to the near future
/// (forthcoming titles are allowed).
pub const MIN_PUBLICATION_YEAR: i32 = 1400;
pub const MAX_PUBLICATION_YEAR: i32 = 2100;

/// Book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub published_year: Option<i32>,
    pub pages: Option<i32>,
    pub cover_url: Option<String>,
    pub category_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Book with copy counts for listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookShort {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub published_year: Option<i32>,
    pub category_id: Option<i64>,
    #[sqlx(default)]
    #[serde(default)]
    pub nb_copies: Option<i64>,
    #[sqlx(default)]
    #[serde(default)]
    pub nb_available: Option<i64>,
}

/// Create book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(length(min = 1, max = 300))]
    pub author: String,
    #[validate(range(min = 1400, max = 2100))]
    pub published_year: Option<i32>,
    #[validate(range(min = 1, max = 50000))]
    pub pages: Option<i32>,
    #[validate(url)]
    pub cover_url: Option<String>,
    pub category_id: Option<i64>,
}

/// Update book request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 300))]
    pub author: Option<String>,
    #[validate(range(min = 1400, max = 2100))]
    pub published_year: Option<i32>,
    #[validate(range(min = 1, max = 50000))]
    pub pages: Option<i32>,
    #[validate(url)]
    pub cover_url: Option<String>,
    pub category_id: Option<i64>,
}

/// Book search query
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub category_id: Option<i64>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(title: &str, year: Option<i32>) -> CreateBook {
        CreateBook {
            title: title.to_string(),
            author: "A. Writer".to_string(),
            published_year: year,
            pages: Some(200),
            cover_url: None,
            category_id: None,
        }
    }

    #[test]
    fn publication_year_bounds() {
        assert!(book("Incunable", Some(1399)).validate().is_err());
        assert!(book("Incunable", Some(MIN_PUBLICATION_YEAR)).validate().is_ok());
        assert!(book("Forthcoming", Some(MAX_PUBLICATION_YEAR)).validate().is_ok());
        assert!(book("Far Future", Some(2101)).validate().is_err());
        assert!(book("Undated", None).validate().is_ok());
    }

    #[test]
    fn create_book_rejects_empty_title() {
        assert!(book("", Some(1999)).validate().is_err());
    }
}
