//! Book (catalog entry) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use super::enums::{Genre, UnknownGenre};

/// Upper bound on stocked copies; keeps restorations clear of `i32` overflow
pub const MAX_COPIES: i32 = 1_000_000;

/// Book record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genre: Genre,
    /// Unique across the catalog
    pub isbn: String,
    pub description: Option<String>,
    /// Copies currently on the shelf (not on loan)
    pub copies: i32,
    /// Always `copies > 0` after a successful write
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Build a new record from a validated create request
    pub fn new(data: CreateBook, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: data.title,
            author: data.author,
            genre: data.genre,
            isbn: data.isbn,
            description: data.description,
            copies: data.copies,
            available: data.copies > 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn refresh_availability(&mut self) {
        self.available = self.copies > 0;
    }

    /// Apply the fields present in `patch`, then recompute availability
    pub fn apply(&mut self, patch: &UpdateBook, now: DateTime<Utc>) {
        if let Some(ref title) = patch.title {
            self.title = title.clone();
        }
        if let Some(ref author) = patch.author {
            self.author = author.clone();
        }
        if let Some(genre) = patch.genre {
            self.genre = genre;
        }
        if let Some(ref isbn) = patch.isbn {
            self.isbn = isbn.clone();
        }
        if let Some(ref description) = patch.description {
            self.description = description.clone();
        }
        if let Some(copies) = patch.copies {
            self.copies = copies;
        }
        self.refresh_availability();
        self.updated_at = now;
    }
}

/// Database row for `books`; genre is stored as TEXT
#[derive(Debug, Clone, FromRow)]
pub struct BookRow {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub isbn: String,
    pub description: Option<String>,
    pub copies: i32,
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookRow> for Book {
    type Error = UnknownGenre;

    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Book {
            id: row.id,
            title: row.title,
            author: row.author,
            genre: row.genre.parse()?,
            isbn: row.isbn,
            description: row.description,
            copies: row.copies,
            available: row.available,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,
    pub genre: Genre,
    #[validate(length(min = 1, message = "ISBN is required"))]
    pub isbn: String,
    pub description: Option<String>,
    #[validate(range(min = 0, max = 1_000_000, message = "Copies must be between 0 and 1000000"))]
    pub copies: i32,
}

/// Update book request; absent fields are left untouched
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, message = "Author cannot be empty"))]
    pub author: Option<String>,
    pub genre: Option<Genre>,
    #[validate(length(min = 1, message = "ISBN cannot be empty"))]
    pub isbn: Option<String>,
    /// `null` clears the description, an absent key keeps it
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, nullable)]
    pub description: Option<Option<String>>,
    #[validate(range(min = 0, max = 1_000_000, message = "Copies must be between 0 and 1000000"))]
    pub copies: Option<i32>,
}

/// Query parameters for the book list
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookListQuery {
    /// Genre filter; only available books are returned either way
    pub filter: Option<String>,
    /// Field to sort by (default `createdAt`)
    pub sort_by: Option<String>,
    /// `asc` (default) or `desc`
    pub sort: Option<String>,
    /// Maximum number of books returned
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(copies: i32) -> CreateBook {
        CreateBook {
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            genre: Genre::Fiction,
            isbn: "9780441013593".into(),
            description: None,
            copies,
        }
    }

    #[test]
    fn new_book_derives_availability() {
        let now = Utc::now();
        assert!(Book::new(create(2), now).available);
        assert!(!Book::new(create(0), now).available);
    }

    #[test]
    fn apply_only_touches_present_fields() {
        let now = Utc::now();
        let mut book = Book::new(create(2), now);
        book.apply(
            &UpdateBook {
                copies: Some(0),
                ..Default::default()
            },
            now,
        );
        assert_eq!(book.title, "Dune");
        assert_eq!(book.copies, 0);
        assert!(!book.available);
    }

    #[test]
    fn negative_copies_fail_validation() {
        let errors = create(-1).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("copies"));
    }

    #[test]
    fn copies_above_cap_fail_validation() {
        let errors = create(i32::MAX).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("copies"));

        let patch = UpdateBook {
            copies: Some(MAX_COPIES + 1),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
        assert!(create(MAX_COPIES).validate().is_ok());
    }

    #[test]
    fn null_description_clears_and_absent_keeps() {
        let now = Utc::now();
        let mut book = Book::new(create(1), now);
        book.description = Some("First edition".into());

        let absent: UpdateBook = serde_json::from_str(r#"{"title":"Dune Messiah"}"#).unwrap();
        book.apply(&absent, now);
        assert_eq!(book.description.as_deref(), Some("First edition"));

        let cleared: UpdateBook = serde_json::from_str(r#"{"description":null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));
        book.apply(&cleared, now);
        assert_eq!(book.description, None);
    }

    #[test]
    fn empty_title_fails_validation() {
        let mut data = create(1);
        data.title.clear();
        let errors = data.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
    }

    #[test]
    fn row_with_unknown_genre_is_rejected() {
        let now = Utc::now();
        let row = BookRow {
            id: Uuid::new_v4(),
            title: "t".into(),
            author: "a".into(),
            genre: "POETRY".into(),
            isbn: "i".into(),
            description: None,
            copies: 1,
            available: true,
            created_at: now,
            updated_at: now,
        };
        assert!(Book::try_from(row).is_err());
    }
}
