//! Catalog management service

use std::{cmp::Ordering, str::FromStr};

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{Book, BookListQuery, CreateBook, Genre, UpdateBook},
    repository::Repository,
};

/// Book field a list can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Author,
    Genre,
    Isbn,
    Description,
    Copies,
    Available,
    CreatedAt,
    UpdatedAt,
}

impl FromStr for SortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SortField::Title),
            "author" => Ok(SortField::Author),
            "genre" => Ok(SortField::Genre),
            "isbn" => Ok(SortField::Isbn),
            "description" => Ok(SortField::Description),
            "copies" => Ok(SortField::Copies),
            "available" => Ok(SortField::Available),
            "createdAt" => Ok(SortField::CreatedAt),
            "updatedAt" => Ok(SortField::UpdatedAt),
            other => Err(AppError::invalid(
                "sortBy",
                format!("Cannot sort books by `{}`", other),
            )),
        }
    }
}

impl SortField {
    fn compare(self, a: &Book, b: &Book) -> Ordering {
        match self {
            SortField::Title => a.title.cmp(&b.title),
            SortField::Author => a.author.cmp(&b.author),
            SortField::Genre => a.genre.as_str().cmp(b.genre.as_str()),
            SortField::Isbn => a.isbn.cmp(&b.isbn),
            SortField::Description => a.description.cmp(&b.description),
            SortField::Copies => a.copies.cmp(&b.copies),
            SortField::Available => a.available.cmp(&b.available),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        }
    }
}

/// Sort order and size of a book list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookOrder {
    pub field: SortField,
    pub descending: bool,
    pub limit: usize,
}

impl BookOrder {
    /// `sort=asc` (the default) sorts ascending, any other value descending
    pub fn from_query(query: &BookListQuery, default_limit: usize) -> AppResult<Self> {
        let field = match query.sort_by.as_deref() {
            Some(name) => name.parse()?,
            None => SortField::CreatedAt,
        };
        Ok(Self {
            field,
            descending: query.sort.as_deref().map_or(false, |s| s != "asc"),
            limit: query.limit.unwrap_or(default_limit),
        })
    }

    pub fn apply(&self, mut books: Vec<Book>) -> Vec<Book> {
        books.sort_by(|a, b| {
            let ordering = self.field.compare(a, b);
            if self.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        books.truncate(self.limit);
        books
    }
}

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    default_limit: usize,
}

impl CatalogService {
    pub fn new(repository: Repository, default_limit: usize) -> Self {
        Self {
            repository,
            default_limit,
        }
    }

    /// Create a book; the ISBN must not be used by any other book
    pub async fn create(&self, data: CreateBook) -> AppResult<Book> {
        data.validate()?;

        if self.repository.books.isbn_taken(&data.isbn, None).await? {
            return Err(AppError::invalid("isbn", "ISBN must be unique"));
        }

        let book = self
            .repository
            .books
            .insert(&Book::new(data, Utc::now()))
            .await?;
        tracing::info!("Book \"{}\" saved with {} copies available", book.title, book.copies);
        Ok(book)
    }

    /// Get book by ID
    pub async fn get(&self, id: Uuid) -> AppResult<Book> {
        self.repository
            .books
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    /// Apply a partial update. Only the fields in `patch` are written, so a
    /// borrow committed meanwhile keeps its decrement.
    pub async fn update(&self, id: Uuid, patch: UpdateBook) -> AppResult<Book> {
        patch.validate()?;

        if let Some(ref isbn) = patch.isbn {
            if self.repository.books.isbn_taken(isbn, Some(id)).await? {
                return Err(AppError::invalid("isbn", "ISBN must be unique"));
            }
        }

        let saved = self
            .repository
            .books
            .update_fields(id, &patch)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;
        tracing::info!("Book \"{}\" saved with {} copies available", saved.title, saved.copies);
        Ok(saved)
    }

    /// Recompute `available` from the stored copies. Idempotent.
    pub async fn refresh_availability(&self, id: Uuid) -> AppResult<Book> {
        self.repository
            .books
            .refresh_availability(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    /// Delete a book. Borrows that reference it are left in place.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let book = self
            .repository
            .books
            .delete_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;
        tracing::info!("Book \"{}\" deleted", book.title);
        Ok(())
    }

    /// Available books of one genre; unavailable ones are left out
    pub async fn list_by_genre(&self, genre: Genre) -> AppResult<Vec<Book>> {
        self.repository.books.find_available(Some(genre)).await
    }

    /// Same as [`Self::list_by_genre`] for a raw genre name. Unknown names match nothing.
    pub async fn list_by_genre_name(&self, name: &str) -> AppResult<Vec<Book>> {
        match name.parse::<Genre>() {
            Ok(genre) => self.list_by_genre(genre).await,
            Err(e) => {
                tracing::debug!("{}", e);
                Ok(Vec::new())
            }
        }
    }

    pub async fn list_available(&self) -> AppResult<Vec<Book>> {
        self.repository.books.find_available(None).await
    }

    /// Genre-filtered or available books, sorted then truncated
    pub async fn list(&self, query: &BookListQuery) -> AppResult<Vec<Book>> {
        let order = BookOrder::from_query(query, self.default_limit)?;

        let books = match query.filter.as_deref().filter(|f| !f.is_empty()) {
            Some(genre) => self.list_by_genre_name(genre).await?,
            None => self.list_available().await?,
        };

        let books = order.apply(books);
        tracing::info!("Retrieved {} books", books.len());
        Ok(books)
    }

    /// Check the store is reachable
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.books.ping().await
    }
}
