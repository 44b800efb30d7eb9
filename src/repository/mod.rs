//! Repository layer: store contracts and their backends

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Book, Borrow, BorrowSummary, Genre, UpdateBook},
};

/// Result of inserting a borrow together with the copies withdrawal
#[derive(Debug, Clone, PartialEq)]
pub enum Withdrawal {
    /// Borrow stored; carries the book after the decrement
    Committed(Book),
    BookMissing,
    /// The book was unavailable or short of copies when the write ran; nothing stored
    Refused(Book),
}

/// Result of the copies restoration that accompanies a cancelled borrow
#[derive(Debug, Clone, PartialEq)]
pub enum Restoration {
    Restored(Book),
    /// The referenced book was deleted; nothing to restore
    BookMissing,
}

/// Book persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Available books, optionally restricted to one genre, in creation order
    async fn find_available(&self, genre: Option<Genre>) -> AppResult<Vec<Book>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>>;

    /// Whether a book other than `exclude` already uses `isbn`
    async fn isbn_taken(&self, isbn: &str, exclude: Option<Uuid>) -> AppResult<bool>;

    async fn insert(&self, book: &Book) -> AppResult<Book>;

    /// Write only the fields present in `patch` and recompute availability
    /// in the same statement. `None` when the book does not exist.
    async fn update_fields(&self, id: Uuid, patch: &UpdateBook) -> AppResult<Option<Book>>;

    /// Recompute `available` from the stored copies
    async fn refresh_availability(&self, id: Uuid) -> AppResult<Option<Book>>;

    async fn delete_by_id(&self, id: Uuid) -> AppResult<Option<Book>>;

    /// Cheap round trip used by the readiness probe
    async fn ping(&self) -> AppResult<()>;
}

/// Borrow persistence. Every write here touches the referenced book in the same unit.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BorrowStore: Send + Sync {
    /// Store `borrow` and withdraw its quantity from the book, only if the book
    /// is available and holds at least that many copies at write time.
    async fn insert_withdrawing(&self, borrow: &Borrow) -> AppResult<Withdrawal>;

    /// Delete a borrow and give its quantity back to the book if it still exists.
    /// `None` when no such borrow exists. A restore that would overflow the
    /// book's count fails and leaves the borrow in place.
    async fn delete_restoring(&self, id: Uuid) -> AppResult<Option<(Borrow, Restoration)>>;

    /// Borrowed quantity per book, skipping borrows whose book was deleted
    async fn summary(&self) -> AppResult<Vec<BorrowSummary>>;
}

/// Main repository struct holding the store handles
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
    pub borrows: Arc<dyn BorrowStore>,
}

impl Repository {
    pub fn new(books: Arc<dyn BookStore>, borrows: Arc<dyn BorrowStore>) -> Self {
        Self { books, borrows }
    }

    /// Repository backed by PostgreSQL
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        let store = Arc::new(postgres::PgStore::new(pool));
        Self::new(store.clone(), store)
    }

    /// Repository backed by process memory
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::default());
        Self::new(store.clone(), store)
    }
}
