//! Borrow management service
//!
//! Borrow creation and cancellation each reach the store as a single unit
//! that writes the borrow record and the book's copy count together.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

use super::catalog::CatalogService;
use crate::{
    error::{AppError, AppResult},
    models::{Borrow, BorrowSummary, CreateBorrow},
    repository::{Repository, Restoration, Withdrawal},
};

#[derive(Clone)]
pub struct LendingService {
    repository: Repository,
    catalog: CatalogService,
}

impl LendingService {
    pub fn new(repository: Repository, catalog: CatalogService) -> Self {
        Self { repository, catalog }
    }

    /// Borrow `quantity` copies of a book until `due_date`
    pub async fn borrow(&self, request: CreateBorrow) -> AppResult<Borrow> {
        self.borrow_at(request, Utc::now()).await
    }

    async fn borrow_at(&self, request: CreateBorrow, now: DateTime<Utc>) -> AppResult<Borrow> {
        request.validate()?;

        if request.due_date <= now {
            return Err(AppError::invalid("dueDate", "Due date must be in the future"));
        }

        let book = self.catalog.get(request.book).await?;
        if !book.available {
            return Err(AppError::rule("Book is not available for borrowing"));
        }
        if book.copies < request.quantity {
            return Err(AppError::rule("Insufficient copies available for borrowing"));
        }

        let borrow = Borrow::new(&request, now);
        match self.repository.borrows.insert_withdrawing(&borrow).await? {
            Withdrawal::Committed(book) => {
                tracing::info!(
                    "Book \"{}\" borrowed: {} copies. Remaining: {}",
                    book.title,
                    borrow.quantity,
                    book.copies
                );
                Ok(borrow)
            }
            Withdrawal::BookMissing => Err(AppError::NotFound("Book not found".to_string())),
            Withdrawal::Refused(book) => {
                tracing::warn!(
                    book_id = %book.id,
                    requested = borrow.quantity,
                    copies = book.copies,
                    "Borrow lost a race on copies"
                );
                Err(AppError::Consistency(format!(
                    "Book \"{}\" changed while borrowing: {} copies left",
                    book.title, book.copies
                )))
            }
        }
    }

    /// Cancel a borrow and put its copies back on the shelf
    pub async fn cancel(&self, borrow_id: Uuid) -> AppResult<Borrow> {
        let (borrow, restoration) = self
            .repository
            .borrows
            .delete_restoring(borrow_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Borrow record not found".to_string()))?;

        match restoration {
            Restoration::Restored(book) => tracing::info!(
                "Book \"{}\" borrowing cancelled: {} copies restored. Total: {}",
                book.title,
                borrow.quantity,
                book.copies
            ),
            Restoration::BookMissing => tracing::warn!(
                borrow_id = %borrow.id,
                book_id = %borrow.book,
                "Cancelled borrow references a deleted book, {} copies not restored",
                borrow.quantity
            ),
        }

        Ok(borrow)
    }

    /// Borrowed quantity per book
    pub async fn summary(&self) -> AppResult<Vec<BorrowSummary>> {
        self.repository.borrows.summary().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{Book, CreateBook, Genre, UpdateBook},
        repository::{memory::MemoryStore, BookStore, MockBookStore, MockBorrowStore},
    };
    use chrono::Duration;
    use std::sync::Arc;

    fn services() -> (CatalogService, LendingService) {
        let repository = Repository::in_memory();
        let catalog = CatalogService::new(repository.clone(), 10);
        let lending = LendingService::new(repository, catalog.clone());
        (catalog, lending)
    }

    async fn stock(catalog: &CatalogService, isbn: &str, copies: i32) -> Book {
        catalog
            .create(CreateBook {
                title: format!("Title {}", isbn),
                author: "Author".into(),
                genre: Genre::Fiction,
                isbn: isbn.into(),
                description: None,
                copies,
            })
            .await
            .unwrap()
    }

    fn request(book: &Book, quantity: i32) -> CreateBorrow {
        CreateBorrow {
            book: book.id,
            quantity,
            due_date: Utc::now() + Duration::days(14),
        }
    }

    #[tokio::test]
    async fn borrow_decrements_then_refuses_when_short() {
        let (catalog, lending) = services();
        let book = stock(&catalog, "1", 3).await;

        let borrow = lending.borrow(request(&book, 2)).await.unwrap();
        assert_eq!(borrow.quantity, 2);
        let after = catalog.get(book.id).await.unwrap();
        assert_eq!(after.copies, 1);
        assert!(after.available);

        let err = lending.borrow(request(&book, 2)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(catalog.get(book.id).await.unwrap().copies, 1);
    }

    #[tokio::test]
    async fn borrowing_last_copy_then_cancelling_round_trips() {
        let (catalog, lending) = services();
        let book = stock(&catalog, "1", 1).await;

        let borrow = lending.borrow(request(&book, 1)).await.unwrap();
        let emptied = catalog.get(book.id).await.unwrap();
        assert_eq!(emptied.copies, 0);
        assert!(!emptied.available);

        lending.cancel(borrow.id).await.unwrap();
        let restored = catalog.get(book.id).await.unwrap();
        assert_eq!(restored.copies, 1);
        assert!(restored.available);
    }

    #[tokio::test]
    async fn unavailable_book_is_refused_regardless_of_request() {
        let (catalog, lending) = services();
        let book = stock(&catalog, "1", 0).await;

        let err = lending.borrow(request(&book, 1)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: None, .. }));
    }

    #[tokio::test]
    async fn due_date_must_be_strictly_in_the_future() {
        let (catalog, lending) = services();
        let book = stock(&catalog, "1", 2).await;
        let now = Utc::now();

        for due_date in [now, now - Duration::days(1)] {
            let request = CreateBorrow {
                book: book.id,
                quantity: 1,
                due_date,
            };
            let err = lending.borrow_at(request, now).await.unwrap_err();
            assert!(matches!(err, AppError::Validation { field: Some("dueDate"), .. }));
        }
        assert_eq!(catalog.get(book.id).await.unwrap().copies, 2);
    }

    #[tokio::test]
    async fn zero_quantity_is_rejected_before_lookup() {
        let (_, lending) = services();
        let request = CreateBorrow {
            book: Uuid::new_v4(),
            quantity: 0,
            due_date: Utc::now() + Duration::days(1),
        };
        assert!(matches!(
            lending.borrow(request).await,
            Err(AppError::InvalidFields(_))
        ));
    }

    #[tokio::test]
    async fn borrowing_unknown_book_is_not_found() {
        let (_, lending) = services();
        let request = CreateBorrow {
            book: Uuid::new_v4(),
            quantity: 1,
            due_date: Utc::now() + Duration::days(1),
        };
        assert!(matches!(lending.borrow(request).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn cancelling_unknown_borrow_is_not_found() {
        let (_, lending) = services();
        assert!(matches!(
            lending.cancel(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn cancel_after_book_deletion_still_succeeds() {
        let (catalog, lending) = services();
        let book = stock(&catalog, "1", 2).await;
        let borrow = lending.borrow(request(&book, 1)).await.unwrap();
        catalog.delete(book.id).await.unwrap();

        let cancelled = lending.cancel(borrow.id).await.unwrap();
        assert_eq!(cancelled.id, borrow.id);
        assert!(lending.summary().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancel_restores_exact_quantity_after_restock() {
        let (catalog, lending) = services();
        let book = stock(&catalog, "1", 5).await;
        let borrow = lending.borrow(request(&book, 3)).await.unwrap();
        let patch = UpdateBook {
            copies: Some(10),
            ..Default::default()
        };
        catalog.update(book.id, patch).await.unwrap();

        lending.cancel(borrow.id).await.unwrap();
        assert_eq!(catalog.get(book.id).await.unwrap().copies, 13);
    }

    #[tokio::test]
    async fn summary_totals_active_borrows() {
        let (catalog, lending) = services();
        let first = stock(&catalog, "1", 5).await;
        let second = stock(&catalog, "2", 5).await;
        lending.borrow(request(&first, 2)).await.unwrap();
        lending.borrow(request(&first, 1)).await.unwrap();
        let cancelled = lending.borrow(request(&second, 4)).await.unwrap();
        lending.cancel(cancelled.id).await.unwrap();

        let summary = lending.summary().await.unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].book.title, "Title 1");
        assert_eq!(summary[0].total_quantity, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_borrows_of_last_copy_admit_one() {
        let (catalog, lending) = services();
        let book = stock(&catalog, "1", 1).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let lending = lending.clone();
                let request = request(&book, 1);
                tokio::spawn(async move { lending.borrow(request).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(catalog.get(book.id).await.unwrap().copies, 0);
    }

    /// Book store whose patch writes stall, so other writes land first
    struct StallingBooks {
        inner: MemoryStore,
        stall: std::time::Duration,
    }

    #[async_trait::async_trait]
    impl BookStore for StallingBooks {
        async fn find_available(&self, genre: Option<Genre>) -> AppResult<Vec<Book>> {
            self.inner.find_available(genre).await
        }

        async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
            self.inner.find_by_id(id).await
        }

        async fn isbn_taken(&self, isbn: &str, exclude: Option<Uuid>) -> AppResult<bool> {
            self.inner.isbn_taken(isbn, exclude).await
        }

        async fn insert(&self, book: &Book) -> AppResult<Book> {
            self.inner.insert(book).await
        }

        async fn update_fields(&self, id: Uuid, patch: &UpdateBook) -> AppResult<Option<Book>> {
            tokio::time::sleep(self.stall).await;
            self.inner.update_fields(id, patch).await
        }

        async fn refresh_availability(&self, id: Uuid) -> AppResult<Option<Book>> {
            tokio::time::sleep(self.stall).await;
            self.inner.refresh_availability(id).await
        }

        async fn delete_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
            self.inner.delete_by_id(id).await
        }

        async fn ping(&self) -> AppResult<()> {
            self.inner.ping().await
        }
    }

    #[tokio::test]
    async fn title_update_overlapping_a_borrow_keeps_the_decrement() {
        let store = MemoryStore::default();
        let books = StallingBooks {
            inner: store.clone(),
            stall: std::time::Duration::from_millis(50),
        };
        let repository = Repository::new(Arc::new(books), Arc::new(store));
        let catalog = CatalogService::new(repository.clone(), 10);
        let lending = LendingService::new(repository, catalog.clone());
        let book = stock(&catalog, "1", 5).await;

        let rename = UpdateBook {
            title: Some("Renamed".into()),
            ..Default::default()
        };
        let (updated, borrow) = tokio::join!(
            catalog.update(book.id, rename),
            lending.borrow(request(&book, 2)),
        );
        let borrow = borrow.unwrap();
        assert_eq!(updated.unwrap().title, "Renamed");

        let after = catalog.get(book.id).await.unwrap();
        assert_eq!(after.copies, 3);

        let refreshed = catalog.refresh_availability(book.id).await.unwrap();
        assert_eq!(refreshed.copies, 3);

        lending.cancel(borrow.id).await.unwrap();
        assert_eq!(catalog.get(book.id).await.unwrap().copies, 5);
    }

    #[tokio::test]
    async fn overflowing_cancel_fails_without_losing_the_borrow() {
        let store = MemoryStore::default();
        let repository = Repository::new(Arc::new(store.clone()), Arc::new(store.clone()));
        let catalog = CatalogService::new(repository.clone(), 10);
        let lending = LendingService::new(repository, catalog.clone());
        let book = stock(&catalog, "1", 3).await;
        let borrow = lending.borrow(request(&book, 1)).await.unwrap();

        // Bypasses request validation, which caps copies
        let patch = UpdateBook {
            copies: Some(i32::MAX),
            ..Default::default()
        };
        store.update_fields(book.id, &patch).await.unwrap();

        let err = lending.cancel(borrow.id).await.unwrap_err();
        assert!(matches!(err, AppError::Consistency(_)));
        assert_eq!(lending.summary().await.unwrap()[0].total_quantity, 1);
    }

    fn mocked(books: MockBookStore, borrows: MockBorrowStore) -> LendingService {
        let repository = Repository::new(Arc::new(books), Arc::new(borrows));
        let catalog = CatalogService::new(repository.clone(), 10);
        LendingService::new(repository, catalog)
    }

    fn stocked_book(copies: i32) -> Book {
        Book::new(
            CreateBook {
                title: "Dune".into(),
                author: "Frank Herbert".into(),
                genre: Genre::Fiction,
                isbn: "1".into(),
                description: None,
                copies,
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn lost_race_surfaces_as_consistency_error() {
        let book = stocked_book(1);
        let mut books = MockBookStore::new();
        let found = book.clone();
        books
            .expect_find_by_id()
            .returning(move |_| Ok(Some(found.clone())));

        let mut borrows = MockBorrowStore::new();
        let mut drained = book.clone();
        drained.copies = 0;
        drained.refresh_availability();
        borrows
            .expect_insert_withdrawing()
            .times(1)
            .returning(move |_| Ok(Withdrawal::Refused(drained.clone())));

        let err = mocked(books, borrows)
            .borrow(request(&book, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Consistency(_)));
    }

    #[tokio::test]
    async fn store_failure_during_cancel_is_surfaced() {
        let mut borrows = MockBorrowStore::new();
        borrows
            .expect_delete_restoring()
            .returning(|_| Err(AppError::Database(sqlx::Error::PoolTimedOut)));

        let err = mocked(MockBookStore::new(), borrows)
            .cancel(Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }
}
