//! In-process store. Each operation runs under one lock, so the
//! borrow/book pair is always written as a unit.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BookStore, BorrowStore, Restoration, Withdrawal};
use crate::{
    error::{AppError, AppResult},
    models::{
        borrow::BookBrief,
        Book, Borrow, BorrowSummary, Genre, UpdateBook,
    },
};

#[derive(Default)]
struct State {
    /// Insertion order doubles as creation order
    books: Vec<Book>,
    borrows: Vec<Borrow>,
}

impl State {
    fn book_mut(&mut self, id: Uuid) -> Option<&mut Book> {
        self.books.iter_mut().find(|b| b.id == id)
    }

    fn isbn_taken(&self, isbn: &str, exclude: Option<Uuid>) -> bool {
        self.books
            .iter()
            .any(|b| b.isbn == isbn && Some(b.id) != exclude)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn find_available(&self, genre: Option<Genre>) -> AppResult<Vec<Book>> {
        let state = self.state.lock().await;
        Ok(state
            .books
            .iter()
            .filter(|b| b.available && genre.map_or(true, |g| b.genre == g))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        let state = self.state.lock().await;
        Ok(state.books.iter().find(|b| b.id == id).cloned())
    }

    async fn isbn_taken(&self, isbn: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        Ok(self.state.lock().await.isbn_taken(isbn, exclude))
    }

    async fn insert(&self, book: &Book) -> AppResult<Book> {
        let mut state = self.state.lock().await;
        if state.isbn_taken(&book.isbn, None) {
            return Err(AppError::invalid("isbn", "ISBN must be unique"));
        }
        state.books.push(book.clone());
        Ok(book.clone())
    }

    async fn update_fields(&self, id: Uuid, patch: &UpdateBook) -> AppResult<Option<Book>> {
        let mut state = self.state.lock().await;
        if let Some(ref isbn) = patch.isbn {
            if state.isbn_taken(isbn, Some(id)) {
                return Err(AppError::invalid("isbn", "ISBN must be unique"));
            }
        }
        Ok(state.book_mut(id).map(|stored| {
            stored.apply(patch, Utc::now());
            stored.clone()
        }))
    }

    async fn refresh_availability(&self, id: Uuid) -> AppResult<Option<Book>> {
        let mut state = self.state.lock().await;
        Ok(state.book_mut(id).map(|stored| {
            stored.refresh_availability();
            stored.updated_at = Utc::now();
            stored.clone()
        }))
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        let mut state = self.state.lock().await;
        let position = state.books.iter().position(|b| b.id == id);
        Ok(position.map(|i| state.books.remove(i)))
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
impl BorrowStore for MemoryStore {
    async fn insert_withdrawing(&self, borrow: &Borrow) -> AppResult<Withdrawal> {
        let mut state = self.state.lock().await;
        let Some(book) = state.book_mut(borrow.book) else {
            return Ok(Withdrawal::BookMissing);
        };
        if !book.available || book.copies < borrow.quantity {
            return Ok(Withdrawal::Refused(book.clone()));
        }

        book.copies -= borrow.quantity;
        book.refresh_availability();
        book.updated_at = Utc::now();
        let book = book.clone();

        state.borrows.push(borrow.clone());
        Ok(Withdrawal::Committed(book))
    }

    async fn delete_restoring(&self, id: Uuid) -> AppResult<Option<(Borrow, Restoration)>> {
        let mut state = self.state.lock().await;
        let Some(position) = state.borrows.iter().position(|b| b.id == id) else {
            return Ok(None);
        };
        let (book_id, quantity) = (state.borrows[position].book, state.borrows[position].quantity);

        // Checked before anything is removed so a refused restore keeps the borrow
        let restored_copies = match state.book_mut(book_id) {
            Some(book) => Some(book.copies.checked_add(quantity).ok_or_else(|| {
                AppError::Consistency(format!(
                    "Restoring {} copies to book \"{}\" would overflow its count",
                    quantity, book.title
                ))
            })?),
            None => None,
        };

        let borrow = state.borrows.remove(position);
        let restoration = match (state.book_mut(book_id), restored_copies) {
            (Some(book), Some(copies)) => {
                book.copies = copies;
                book.refresh_availability();
                book.updated_at = Utc::now();
                Restoration::Restored(book.clone())
            }
            _ => Restoration::BookMissing,
        };
        Ok(Some((borrow, restoration)))
    }

    async fn summary(&self) -> AppResult<Vec<BorrowSummary>> {
        let state = self.state.lock().await;

        let mut totals: HashMap<Uuid, i64> = HashMap::new();
        for borrow in &state.borrows {
            *totals.entry(borrow.book).or_default() += i64::from(borrow.quantity);
        }

        let mut summary: Vec<BorrowSummary> = state
            .books
            .iter()
            .filter_map(|book| {
                totals.get(&book.id).map(|total| BorrowSummary {
                    book: BookBrief {
                        title: book.title.clone(),
                        isbn: book.isbn.clone(),
                    },
                    total_quantity: *total,
                })
            })
            .collect();
        summary.sort_by(|a, b| a.book.title.cmp(&b.book.title));
        Ok(summary)
    }
}
