//! PostgreSQL store

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use super::{BookStore, BorrowStore, Restoration, Withdrawal};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::BookRow,
        borrow::BorrowSummaryRow,
        Book, Borrow, BorrowSummary, Genre, UpdateBook,
    },
};

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn into_book(row: BookRow) -> AppResult<Book> {
    Book::try_from(row).map_err(|e| AppError::Internal(format!("Corrupt book row: {}", e)))
}

/// The unique index on `books.isbn` backs the service-level check under races
fn isbn_conflict(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::invalid("isbn", "ISBN must be unique")
        }
        _ => AppError::Database(e),
    }
}

#[async_trait]
impl BookStore for PgStore {
    async fn find_available(&self, genre: Option<Genre>) -> AppResult<Vec<Book>> {
        let rows = sqlx::query_as::<_, BookRow>(
            r#"
            SELECT * FROM books
            WHERE available = TRUE
              AND ($1::text IS NULL OR genre = $1)
            ORDER BY created_at
            "#,
        )
        .bind(genre.map(|g| g.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(into_book).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(into_book)
            .transpose()
    }

    async fn isbn_taken(&self, isbn: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(isbn)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn insert(&self, book: &Book) -> AppResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(
            r#"
            INSERT INTO books (id, title, author, genre, isbn, description, copies, available, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.genre.as_str())
        .bind(&book.isbn)
        .bind(&book.description)
        .bind(book.copies)
        .bind(book.available)
        .bind(book.created_at)
        .bind(book.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(isbn_conflict)?;

        into_book(row)
    }

    async fn update_fields(&self, id: Uuid, patch: &UpdateBook) -> AppResult<Option<Book>> {
        // Absent fields keep the stored value; copies is only written when the patch carries it
        sqlx::query_as::<_, BookRow>(
            r#"
            UPDATE books
            SET title = COALESCE($2, title),
                author = COALESCE($3, author),
                genre = COALESCE($4, genre),
                isbn = COALESCE($5, isbn),
                description = CASE WHEN $6 THEN $7 ELSE description END,
                copies = COALESCE($8, copies),
                available = COALESCE($8, copies) > 0,
                updated_at = $9
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.title)
        .bind(&patch.author)
        .bind(patch.genre.map(|g| g.as_str()))
        .bind(&patch.isbn)
        .bind(patch.description.is_some())
        .bind(patch.description.clone().flatten())
        .bind(patch.copies)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await
        .map_err(isbn_conflict)?
        .map(into_book)
        .transpose()
    }

    async fn refresh_availability(&self, id: Uuid) -> AppResult<Option<Book>> {
        sqlx::query_as::<_, BookRow>(
            "UPDATE books SET available = copies > 0, updated_at = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?
        .map(into_book)
        .transpose()
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        sqlx::query_as::<_, BookRow>("DELETE FROM books WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(into_book)
            .transpose()
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl BorrowStore for PgStore {
    async fn insert_withdrawing(&self, borrow: &Borrow) -> AppResult<Withdrawal> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrement: the row lock serializes concurrent borrows of one book
        let withdrawn = sqlx::query_as::<_, BookRow>(
            r#"
            UPDATE books
            SET copies = copies - $2, available = (copies - $2) > 0, updated_at = $3
            WHERE id = $1 AND available = TRUE AND copies >= $2
            RETURNING *
            "#,
        )
        .bind(borrow.book)
        .bind(borrow.quantity)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = withdrawn else {
            let current = sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE id = $1")
                .bind(borrow.book)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;
            return match current {
                Some(row) => Ok(Withdrawal::Refused(into_book(row)?)),
                None => Ok(Withdrawal::BookMissing),
            };
        };

        sqlx::query(
            r#"
            INSERT INTO borrows (id, book_id, quantity, due_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(borrow.id)
        .bind(borrow.book)
        .bind(borrow.quantity)
        .bind(borrow.due_date)
        .bind(borrow.created_at)
        .bind(borrow.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Withdrawal::Committed(into_book(row)?))
    }

    async fn delete_restoring(&self, id: Uuid) -> AppResult<Option<(Borrow, Restoration)>> {
        let mut tx = self.pool.begin().await?;

        let Some(borrow) = sqlx::query_as::<_, Borrow>("DELETE FROM borrows WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            tx.rollback().await?;
            return Ok(None);
        };

        let restored = sqlx::query_as::<_, BookRow>(
            r#"
            UPDATE books
            SET copies = copies + $2, available = (copies + $2) > 0, updated_at = $3
            WHERE id = $1 AND copies <= 2147483647 - $2
            RETURNING *
            "#,
        )
        .bind(borrow.book)
        .bind(borrow.quantity)
        .bind(Utc::now())
        .fetch_optional(&mut *tx)
        .await?;

        if restored.is_none() {
            let current = sqlx::query_as::<_, BookRow>("SELECT * FROM books WHERE id = $1")
                .bind(borrow.book)
                .fetch_optional(&mut *tx)
                .await?;
            if let Some(row) = current {
                tx.rollback().await?;
                return Err(AppError::Consistency(format!(
                    "Restoring {} copies to book \"{}\" would overflow its count",
                    borrow.quantity, row.title
                )));
            }
        }

        tx.commit().await?;

        let restoration = match restored {
            Some(row) => Restoration::Restored(into_book(row)?),
            None => Restoration::BookMissing,
        };
        Ok(Some((borrow, restoration)))
    }

    async fn summary(&self) -> AppResult<Vec<BorrowSummary>> {
        let rows = sqlx::query_as::<_, BorrowSummaryRow>(
            r#"
            SELECT b.title, b.isbn, SUM(br.quantity)::bigint AS total_quantity
            FROM borrows br
            JOIN books b ON b.id = br.book_id
            GROUP BY b.id, b.title, b.isbn
            ORDER BY b.title
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(BorrowSummary::from).collect())
    }
}
