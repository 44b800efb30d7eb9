//! Borrow (loan) model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Active borrow record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Borrow {
    pub id: Uuid,
    /// Id of the borrowed book (non-owning reference)
    #[sqlx(rename = "book_id")]
    pub book: Uuid,
    pub quantity: i32,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Borrow {
    pub fn new(data: &CreateBorrow, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            book: data.book,
            quantity: data.quantity,
            due_date: data.due_date,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Create borrow request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBorrow {
    pub book: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    pub due_date: DateTime<Utc>,
}

/// Title and ISBN of a borrowed book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BookBrief {
    pub title: String,
    pub isbn: String,
}

/// Total quantity currently borrowed for one book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowSummary {
    pub book: BookBrief,
    pub total_quantity: i64,
}

/// Flat row produced by the summary query
#[derive(Debug, Clone, FromRow)]
pub struct BorrowSummaryRow {
    pub title: String,
    pub isbn: String,
    pub total_quantity: i64,
}

impl From<BorrowSummaryRow> for BorrowSummary {
    fn from(row: BorrowSummaryRow) -> Self {
        Self {
            book: BookBrief {
                title: row.title,
                isbn: row.isbn,
            },
            total_quantity: row.total_quantity,
        }
    }
}
