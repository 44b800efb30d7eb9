//! Response envelope shared by every endpoint

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use super::{book::Book, borrow::{Borrow, BorrowSummary}};

/// Success envelope: `{ success: true, message, data }`
#[derive(Debug, Serialize, ToSchema)]
#[aliases(
    BookEnvelope = ApiResponse<Book>,
    BookListEnvelope = ApiResponse<Vec<Book>>,
    BorrowEnvelope = ApiResponse<Borrow>,
    BorrowSummaryEnvelope = ApiResponse<Vec<BorrowSummary>>
)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data,
        })
    }
}
