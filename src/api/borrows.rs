//! Borrow endpoints

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use super::extract::{ValidatedJson, ValidatedPath};
use crate::{
    error::{AppError, AppResult},
    models::{
        envelope::{BorrowEnvelope, BorrowSummaryEnvelope},
        ApiResponse, Borrow, BorrowSummary, CreateBorrow,
    },
    AppState,
};

/// Borrow copies of a book
#[utoipa::path(
    post,
    path = "/borrow",
    tag = "borrow",
    request_body = CreateBorrow,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowEnvelope),
        (status = 400, description = "Invalid quantity or due date, unknown book, or not enough copies", body = crate::error::ErrorResponse),
        (status = 409, description = "Copies changed while borrowing", body = crate::error::ErrorResponse)
    )
)]
pub async fn borrow_book(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateBorrow>,
) -> AppResult<(StatusCode, Json<ApiResponse<Borrow>>)> {
    // A missing book is a rejected borrow request, not a missing resource
    let borrow = state
        .services
        .lending
        .borrow(request)
        .await
        .map_err(|e| match e {
            AppError::NotFound(msg) => AppError::BadRequest(msg),
            other => other,
        })?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Book borrowed successfully", borrow),
    ))
}

/// Borrowed quantity per book
#[utoipa::path(
    get,
    path = "/borrow",
    tag = "borrow",
    responses(
        (status = 200, description = "Borrowed books summary", body = BorrowSummaryEnvelope)
    )
)]
pub async fn borrowed_summary(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<BorrowSummary>>>> {
    let summary = state.services.lending.summary().await?;
    Ok(ApiResponse::ok(
        "Borrowed books summary retrieved successfully",
        summary,
    ))
}

/// Cancel a borrow, restoring its copies
#[utoipa::path(
    delete,
    path = "/borrow/{borrowId}",
    tag = "borrow",
    params(("borrowId" = Uuid, Path, description = "Borrow ID")),
    responses(
        (status = 200, description = "Borrow cancelled"),
        (status = 404, description = "Borrow record not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel_borrow(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.services.lending.cancel(id).await?;
    Ok(ApiResponse::ok("Borrow cancelled successfully", ()))
}
