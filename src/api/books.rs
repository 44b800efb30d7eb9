//! Book catalog endpoints

use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

use super::extract::{ValidatedJson, ValidatedPath, ValidatedQuery};
use crate::{
    error::AppResult,
    models::{
        envelope::{BookEnvelope, BookListEnvelope},
        ApiResponse, Book, BookListQuery, CreateBook, UpdateBook,
    },
    AppState,
};

/// Create a book
#[utoipa::path(
    post,
    path = "/books",
    tag = "books",
    request_body = CreateBook,
    responses(
        (status = 201, description = "Book created", body = BookEnvelope),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    ValidatedJson(data): ValidatedJson<CreateBook>,
) -> AppResult<(StatusCode, Json<ApiResponse<Book>>)> {
    let book = state.services.catalog.create(data).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Book created successfully", book),
    ))
}

/// List available books, optionally filtered by genre
#[utoipa::path(
    get,
    path = "/books",
    tag = "books",
    params(BookListQuery),
    responses(
        (status = 200, description = "Books", body = BookListEnvelope),
        (status = 400, description = "Unknown sort field", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_books(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<BookListQuery>,
) -> AppResult<Json<ApiResponse<Vec<Book>>>> {
    let books = state.services.catalog.list(&query).await?;
    Ok(ApiResponse::ok("Books retrieved successfully", books))
}

/// List available books of one genre
#[utoipa::path(
    get,
    path = "/books/genre/{genre}",
    tag = "books",
    params(("genre" = String, Path, description = "Genre, e.g. FANTASY")),
    responses(
        (status = 200, description = "Available books of the genre", body = BookListEnvelope)
    )
)]
pub async fn books_by_genre(
    State(state): State<AppState>,
    ValidatedPath(genre): ValidatedPath<String>,
) -> AppResult<Json<ApiResponse<Vec<Book>>>> {
    let books = state.services.catalog.list_by_genre_name(&genre).await?;
    Ok(ApiResponse::ok(
        format!("Books in {} genre retrieved successfully", genre),
        books,
    ))
}

/// Get a book by ID
#[utoipa::path(
    get,
    path = "/books/{bookId}",
    tag = "books",
    params(("bookId" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book details", body = BookEnvelope),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let book = state.services.catalog.get(id).await?;
    Ok(ApiResponse::ok("Book retrieved successfully", book))
}

/// Update a book
#[utoipa::path(
    put,
    path = "/books/{bookId}",
    tag = "books",
    params(("bookId" = Uuid, Path, description = "Book ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "Book updated", body = BookEnvelope),
        (status = 400, description = "Validation failed", body = crate::error::ErrorResponse),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
    ValidatedJson(patch): ValidatedJson<UpdateBook>,
) -> AppResult<Json<ApiResponse<Book>>> {
    let copies_changed = patch.copies.is_some();
    let mut book = state.services.catalog.update(id, patch).await?;
    if copies_changed {
        book = state.services.catalog.refresh_availability(id).await?;
    }
    Ok(ApiResponse::ok("Book updated successfully", book))
}

/// Delete a book
#[utoipa::path(
    delete,
    path = "/books/{bookId}",
    tag = "books",
    params(("bookId" = Uuid, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted"),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    ValidatedPath(id): ValidatedPath<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.services.catalog.delete(id).await?;
    Ok(ApiResponse::ok("Book deleted successfully", ()))
}
