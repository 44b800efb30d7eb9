//! API handlers for Shelfkeeper REST endpoints

pub mod books;
pub mod borrows;
pub mod extract;
pub mod health;
pub mod openapi;

use axum::{
    routing::{delete, get},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route("/books/genre/:genre", get(books::books_by_genre))
        .route(
            "/books/:bookId",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        // Borrows
        .route(
            "/borrow",
            get(borrows::borrowed_summary).post(borrows::borrow_book),
        )
        .route("/borrow/:borrowId", delete(borrows::cancel_borrow))
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
