//! Data models for Shelfkeeper

pub mod book;
pub mod borrow;
pub mod enums;
pub mod envelope;

// Re-export commonly used types
pub use book::{Book, BookListQuery, CreateBook, UpdateBook};
pub use borrow::{Borrow, BorrowSummary, CreateBorrow};
pub use enums::Genre;
pub use envelope::ApiResponse;
