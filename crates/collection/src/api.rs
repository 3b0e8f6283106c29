use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Book, BookDraft, BookPatch};

/// Error taxonomy surfaced by the remote data client.
///
/// Every view-model operation catches these at its boundary; nothing in this
/// crate panics on a failed call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Client-side pre-flight rejection or a server 400.
    #[error("validation failed: {0}")]
    Validation(String),

    /// 401; the session token is missing, expired, or invalid.
    #[error("unauthorized: {0}")]
    Auth(String),

    /// 404; the record does not exist or is owned by another user.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network failure before any response was obtained.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Any other non-2xx response.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
}

/// Remote data client contract for the per-user book collection.
///
/// Implemented by the reqwest client in `shelf-client`; the `Library` view
/// model only ever talks through this trait, which is what the tests mock.
#[async_trait]
pub trait BooksApi: Send + Sync {
    /// Fetch the full current-user collection.
    async fn list_books(&self) -> Result<Vec<Book>, ApiError>;

    /// Create a book; the server assigns `id` and timestamps.
    async fn create_book(&self, draft: &BookDraft) -> Result<Book, ApiError>;

    /// Patch a book; returns the server's post-merge record.
    async fn update_book(&self, id: &str, patch: &BookPatch) -> Result<Book, ApiError>;

    /// Delete a book owned by the current user.
    async fn delete_book(&self, id: &str) -> Result<(), ApiError>;
}
