//! Book collection core for Shelf.
//!
//! Wire models shared between the server modules and the client, the
//! `BooksApi` contract against the remote data client, the pure view
//! derivation (filter / sort / status partition / favorite ordering), and the
//! `Library` view model that owns the authoritative in-memory collection for
//! the signed-in user.

pub mod api;
pub mod library;
pub mod model;
pub mod views;

pub use api::{ApiError, BooksApi};
pub use library::{BulkOutcome, Library};
pub use model::{AuthResponse, Book, BookDraft, BookPatch, Status, User};
pub use views::{LibraryStats, LibraryView, SortKey};
