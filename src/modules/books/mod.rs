pub mod models;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{
    extract::{Path, State},
    Json, Router,
};
use serde_json::{json, Value};
use shelf_collection::{Book, BookDraft, BookPatch};
use shelf_http::error::AppError;
use shelf_kernel::{InitCtx, Module};

use crate::modules::auth::AuthUser;
use crate::state::AppState;
use crate::utils::store_error;
use models::{normalize_patch, to_wire, validate_fields, BookDoc};

/// Per-user book CRUD. Every route requires a valid session and only ever
/// sees documents owned by that session's user.
pub struct BooksModule {
    state: AppState,
}

impl BooksModule {
    pub const fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", get(list_books).post(create_book))
            .route("/{id}", put(update_book).delete(delete_book))
            .with_state(self.state.clone())
    }

    fn collections(&self) -> Vec<&'static str> {
        vec!["books"]
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List the current user's books, newest first",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Books owned by the current user",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "responses": {
                            "201": {
                                "description": "Created book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "400": {
                                "description": "Validation error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/{id}": {
                    "put": {
                        "summary": "Update fields of an owned book",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "Updated book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "404": { "description": "Book not found" }
                        }
                    },
                    "delete": {
                        "summary": "Delete an owned book",
                        "tags": ["Books"],
                        "responses": {
                            "200": { "description": "Deletion confirmation message" },
                            "404": { "description": "Book not found" }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "author": { "type": "string" },
                            "status": {
                                "type": "string",
                                "enum": ["not-read", "reading", "finished"]
                            },
                            "publicationYear": { "type": "integer" },
                            "rating": { "type": "integer", "minimum": 1, "maximum": 5 },
                            "isFavorite": { "type": "boolean" },
                            "createdAt": { "type": "string", "format": "date-time" },
                            "updatedAt": { "type": "string", "format": "date-time" }
                        },
                        "required": ["id", "title", "author", "status", "isFavorite"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

async fn list_books(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Book>>, AppError> {
    let books = state.store.collection("books").map_err(store_error)?;
    let mut docs = books
        .find(|body| body.get("userId").and_then(Value::as_str) == Some(user.id.as_str()))
        .map_err(store_error)?;

    // Newest first; ties on the timestamp fall back to the uuid v7 id so the
    // order stays deterministic.
    docs.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    docs.iter().map(to_wire).collect::<Result<Vec<_>, _>>().map(Json)
}

async fn create_book(
    user: AuthUser,
    State(state): State<AppState>,
    Json(draft): Json<BookDraft>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let details = validate_fields(
        Some(&draft.title),
        Some(&draft.author),
        draft.publication_year,
        draft.rating,
    );
    if !details.is_empty() {
        return Err(AppError::validation(details, "book payload is invalid"));
    }

    let books = state.store.collection("books").map_err(store_error)?;
    let body = serde_json::to_value(BookDoc::from_draft(&user.id, &draft))
        .map_err(|err| AppError::Internal(anyhow::Error::new(err)))?;
    let doc = books.insert(body).map_err(store_error)?;

    tracing::debug!(user_id = %user.id, book_id = %doc.id, "book created");
    Ok((StatusCode::CREATED, Json(to_wire(&doc)?)))
}

async fn update_book(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut patch): Json<BookPatch>,
) -> Result<Json<Book>, AppError> {
    let books = state.store.collection("books").map_err(store_error)?;
    let existing = owned_doc(&books, &id, &user.id)?;

    // A patch with no fields changes nothing; answer with the current record
    // without touching the store.
    if patch.is_empty() {
        return Ok(Json(to_wire(&existing)?));
    }

    let details = validate_fields(
        patch.title.as_deref(),
        patch.author.as_deref(),
        patch.publication_year,
        patch.rating,
    );
    if !details.is_empty() {
        return Err(AppError::validation(details, "book payload is invalid"));
    }

    normalize_patch(&mut patch);
    let changes = serde_json::to_value(&patch)
        .map_err(|err| AppError::Internal(anyhow::Error::new(err)))?;
    let doc = books.update_merge(&id, changes).map_err(store_error)?;

    tracing::debug!(user_id = %user.id, book_id = %id, "book updated");
    Ok(Json(to_wire(&doc)?))
}

async fn delete_book(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let books = state.store.collection("books").map_err(store_error)?;
    owned_doc(&books, &id, &user.id)?;
    books.remove(&id).map_err(store_error)?;

    tracing::debug!(user_id = %user.id, book_id = %id, "book deleted");
    Ok(Json(json!({"message": "Book deleted successfully"})))
}

/// Ownership gate. A book belonging to another user is reported exactly like
/// a missing one, so ids cannot be probed across accounts.
fn owned_doc(
    books: &std::sync::Arc<shelf_store::Collection>,
    id: &str,
    user_id: &str,
) -> Result<shelf_store::Document, AppError> {
    let doc = books
        .get(id)
        .map_err(store_error)?
        .ok_or_else(|| AppError::not_found("Book not found"))?;
    if doc.body.get("userId").and_then(Value::as_str) != Some(user_id) {
        return Err(AppError::not_found("Book not found"));
    }
    Ok(doc)
}

/// Create a new instance of the books module
pub fn create_module(state: AppState) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(state))
}
