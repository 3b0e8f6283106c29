use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shelf_collection::{Book, BookDraft, BookPatch, Status};
use shelf_http::error::AppError;
use shelf_store::Document;

use crate::utils::max_publication_year;

/// Stored shape of a book document. The owning user id is persisted alongside
/// the fields the wire model exposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDoc {
    pub user_id: String,
    pub title: String,
    pub author: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    pub is_favorite: bool,
}

impl BookDoc {
    /// Build a stored document body from a client draft, trimming free-text
    /// fields the same way the wire validation does.
    pub fn from_draft(user_id: &str, draft: &BookDraft) -> Self {
        Self {
            user_id: user_id.to_string(),
            title: draft.title.trim().to_string(),
            author: draft.author.trim().to_string(),
            status: draft.status,
            publication_year: draft.publication_year,
            rating: draft.rating,
            is_favorite: draft.is_favorite,
        }
    }
}

/// Project a stored document into the wire model, attaching the store-owned
/// id and timestamps.
pub fn to_wire(doc: &Document) -> Result<Book, AppError> {
    let stored: BookDoc = serde_json::from_value(doc.body.clone())
        .map_err(|err| AppError::Internal(anyhow::Error::new(err)))?;
    Ok(Book {
        id: doc.id.clone(),
        title: stored.title,
        author: stored.author,
        status: stored.status,
        publication_year: stored.publication_year,
        rating: stored.rating,
        is_favorite: stored.is_favorite,
        created_at: doc.created_at,
        updated_at: doc.updated_at,
    })
}

/// Field-level validation shared by create and update. Fields passed as
/// `None` are not being changed and are skipped.
pub fn validate_fields(
    title: Option<&str>,
    author: Option<&str>,
    publication_year: Option<i32>,
    rating: Option<u8>,
) -> Vec<Value> {
    let mut details = Vec::new();
    if let Some(title) = title {
        if title.trim().is_empty() {
            details.push(json!({"field": "title", "error": "required"}));
        }
    }
    if let Some(author) = author {
        if author.trim().is_empty() {
            details.push(json!({"field": "author", "error": "required"}));
        }
    }
    if let Some(year) = publication_year {
        let max = max_publication_year();
        if !(0..=max).contains(&year) {
            details.push(json!({
                "field": "publicationYear",
                "error": format!("must be between 0 and {max}")
            }));
        }
    }
    if let Some(rating) = rating {
        if !(1..=5).contains(&rating) {
            details.push(json!({"field": "rating", "error": "must be between 1 and 5"}));
        }
    }
    details
}

/// Trim free-text fields of a patch in place before persisting.
pub fn normalize_patch(patch: &mut BookPatch) {
    if let Some(title) = patch.title.as_mut() {
        *title = title.trim().to_string();
    }
    if let Some(author) = patch.author.as_mut() {
        *author = author.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_fields_are_trimmed() {
        let draft = BookDraft {
            title: "  Dune ".to_string(),
            author: " Frank Herbert ".to_string(),
            status: Status::NotRead,
            publication_year: Some(1965),
            rating: None,
            is_favorite: false,
        };
        let doc = BookDoc::from_draft("u1", &draft);
        assert_eq!(doc.title, "Dune");
        assert_eq!(doc.author, "Frank Herbert");
        assert_eq!(doc.user_id, "u1");
    }

    #[test]
    fn blank_title_and_author_are_rejected() {
        let details = validate_fields(Some("   "), Some(""), None, None);
        assert_eq!(details.len(), 2);
    }

    #[test]
    fn rating_bounds_are_inclusive() {
        assert!(validate_fields(None, None, None, Some(1)).is_empty());
        assert!(validate_fields(None, None, None, Some(5)).is_empty());
        assert_eq!(validate_fields(None, None, None, Some(0)).len(), 1);
        assert_eq!(validate_fields(None, None, None, Some(6)).len(), 1);
    }

    #[test]
    fn publication_year_allows_near_future() {
        let next_year = time::OffsetDateTime::now_utc().year() + 1;
        assert!(validate_fields(None, None, Some(next_year), None).is_empty());
        assert_eq!(validate_fields(None, None, Some(-1), None).len(), 1);
    }

    #[test]
    fn stored_body_uses_camel_case_keys() {
        let draft = BookDraft::new("Dune", "Frank Herbert");
        let body = serde_json::to_value(BookDoc::from_draft("u1", &draft)).unwrap();
        assert!(body.get("userId").is_some());
        assert!(body.get("isFavorite").is_some());
        assert_eq!(body["status"], "not-read");
    }
}
