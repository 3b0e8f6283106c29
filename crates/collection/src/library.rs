//! The book-collection view model.
//!
//! One `Library` instance is constructed per signed-in session and discarded
//! on logout. It owns the authoritative in-memory copy of the user's books,
//! the filter/sort inputs, and the bulk-selection set; derived views are
//! recomputed snapshots, never mutated in place.
//!
//! Mutations apply only after confirmed success: the record the server
//! returns is merged in as ground truth, so a failed call leaves local state
//! untouched. There is deliberately no per-record in-flight guard; if the
//! caller issues overlapping operations against the same record, the last
//! confirmed write wins.

use std::collections::HashSet;
use std::sync::Arc;

use crate::api::{ApiError, BooksApi};
use crate::model::{Book, BookDraft, BookPatch, Status};
use crate::views::{LibraryStats, LibraryView, SortKey};

/// Aggregate result of `bulk_mark_finished`. Per-record detail is
/// intentionally not reported; call sites only consume the counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub success: usize,
    pub failure: usize,
}

pub struct Library {
    api: Arc<dyn BooksApi>,
    books: Vec<Book>,
    search_term: String,
    sort_key: SortKey,
    selected: HashSet<String>,
}

impl Library {
    pub fn new(api: Arc<dyn BooksApi>) -> Self {
        Self {
            api,
            books: Vec::new(),
            search_term: String::new(),
            sort_key: SortKey::default(),
            selected: HashSet::new(),
        }
    }

    /// The authoritative collection, unfiltered and in load/insert order.
    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    /// Ids currently selected for the bulk action.
    pub fn selected(&self) -> &HashSet<String> {
        &self.selected
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        self.sort_key = key;
    }

    pub fn clear_filters(&mut self) {
        self.search_term.clear();
        self.sort_key = SortKey::default();
    }

    /// Recompute the derived projections for the current inputs.
    pub fn views(&self) -> LibraryView {
        LibraryView::derive(&self.books, &self.search_term, self.sort_key)
    }

    pub fn stats(&self) -> LibraryStats {
        LibraryStats::of(&self.books)
    }

    /// Replace the collection wholesale from the server. Returns the number
    /// of books loaded.
    pub async fn reload(&mut self) -> Result<usize, ApiError> {
        let books = self.api.list_books().await?;
        tracing::debug!(count = books.len(), "collection reloaded");
        self.books = books;
        // Drop selections pointing at records that no longer exist.
        let known: HashSet<&str> = self.books.iter().map(|b| b.id.as_str()).collect();
        self.selected.retain(|id| known.contains(id.as_str()));
        Ok(self.books.len())
    }

    /// Create a book. The only client-side pre-flight this view model
    /// performs: trimmed title and author must be non-empty, checked before
    /// any remote call is made.
    pub async fn add_book(&mut self, draft: BookDraft) -> Result<Book, ApiError> {
        let title = draft.title.trim().to_string();
        let author = draft.author.trim().to_string();
        if title.is_empty() || author.is_empty() {
            return Err(ApiError::Validation(
                "title and author are required".to_string(),
            ));
        }

        let draft = BookDraft {
            title,
            author,
            ..draft
        };
        let created = self.api.create_book(&draft).await?;
        self.books.push(created.clone());
        Ok(created)
    }

    /// Patch arbitrary fields of a book.
    pub async fn edit_fields(&mut self, id: &str, patch: BookPatch) -> Result<Book, ApiError> {
        self.require(id)?;
        let updated = self.api.update_book(id, &patch).await?;
        self.merge(updated.clone());
        Ok(updated)
    }

    /// Transition a book to a new status.
    pub async fn update_status(&mut self, id: &str, status: Status) -> Result<Book, ApiError> {
        self.require(id)?;
        let updated = self.api.update_book(id, &BookPatch::status(status)).await?;
        self.merge(updated.clone());
        Ok(updated)
    }

    /// Flip the favorite flag, computed from the local record.
    pub async fn toggle_favorite(&mut self, id: &str) -> Result<Book, ApiError> {
        let current = self.require(id)?.is_favorite;
        let updated = self
            .api
            .update_book(id, &BookPatch::favorite(!current))
            .await?;
        self.merge(updated.clone());
        Ok(updated)
    }

    /// Delete a book; on success it also leaves the bulk selection.
    pub async fn delete_book_by_id(&mut self, id: &str) -> Result<(), ApiError> {
        self.api.delete_book(id).await?;
        self.books.retain(|b| b.id != id);
        self.selected.remove(id);
        Ok(())
    }

    /// Toggle bulk selection for a book. Only not-read books are selectable;
    /// deselection always works. Returns whether the id is selected now.
    pub fn toggle_selected(&mut self, id: &str) -> bool {
        if self.selected.remove(id) {
            return false;
        }
        let selectable = self
            .books
            .iter()
            .any(|b| b.id == id && b.status == Status::NotRead);
        if selectable {
            self.selected.insert(id.to_string());
        }
        self.selected.contains(id)
    }

    /// Mark every selected book finished, one awaited call at a time.
    ///
    /// Books already finished are skipped without a remote call. Individual
    /// failures are counted and do not stop the loop; the selection set is
    /// cleared unconditionally at the end.
    pub async fn bulk_mark_finished(&mut self) -> BulkOutcome {
        let ids: Vec<String> = self.selected.iter().cloned().collect();
        let mut outcome = BulkOutcome::default();

        for id in ids {
            let already_finished = self
                .books
                .iter()
                .any(|b| b.id == id && b.status == Status::Finished);
            if already_finished {
                continue;
            }
            match self.update_status(&id, Status::Finished).await {
                Ok(_) => outcome.success += 1,
                Err(err) => {
                    tracing::warn!(book_id = %id, error = %err, "bulk mark-finished failed for record");
                    outcome.failure += 1;
                }
            }
        }

        self.selected.clear();
        outcome
    }

    fn require(&self, id: &str) -> Result<&Book, ApiError> {
        self.books
            .iter()
            .find(|b| b.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("book '{id}' is not in the collection")))
    }

    /// Merge a server-confirmed record into the collection by id. The
    /// server's copy wins over any locally computed value so server-side
    /// normalization (trimming, defaulting) is reflected.
    fn merge(&mut self, updated: Book) {
        match self.books.iter_mut().find(|b| b.id == updated.id) {
            Some(slot) => *slot = updated,
            None => self.books.push(updated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use time::OffsetDateTime;

    use async_trait::async_trait;

    /// Scripted stand-in for the remote data client: an in-memory collection
    /// with per-id failure injection and a call counter.
    #[derive(Default)]
    struct ScriptedApi {
        books: Mutex<Vec<Book>>,
        calls: AtomicUsize,
        fail_ids: Mutex<HashSet<String>>,
        next_id: AtomicUsize,
    }

    impl ScriptedApi {
        fn with_books(books: Vec<Book>) -> Self {
            Self {
                books: Mutex::new(books),
                ..Self::default()
            }
        }

        fn fail_on(&self, id: &str) {
            self.fail_ids.lock().unwrap().insert(id.to_string());
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn check_fail(&self, id: &str) -> Result<(), ApiError> {
            if self.fail_ids.lock().unwrap().contains(id) {
                return Err(ApiError::Server {
                    status: 500,
                    message: "injected failure".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BooksApi for ScriptedApi {
        async fn list_books(&self) -> Result<Vec<Book>, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.books.lock().unwrap().clone())
        }

        async fn create_book(&self, draft: &BookDraft) -> Result<Book, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n = self.next_id.fetch_add(1, Ordering::SeqCst);
            let book = Book {
                id: format!("srv-{n}"),
                // The server trims on its own; mirror that normalization.
                title: draft.title.trim().to_string(),
                author: draft.author.trim().to_string(),
                status: draft.status,
                publication_year: draft.publication_year,
                rating: draft.rating,
                is_favorite: draft.is_favorite,
                created_at: OffsetDateTime::UNIX_EPOCH,
                updated_at: OffsetDateTime::UNIX_EPOCH,
            };
            self.books.lock().unwrap().push(book.clone());
            Ok(book)
        }

        async fn update_book(&self, id: &str, patch: &BookPatch) -> Result<Book, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.check_fail(id)?;
            let mut books = self.books.lock().unwrap();
            let book = books
                .iter_mut()
                .find(|b| b.id == id)
                .ok_or_else(|| ApiError::NotFound("Book not found".to_string()))?;
            if let Some(title) = &patch.title {
                book.title = title.trim().to_string();
            }
            if let Some(author) = &patch.author {
                book.author = author.trim().to_string();
            }
            if let Some(status) = patch.status {
                book.status = status;
            }
            if let Some(year) = patch.publication_year {
                book.publication_year = Some(year);
            }
            if let Some(rating) = patch.rating {
                book.rating = Some(rating);
            }
            if let Some(fav) = patch.is_favorite {
                book.is_favorite = fav;
            }
            Ok(book.clone())
        }

        async fn delete_book(&self, id: &str) -> Result<(), ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.check_fail(id)?;
            let mut books = self.books.lock().unwrap();
            let before = books.len();
            books.retain(|b| b.id != id);
            if books.len() == before {
                return Err(ApiError::NotFound("Book not found".to_string()));
            }
            Ok(())
        }
    }

    fn seed(id: &str, title: &str, status: Status) -> Book {
        Book {
            id: id.into(),
            title: title.into(),
            author: "Author".into(),
            status,
            publication_year: None,
            rating: None,
            is_favorite: false,
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    async fn library_with(books: Vec<Book>) -> (Library, Arc<ScriptedApi>) {
        let api = Arc::new(ScriptedApi::with_books(books));
        let mut library = Library::new(api.clone());
        library.reload().await.unwrap();
        (library, api)
    }

    #[tokio::test]
    async fn add_book_rejects_blank_title_without_remote_call() {
        let (mut library, api) = library_with(vec![]).await;
        let calls_before = api.calls();

        let err = library
            .add_book(BookDraft::new("", "X"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(api.calls(), calls_before, "no remote call was made");
        assert!(library.books().is_empty());
    }

    #[tokio::test]
    async fn add_book_rejects_whitespace_only_author() {
        let (mut library, api) = library_with(vec![]).await;
        let calls_before = api.calls();

        let err = library
            .add_book(BookDraft::new("Dune", "   "))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(api.calls(), calls_before);
    }

    #[tokio::test]
    async fn add_book_trims_title_and_author() {
        let (mut library, _api) = library_with(vec![]).await;

        let created = library
            .add_book(BookDraft::new(" Dune ", " Herbert "))
            .await
            .unwrap();

        assert_eq!(created.title, "Dune");
        assert_eq!(created.author, "Herbert");
        assert_eq!(library.books().len(), 1);
        assert_eq!(library.books()[0].title, "Dune");
    }

    #[tokio::test]
    async fn update_uses_server_record_as_ground_truth() {
        let (mut library, _api) = library_with(vec![seed("b1", "Dune", Status::NotRead)]).await;

        // The scripted server trims the patched title; the local copy must
        // reflect the server's normalized value, not the raw patch.
        let patch = BookPatch {
            title: Some("  Dune Messiah  ".to_string()),
            ..BookPatch::default()
        };
        let updated = library.edit_fields("b1", patch).await.unwrap();

        assert_eq!(updated.title, "Dune Messiah");
        assert_eq!(library.books()[0].title, "Dune Messiah");
    }

    #[tokio::test]
    async fn failed_update_leaves_collection_unchanged() {
        let (mut library, api) = library_with(vec![seed("b1", "Dune", Status::NotRead)]).await;
        api.fail_on("b1");
        let before = library.books().to_vec();

        let err = library
            .update_status("b1", Status::Finished)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Server { .. }));
        assert_eq!(library.books(), &before[..]);
    }

    #[tokio::test]
    async fn toggle_favorite_flips_from_local_state() {
        let (mut library, _api) = library_with(vec![seed("b1", "Dune", Status::Reading)]).await;

        let updated = library.toggle_favorite("b1").await.unwrap();
        assert!(updated.is_favorite);
        let updated = library.toggle_favorite("b1").await.unwrap();
        assert!(!updated.is_favorite);
    }

    #[tokio::test]
    async fn mutating_an_unknown_id_fails_locally() {
        let (mut library, api) = library_with(vec![]).await;
        let calls_before = api.calls();

        let err = library.toggle_favorite("ghost").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(api.calls(), calls_before);
    }

    #[tokio::test]
    async fn delete_removes_book_and_selection() {
        let (mut library, _api) = library_with(vec![seed("b1", "Dune", Status::NotRead)]).await;
        assert!(library.toggle_selected("b1"));

        library.delete_book_by_id("b1").await.unwrap();

        assert!(library.books().is_empty());
        assert!(library.selected().is_empty());
    }

    #[tokio::test]
    async fn failed_delete_changes_nothing() {
        let (mut library, api) = library_with(vec![seed("b1", "Dune", Status::NotRead)]).await;
        assert!(library.toggle_selected("b1"));
        api.fail_on("b1");
        let books_before = library.books().to_vec();
        let selection_before = library.selected().clone();

        let err = library.delete_book_by_id("b1").await.unwrap_err();

        assert!(matches!(err, ApiError::Server { .. }));
        assert_eq!(library.books(), &books_before[..]);
        assert_eq!(library.selected(), &selection_before);
    }

    #[tokio::test]
    async fn only_not_read_books_are_selectable() {
        let (mut library, _api) = library_with(vec![
            seed("b1", "Dune", Status::NotRead),
            seed("b2", "Gods", Status::Reading),
        ])
        .await;

        assert!(library.toggle_selected("b1"));
        assert!(!library.toggle_selected("b2"));
        assert!(!library.toggle_selected("missing"));
        assert_eq!(library.selected().len(), 1);

        // Toggling again deselects.
        assert!(!library.toggle_selected("b1"));
        assert!(library.selected().is_empty());
    }

    #[tokio::test]
    async fn bulk_mark_finished_reports_aggregate_and_clears_selection() {
        let (mut library, api) = library_with(vec![
            seed("b1", "One", Status::NotRead),
            seed("b2", "Two", Status::NotRead),
            seed("b3", "Three", Status::NotRead),
        ])
        .await;
        for id in ["b1", "b2", "b3"] {
            assert!(library.toggle_selected(id));
        }
        api.fail_on("b2");

        let outcome = library.bulk_mark_finished().await;

        assert_eq!(outcome, BulkOutcome { success: 2, failure: 1 });
        assert!(library.selected().is_empty(), "selection cleared regardless");
        let finished: Vec<&str> = library
            .books()
            .iter()
            .filter(|b| b.status == Status::Finished)
            .map(|b| b.id.as_str())
            .collect();
        assert_eq!(finished.len(), 2);
        assert!(!finished.contains(&"b2"));
    }

    #[tokio::test]
    async fn bulk_mark_finished_skips_already_finished_books() {
        let (mut library, api) = library_with(vec![seed("b1", "One", Status::NotRead)]).await;
        assert!(library.toggle_selected("b1"));
        // Finish it through the normal path first; the selection survives.
        library.update_status("b1", Status::Finished).await.unwrap();
        let calls_before = api.calls();

        let outcome = library.bulk_mark_finished().await;

        assert_eq!(outcome, BulkOutcome::default());
        assert_eq!(api.calls(), calls_before, "no remote call for finished books");
        assert!(library.selected().is_empty());
    }

    #[tokio::test]
    async fn reload_drops_stale_selections() {
        let (mut library, api) = library_with(vec![seed("b1", "One", Status::NotRead)]).await;
        assert!(library.toggle_selected("b1"));
        api.books.lock().unwrap().clear();

        let count = library.reload().await.unwrap();

        assert_eq!(count, 0);
        assert!(library.selected().is_empty());
    }

    #[tokio::test]
    async fn views_reflect_search_and_sort_state() {
        let (mut library, _api) = library_with(vec![
            seed("b1", "Dune", Status::NotRead),
            seed("b2", "American Gods", Status::Finished),
        ])
        .await;

        library.set_search_term("dune");
        let view = library.views();
        assert_eq!(view.all.len(), 1);
        assert_eq!(view.not_read.len(), 1);
        assert!(view.finished.is_empty());

        library.clear_filters();
        assert_eq!(library.views().all.len(), 2);
    }
}
