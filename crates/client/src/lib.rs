//! Remote data client for the Shelf REST API.
//!
//! A thin reqwest wrapper that attaches the bearer token from the session
//! store and normalizes HTTP responses into `ApiError` values. The client
//! re-reads the token before every request; login/logout elsewhere in the
//! process is picked up immediately. No retries, no timeouts beyond the
//! transport's own: a failed call is reported once and requires explicit
//! re-invocation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;

use shelf_collection::{ApiError, AuthResponse, Book, BookDraft, BookPatch, BooksApi, User};

/// Process-wide session state: the current bearer token, if any.
///
/// Shared between the client and whatever drives login/logout; the original
/// kept this in browser localStorage.
#[derive(Debug, Default)]
pub struct SessionStore {
    token: RwLock<Option<String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        }
    }

    pub fn set_token(&self, token: impl Into<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = Some(token.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}

/// HTTP client for the Shelf API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl ApiClient {
    /// Client with its own private session store.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_session(base_url, Arc::new(SessionStore::new()))
    }

    /// Client sharing an externally owned session store.
    pub fn with_session(base_url: impl Into<String>, session: Arc<SessionStore>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request, attaching the current bearer token, and decode the
    /// success body or translate the failure.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        // Token may have changed since the last call; always re-read it.
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|err| ApiError::Transport(err.to_string()));
        }

        let body = response.text().await.unwrap_or_default();
        let err = error_from_response(status.as_u16(), &body);
        tracing::debug!(status = status.as_u16(), error = %err, "request failed");
        Err(err)
    }

    // --- auth ---

    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        let response: AuthResponse = self
            .execute(
                self.http
                    .post(self.url("/api/auth/register"))
                    .json(&json!({ "name": name, "email": email, "password": password })),
            )
            .await?;
        self.session.set_token(&response.token);
        Ok(response)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        let response: AuthResponse = self
            .execute(
                self.http
                    .post(self.url("/api/auth/login"))
                    .json(&json!({ "email": email, "password": password })),
            )
            .await?;
        self.session.set_token(&response.token);
        Ok(response)
    }

    /// Drop the local token. The server keeps no revocation list; the
    /// session simply ages out.
    pub fn logout(&self) {
        self.session.clear();
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        self.execute(self.http.get(self.url("/api/auth/me"))).await
    }

    pub async fn health(&self) -> Result<serde_json::Value, ApiError> {
        self.execute(self.http.get(self.url("/api/health"))).await
    }
}

#[async_trait]
impl BooksApi for ApiClient {
    async fn list_books(&self) -> Result<Vec<Book>, ApiError> {
        self.execute(self.http.get(self.url("/api/books"))).await
    }

    async fn create_book(&self, draft: &BookDraft) -> Result<Book, ApiError> {
        self.execute(self.http.post(self.url("/api/books")).json(draft))
            .await
    }

    async fn update_book(&self, id: &str, patch: &BookPatch) -> Result<Book, ApiError> {
        self.execute(
            self.http
                .put(self.url(&format!("/api/books/{id}")))
                .json(patch),
        )
        .await
    }

    async fn delete_book(&self, id: &str) -> Result<(), ApiError> {
        // The server answers {"message": ...}; the caller only needs success.
        let _: serde_json::Value = self
            .execute(self.http.delete(self.url(&format!("/api/books/{id}"))))
            .await?;
        Ok(())
    }
}

/// Map a non-2xx response to the error taxonomy. The message comes from the
/// server's error envelope when one is present, the bare `{"error": "..."}`
/// shape otherwise, and falls back to the status code.
fn error_from_response(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_owned)
                .or_else(|| value.get("error").and_then(|e| e.as_str()).map(str::to_owned))
        })
        .unwrap_or_else(|| format!("HTTP {status}"));

    match status {
        400 => ApiError::Validation(message),
        401 => ApiError::Auth(message),
        404 => ApiError::NotFound(message),
        _ => ApiError::Server { status, message },
    }
}
