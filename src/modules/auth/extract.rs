//! Bearer-token authentication extractor.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use shelf_http::error::AppError;

use crate::state::AppState;
use crate::utils::store_error;

/// The authenticated caller, resolved from the `Authorization: Bearer`
/// header against the sessions collection. Handlers taking this as an
/// argument reject unauthenticated requests with 401 before running.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("missing bearer token"))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::unauthorized("malformed authorization header"))?;

        let sessions = state.store.collection("sessions").map_err(store_error)?;
        let session = sessions
            .find_one(|body| body.get("token").and_then(Value::as_str) == Some(token))
            .map_err(store_error)?
            .ok_or_else(|| AppError::unauthorized("invalid or expired session"))?;

        let live = session
            .body
            .get("expiresAt")
            .and_then(Value::as_str)
            .and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
            .is_some_and(|expires_at| expires_at > OffsetDateTime::now_utc());
        if !live {
            return Err(AppError::unauthorized("invalid or expired session"));
        }

        let user_id = session
            .body
            .get("userId")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::unauthorized("invalid or expired session"))?;

        let users = state.store.collection("users").map_err(store_error)?;
        let user = users
            .get(user_id)
            .map_err(store_error)?
            .and_then(|doc| super::models::user_from_doc(&doc))
            .ok_or_else(|| AppError::unauthorized("invalid or expired session"))?;

        Ok(AuthUser {
            id: user.id,
            email: user.email,
            name: user.name,
        })
    }
}
