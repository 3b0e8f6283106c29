//! Project-specific utilities shared across modules.

use shelf_http::error::AppError;
use shelf_store::StoreError;
use time::OffsetDateTime;

/// Map store failures to HTTP errors. Conflicts are handled at call sites
/// where the offending field is known.
pub fn store_error(err: StoreError) -> AppError {
    match err {
        StoreError::NotFound(id) => AppError::not_found(format!("document '{id}' not found")),
        other => AppError::Internal(anyhow::Error::new(other)),
    }
}

/// Upper bound for `publicationYear`: ten years into the future, matching the
/// original schema's soft limit.
pub fn max_publication_year() -> i32 {
    OffsetDateTime::now_utc().year() + 10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_store_errors_stay_not_found() {
        let err = store_error(StoreError::NotFound("x".into()));
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[test]
    fn year_bound_is_in_the_future() {
        assert!(max_publication_year() > 2030);
    }
}
