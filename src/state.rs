use std::sync::Arc;

use shelf_kernel::settings::Settings;
use shelf_store::Store;

/// Shared handler state for all Shelf modules.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub session_ttl_minutes: u64,
    pub min_password_len: usize,
}

impl AppState {
    pub fn new(settings: &Settings, store: Arc<Store>) -> Self {
        Self {
            store,
            session_ttl_minutes: settings.auth.session_ttl_minutes,
            min_password_len: settings.auth.min_password_len,
        }
    }
}
