pub mod auth;
pub mod books;

use shelf_kernel::ModuleRegistry;

use crate::state::AppState;

/// Register all application modules with the registry. Auth is a core module
/// so it initializes before everything that depends on sessions.
pub fn register_all(registry: &mut ModuleRegistry, state: AppState) {
    registry.register_core(auth::create_module(state.clone()));
    registry.register_custom(books::create_module(state));
}
