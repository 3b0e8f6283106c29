//! Shelf application library.
//!
//! Wires the module kernel, document store, and HTTP facade into the running
//! book-tracking service.

use std::sync::Arc;

use anyhow::Context;
use shelf_kernel::settings::Settings;
use shelf_kernel::{InitCtx, ModuleRegistry};
use shelf_store::Store;

pub mod modules;
pub mod state;
pub mod utils;

pub use state::AppState;

/// Bootstrap and run the service until the server exits.
pub async fn run() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load settings")?;
    shelf_telemetry::init(&settings.telemetry);

    tracing::info!(env = ?settings.environment, "shelf-app bootstrap starting");

    let store = Arc::new(Store::new());
    let state = AppState::new(&settings, Arc::clone(&store));

    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, state);

    let ctx = InitCtx {
        settings: &settings,
        store: &store,
    };

    registry.init_core_modules(&ctx).await?;
    registry.init_custom_modules(&ctx).await?;

    // Modules declare their collections; the store provisions the union.
    store.provision(registry.collect_collections());
    tracing::info!(collections = ?store.collection_names(), "store provisioned");

    registry.start_core_modules(&ctx).await?;
    registry.start_custom_modules(&ctx).await?;

    let serve_result = shelf_http::start_server(&registry, &settings).await;

    registry.stop_custom_modules().await?;
    registry.stop_core_modules().await?;
    tracing::info!("shelf-app shut down");

    serve_result
}
