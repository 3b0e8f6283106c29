//! HTTP server facade for Shelf with Axum, error handling, and OpenAPI support.

use anyhow::Context;
use axum::{routing::get, Json, Router};
use serde_json::json;

use shelf_kernel::ModuleRegistry;

pub mod error;
pub mod router;

use router::RouterBuilder;

/// Start the HTTP server with the given module registry
pub async fn start_server(
    registry: &ModuleRegistry,
    settings: &shelf_kernel::settings::Settings,
) -> anyhow::Result<()> {
    tracing::info!(
        "starting HTTP server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    // Build the main router
    let app = build_router(registry, settings)
        .await
        .context("failed to build HTTP router")?;

    // Create the server
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", settings.server.host, settings.server.port))
            .await
            .context("failed to bind to address")?;

    tracing::info!(
        "HTTP server listening on http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    // Start serving
    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;

    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub async fn build_router(
    registry: &ModuleRegistry,
    settings: &shelf_kernel::settings::Settings,
) -> anyhow::Result<Router> {
    let mut router_builder = RouterBuilder::new();

    // Add global middlewares
    router_builder = router_builder
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms);

    // Add health check route (unauthenticated, fixed body for probes)
    router_builder = router_builder.route("/api/health", get(health_check));

    // Mount module routes
    for module in registry.modules() {
        let module_name = module.name();
        let module_router = module.routes();

        tracing::info!(
            module = module_name,
            "mounting module routes under /api/{}",
            module_name
        );
        router_builder = router_builder.mount_module(module_name, module_router);
    }

    // Add OpenAPI documentation
    router_builder = router_builder.with_openapi(registry);

    Ok(router_builder.build())
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "Server is running" }))
}
