use anyhow::Context;
use std::sync::Arc;

use crate::module::{InitCtx, Module};

/// Core module initialization order (excluding HTTP server)
const CORE_MODULE_ORDER: &[&str] = &[
    "auth", // Identity first: every other module's routes sit behind it
            // Note: HTTP server is started separately after all modules are initialized
];

/// Module registry for managing module lifecycle with core/custom separation
pub struct ModuleRegistry {
    core_modules: Vec<Arc<dyn Module>>,
    custom_modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            core_modules: Vec::new(),
            custom_modules: Vec::new(),
        }
    }

    /// Register a core module with the registry
    pub fn register_core(&mut self, module: Arc<dyn Module>) {
        self.core_modules.push(module);
    }

    /// Register a custom module with the registry
    pub fn register_custom(&mut self, module: Arc<dyn Module>) {
        self.custom_modules.push(module);
    }

    /// Get all registered modules (core + custom)
    pub fn modules(&self) -> Vec<&Arc<dyn Module>> {
        let mut all_modules = Vec::new();
        all_modules.extend(self.core_modules.iter());
        all_modules.extend(self.custom_modules.iter());
        all_modules
    }

    /// Initialize core modules in the correct order
    pub async fn init_core_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            "initializing core modules in order: {:?}",
            CORE_MODULE_ORDER
        );

        for &module_name in CORE_MODULE_ORDER {
            if let Some(module) = self.core_modules.iter().find(|m| m.name() == module_name) {
                tracing::info!(module = module.name(), "initializing core module");

                module.init(ctx).await.with_context(|| {
                    format!("failed to initialize core module '{}'", module.name())
                })?;
            }
        }

        Ok(())
    }

    /// Initialize custom modules
    pub async fn init_custom_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("initializing {} custom modules", self.custom_modules.len());

        for module in &self.custom_modules {
            tracing::info!(module = module.name(), "initializing custom module");

            module.init(ctx).await.with_context(|| {
                format!("failed to initialize custom module '{}'", module.name())
            })?;
        }

        Ok(())
    }

    /// Start core modules in the correct order
    pub async fn start_core_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("starting core modules in order: {:?}", CORE_MODULE_ORDER);

        for &module_name in CORE_MODULE_ORDER {
            if let Some(module) = self.core_modules.iter().find(|m| m.name() == module_name) {
                tracing::info!(module = module.name(), "starting core module");

                module
                    .start(ctx)
                    .await
                    .with_context(|| format!("failed to start core module '{}'", module.name()))?;
            }
        }

        Ok(())
    }

    /// Start custom modules
    pub async fn start_custom_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("starting {} custom modules", self.custom_modules.len());

        for module in &self.custom_modules {
            tracing::info!(module = module.name(), "starting custom module");

            module
                .start(ctx)
                .await
                .with_context(|| format!("failed to start custom module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Stop custom modules first (reverse order)
    pub async fn stop_custom_modules(&self) -> anyhow::Result<()> {
        tracing::info!("stopping {} custom modules", self.custom_modules.len());

        for module in self.custom_modules.iter().rev() {
            tracing::info!(module = module.name(), "stopping custom module");

            module
                .stop()
                .await
                .with_context(|| format!("failed to stop custom module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Stop core modules in reverse order
    pub async fn stop_core_modules(&self) -> anyhow::Result<()> {
        tracing::info!("stopping core modules in reverse order");

        for &module_name in CORE_MODULE_ORDER.iter().rev() {
            if let Some(module) = self.core_modules.iter().find(|m| m.name() == module_name) {
                tracing::info!(module = module.name(), "stopping core module");

                module
                    .stop()
                    .await
                    .with_context(|| format!("failed to stop core module '{}'", module.name()))?;
            }
        }

        Ok(())
    }

    /// Collect the document-store collections needed by all modules
    /// (core + custom), deduplicated, in deterministic order
    pub fn collect_collections(&self) -> Vec<&'static str> {
        let mut collections = Vec::new();

        for module in &self.core_modules {
            collections.extend(module.collections());
        }
        for module in &self.custom_modules {
            collections.extend(module.collections());
        }

        collections.sort_unstable();
        collections.dedup();
        collections
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
