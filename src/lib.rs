//! Bookshelf application library
//!
//! Wires the books module into the module registry and runs the HTTP server.

pub mod modules;
pub mod utils;

use bookshelf_kernel::{settings::Settings, InitCtx, ModuleRegistry};

/// Registry with every application module registered
pub fn build_registry(settings: &Settings) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, settings);
    registry
}

/// Initialize and start all modules, serve HTTP until shutdown, then stop modules.
pub async fn run(settings: Settings) -> anyhow::Result<()> {
    let registry = build_registry(&settings);
    let ctx = InitCtx {
        settings: &settings,
    };

    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served = bookshelf_http::start_server(&registry, &settings).await;

    registry.stop_all().await?;
    served
}
