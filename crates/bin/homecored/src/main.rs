//! # homecored
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Initialize tracing
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the package resolver, script host and key/value store (adapters)
//! - Construct the registry, initializer and component service
//! - Load every configured component; failures are logged and skipped
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT), firing the shutdown signal
//!   observed by in-flight pipelines
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer. No domain logic belongs here.

mod config;

use std::sync::Arc;

use homecore_adapter_http_axum::router;
use homecore_adapter_http_axum::state::AppState;
use homecore_adapter_lua_mlua::LuaScriptHost;
use homecore_adapter_packages_fs::FsPackageResolver;
use homecore_adapter_storage_sqlite_sqlx::SqliteKeyValueStore;
use homecore_app::bridge::{RegistryBridge, SettingsSink};
use homecore_app::initializer::ComponentInitializer;
use homecore_app::registry::ComponentRegistry;
use homecore_app::services::component_service::ComponentService;
use homecore_app::services::settings_persister::SettingsPersister;
use homecore_app::shutdown::{self, ShutdownTrigger};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let bind_addr = config.bind_addr();

    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.logging.filter))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database
    let db = homecore_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let settings = Arc::new(SettingsPersister::new(SqliteKeyValueStore::new(
        db.pool().clone(),
    )));

    // Packages
    let resolver = FsPackageResolver::new(config.packages.root.clone());
    tracing::info!(root = %resolver.root().display(), "resolving packages");

    // Registry and scripting
    let (trigger, signal) = shutdown::channel();
    let registry = Arc::new(ComponentRegistry::new(signal));
    let bridge = RegistryBridge::new(&registry, tokio::runtime::Handle::current())
        .with_settings_sink(Arc::clone(&settings) as Arc<dyn SettingsSink>);
    let host = Arc::new(LuaScriptHost::new(bridge));
    let initializer = ComponentInitializer::new(resolver, host);

    // Services
    let service = Arc::new(ComponentService::new(
        Arc::clone(&registry),
        initializer,
        settings,
    ));
    let report = service.load_all(config.components).await;
    tracing::info!(
        loaded = report.loaded.len(),
        failed = report.failed.len(),
        "components loaded"
    );

    // HTTP
    let app = router::build(AppState::from_arc(service));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("homecored listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_requested(trigger))
        .await?;

    tracing::info!("homecored stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, after firing the process-wide shutdown signal.
async fn shutdown_requested(trigger: ShutdownTrigger) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown requested");
    trigger.trigger();
}
