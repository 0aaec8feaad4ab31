use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use lti_bus_bridge::bus::{BusAdapter, InMemoryBus};
use lti_bus_bridge::cli::Cli;
use lti_bus_bridge::config::BridgeConfig;
use lti_bus_bridge::credentials::CredentialStore;
use lti_bus_bridge::delivery::DeliveryEngine;
use lti_bus_bridge::server;
use lti_bus_bridge::server::state::AppState;
use lti_bus_bridge::subscription::{FileSubscriptionStore, SubscriptionRegistry};

fn init_tracing(config: &BridgeConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.loglevel.as_filter_directive()));

    match &config.logfile {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "lti-bus-bridge.log".to_string());
            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("lti-bus-bridge: {e}");
        std::process::exit(1);
    }
}

async fn run() -> lti_bus_bridge::error::Result<()> {
    let cli = Cli::parse();
    let config = BridgeConfig::from_cli(&cli);
    let _tracing_guard = init_tracing(&config);

    let _ = rustls::crypto::ring::default_provider().install_default();

    let credentials = Arc::new(CredentialStore::load(&config.configfile)?);
    tracing::info!(topics = credentials.len(), "Credential store loaded");

    let registry = Arc::new(SubscriptionRegistry::load(Box::new(
        FileSubscriptionStore::new(&config.subscriptions_file),
    ))?);

    let bus: Arc<dyn BusAdapter> = Arc::new(InMemoryBus::new());
    let delivery = Arc::new(DeliveryEngine::new(&registry, &credentials, bus.clone()));
    delivery.spawn_workers();

    // Re-subscribe every persisted topic before accepting HTTP traffic
    // (spec §4.2 "Startup sequence", P4).
    for topic in registry.topics().await {
        if let Err(e) = bus.subscribe(&topic, delivery.handler()).await {
            tracing::error!(topic, error = %e, "Failed to re-subscribe topic at startup");
        }
    }
    tracing::info!(topics = registry.topics().await.len(), "Bus subscriptions re-established");

    let app_state = AppState::new(credentials, registry.clone(), bus.clone(), delivery);

    let shutdown = Box::pin(async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("SIGINT received, shutting down");
    });

    server::start(&config, app_state, shutdown).await?;

    for topic in registry.topics().await {
        let _ = bus.unsubscribe(&topic).await;
    }

    Ok(())
}
