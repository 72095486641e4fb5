//! Pharmacy Assistant Server Entry Point

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use pharmacy_assistant_config::{constants::env, load_settings, Settings};
use pharmacy_assistant_server::{create_router, init_metrics, AppState};
use pharmacy_assistant_tools::{
    CatalogGateway, InMemoryCatalog, InMemoryKnowledgeBase, KnowledgeBase,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env} > config/default > defaults
    let env = std::env::var(env::ENVIRONMENT).ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized, use eprintln for early logging
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        }
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&config);

    tracing::info!("Starting Pharmacy Assistant v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        "Configuration loaded"
    );

    let metrics_handle = if config.observability.metrics_enabled {
        let handle = init_metrics();
        tracing::info!("Initialized Prometheus metrics at /metrics");
        handle
    } else {
        None
    };

    let gateway = load_catalog(&config)?;
    let knowledge = load_knowledge_base(&config)?;

    let persistence = pharmacy_assistant_persistence::init(&config.persistence)
        .await
        .context("failed to initialize persistence")?;

    let state = AppState::new(config.clone(), gateway, knowledge, persistence)
        .await
        .context("failed to build application state")?
        .with_env(env.clone())
        .with_metrics(metrics_handle);

    if let Some(ttl) = config.assistant.context_idle_ttl() {
        spawn_context_sweeper(&state, config.assistant.context_sweep_interval());
        tracing::info!(ttl_secs = ttl.as_secs(), "Idle conversation expiry enabled");
    }

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server.host))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    // Graceful shutdown on SIGTERM/SIGINT
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Catalog from the configured seed file, or an empty one
fn load_catalog(config: &Settings) -> anyhow::Result<Arc<dyn CatalogGateway>> {
    let catalog = match &config.catalog.seed_path {
        Some(path) => {
            let catalog = InMemoryCatalog::from_json_file(path)
                .with_context(|| format!("failed to load catalog seed {}", path))?;
            tracing::info!(path = %path, "Loaded catalog seed");
            catalog
        }
        None => {
            tracing::warn!("No catalog seed configured, starting with an empty catalog");
            InMemoryCatalog::new()
        }
    };
    Ok(Arc::new(catalog))
}

/// Drug knowledge base from the configured file, or an empty one
fn load_knowledge_base(config: &Settings) -> anyhow::Result<Arc<dyn KnowledgeBase>> {
    let knowledge = match &config.catalog.knowledge_base_path {
        Some(path) => {
            let kb = InMemoryKnowledgeBase::from_json_file(path)
                .with_context(|| format!("failed to load knowledge base {}", path))?;
            tracing::info!(path = %path, entries = kb.len(), "Loaded drug knowledge base");
            kb
        }
        None => {
            tracing::warn!("No knowledge base configured, drug questions will go unanswered");
            InMemoryKnowledgeBase::new(Vec::new())
        }
    };
    Ok(Arc::new(knowledge))
}

/// Periodically drop conversations idle past the configured TTL
fn spawn_context_sweeper(state: &AppState, interval: std::time::Duration) {
    let contexts = state.contexts.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let purged = contexts.purge_expired().await;
            if purged > 0 {
                tracing::debug!(purged, remaining = contexts.len(), "Swept idle conversations");
            }
        }
    });
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

/// Initialize console tracing
fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("pharmacy_assistant={},tower_http=debug", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
