//! Assembles the dependencies the dispatch pipeline needs and serves the
//! router until a shutdown signal, draining in-flight requests for up to 5s.

use anyhow::Context;
use gateway_core::agent::InMemoryAgentRepository;
use gateway_core::config::Config;
use gateway_core::directory::AgentDirectory;
use gateway_core::lifecycle::signal::shutdown_signal;
use gateway_core::rate_limit::{LimiterRegistry, RedisTokenBucketStore, TokenBucketStore};
use gateway_server::AppState;
use std::sync::Arc;
use std::time::Duration;

const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("loading configuration")?;

    let token_store: Arc<dyn TokenBucketStore> = Arc::new(
        RedisTokenBucketStore::connect(
            &config.redis_addr,
            config.redis_password.as_deref(),
            config.redis_db,
        )
        .await
        .with_context(|| format!("connecting to rate-limit store at {}", config.redis_addr))?,
    );

    // The persistent agent store is an external collaborator outside this
    // crate's scope; this reference repository starts empty and is meant to
    // be swapped for a real implementation by whatever host wires this
    // binary into its admin surface.
    let repository = Arc::new(InMemoryAgentRepository::new());
    let directory = Arc::new(AgentDirectory::new(
        repository,
        Duration::from_secs(config.agent_directory_ttl_secs),
    ));
    let limiter_registry = Arc::new(LimiterRegistry::new(
        Arc::clone(&token_store),
        config.rate_limit_key_prefix.clone(),
    ));
    let http_client = reqwest::Client::builder()
        .build()
        .context("building upstream HTTP client")?;

    let listen_addr = config.listen_addr;
    let state = AppState {
        config: Arc::new(config),
        directory,
        limiter_registry,
        token_store,
        http_client,
    };
    let router = gateway_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("binding {listen_addr}"))?;
    tracing::info!(%listen_addr, "agent-connector-gatewayd listening");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    tracing::info!("shutdown signal received, draining for up to 5s");
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server).await {
        Ok(Ok(Ok(()))) => tracing::info!("drained cleanly"),
        Ok(Ok(Err(e))) => return Err(e.into()),
        Ok(Err(join_err)) => tracing::error!("server task ended abnormally: {join_err}"),
        Err(_) => tracing::warn!("drain deadline exceeded, exiting anyway"),
    }

    Ok(())
}
