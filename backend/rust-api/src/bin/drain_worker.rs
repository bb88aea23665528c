use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::fmt::init;

use quizdeck_api::{
    config::Config,
    services::{drain_worker::DrainWorker, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();

    let config = Config::load().expect("Failed to load configuration");

    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to connect to MongoDB");

    let redis_client =
        redis::Client::open(config.redis_uri.clone()).expect("Failed to create Redis client");

    let app_state = AppState::new(config.clone(), mongo_client, redis_client)
        .await
        .expect("Failed to initialize app state");

    let poll_interval = Duration::from_millis(config.drain_poll_interval_ms);

    let interactions = DrainWorker::interactions(
        app_state.redis.clone(),
        app_state.mongo.clone(),
        poll_interval,
    );
    let session_stats = DrainWorker::session_stats(
        app_state.redis.clone(),
        app_state.mongo.clone(),
        poll_interval,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let interactions_task = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move { interactions.run(shutdown).await }
    });
    let session_stats_task = tokio::spawn({
        let shutdown = shutdown_rx.clone();
        async move { session_stats.run(shutdown).await }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received, draining in-flight events");
    shutdown_tx.send(true)?;

    interactions_task.await??;
    session_stats_task.await??;

    tracing::info!("drain workers stopped");
    Ok(())
}
