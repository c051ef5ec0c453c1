// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum_server::tls_rustls::RustlsConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use dhamana_gateway::{
    api::router,
    blockchain::{signing::local_signer_fn, BondChat, ConfidentialBackend, SapphireClient},
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER},
    indexer::EventSynchronizer,
    state::AppState,
    storage::{BondDatabase, DATABASE_FILE},
};

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown requested");
    shutdown.cancel();
}

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env().expect("Invalid configuration");
    init_tracing(config.log_format);

    // Install the ring crypto provider for rustls (must be done before any TLS operations)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing::info!(
        network = config.network.name,
        chain_id = config.network.chain_id,
        contract = %config.contract,
        deployment_block = config.deployment_block,
        "starting gateway"
    );

    let client = SapphireClient::new(config.network, config.rpc_url.as_deref())
        .expect("Invalid RPC URL");
    let runtime_key = client
        .runtime_public_key()
        .await
        .expect("Failed to fetch runtime public key");
    let chain = Arc::new(client);

    let transport = ConfidentialBackend::wrap(chain, &runtime_key, local_signer_fn())
        .await
        .expect("Failed to establish confidential transport");
    if transport.chain_id() != config.network.chain_id {
        panic!(
            "RPC endpoint serves chain {} but network {} expects {}",
            transport.chain_id(),
            config.network.name,
            config.network.chain_id
        );
    }

    let db = Arc::new(
        BondDatabase::open(&config.data_dir.join(DATABASE_FILE))
            .expect("Failed to open bond database"),
    );

    let shutdown = CancellationToken::new();

    let synchronizer = EventSynchronizer::new(
        transport.inner().clone(),
        db.clone(),
        config.contract,
        config.deployment_block,
    );
    let sync_task = tokio::spawn(synchronizer.run(shutdown.clone()));

    let state = AppState::new(
        db,
        BondChat::new(config.contract, transport),
        config.data_dir.clone(),
    );
    let app = router(state);
    let addr = config.bind_addr;

    tokio::spawn(shutdown_signal(shutdown.clone()));

    match &config.tls {
        Some(tls) => {
            let tls_config = RustlsConfig::from_pem_file(&tls.cert, &tls.key)
                .await
                .expect("Failed to load TLS certificate and key");
            let handle = axum_server::Handle::new();
            let on_shutdown = handle.clone();
            let token = shutdown.clone();
            tokio::spawn(async move {
                token.cancelled().await;
                on_shutdown.graceful_shutdown(None);
            });

            tracing::info!(%addr, "listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTPS server failed");
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .expect("Failed to bind listener");
            tracing::info!(%addr, "listening on http (docs at /docs)");
            let token = shutdown.clone();
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
                .expect("HTTP server failed");
        }
    }

    shutdown.cancel();
    if let Err(e) = sync_task.await {
        tracing::error!(error = %e, "event synchronizer task failed");
    }
}
