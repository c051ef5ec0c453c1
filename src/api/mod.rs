// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{any, get},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    error::RpcError,
    state::AppState,
    storage::{BondDetails, BondSummary, ChatEntry},
};

pub mod gateway;
pub mod handlers;
pub mod health;
pub mod methods;
pub mod rpc;
pub mod session;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::welcome))
        .route("/serverpubkey", any(handlers::server_pubkey))
        .route("/backend", any(handlers::backend))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::welcome,
        handlers::server_pubkey,
        handlers::backend,
        health::health,
        health::liveness
    ),
    components(
        schemas(
            rpc::RpcMessage,
            rpc::SenderInfo,
            RpcError,
            session::ServerKeyResponse,
            BondSummary,
            BondDetails,
            ChatEntry,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Gateway", description = "Confidential JSON-RPC gateway for the bond-chat contract"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
