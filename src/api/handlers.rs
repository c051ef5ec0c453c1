// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! RPC route handlers.
//!
//! Both RPC routes accept any HTTP method so a wrong one is reported in the
//! JSON-RPC error body instead of as a bare 405.

use alloy::primitives::Address;
use axum::{body::Bytes, extract::State, http::Method};
use chrono::Utc;
use serde_json::{json, Value};

use super::gateway::{decode_request, Dispatch};
use super::methods::{self, ContractRequest, MethodClass};
use super::rpc::{RpcMessage, RpcResponse};
use super::session;
use crate::error::{RpcErrorKind, RpcFailure};
use crate::state::AppState;
use crate::storage::SessionLookup;

pub const WELCOME_TEXT: &str = "Welcome to the Dhamana bond negotiation gateway";

/// Connectivity check.
#[utoipa::path(
    get,
    path = "/",
    tag = "Gateway",
    responses((status = 200, description = "Welcome text", body = String))
)]
pub async fn welcome() -> &'static str {
    WELCOME_TEXT
}

fn respond(mut msg: RpcMessage, outcome: Result<Value, RpcFailure>) -> RpcResponse {
    match outcome {
        Ok(result) => msg.pack_result(result),
        Err(failure) => {
            tracing::debug!(code = failure.kind.code(), detail = ?failure.detail, "rpc request failed");
            msg.pack_error(failure);
        }
    }
    RpcResponse(msg)
}

fn wrong_route(dispatch: &Dispatch) -> RpcFailure {
    RpcFailure::new(
        RpcErrorKind::UnknownMethod,
        format!("unsupported method {} found for this route", dispatch.method),
    )
}

fn to_json(value: impl serde::Serialize) -> Result<Value, RpcFailure> {
    serde_json::to_value(value).map_err(|e| RpcFailure::internal(e.to_string()))
}

/// Negotiate a session key for the sender.
#[utoipa::path(
    post,
    path = "/serverpubkey",
    tag = "Gateway",
    request_body = RpcMessage,
    responses((status = 200, description = "JSON-RPC response carrying the server public key and expiry", body = RpcMessage))
)]
pub async fn server_pubkey(
    State(state): State<AppState>,
    method: Method,
    body: Bytes,
) -> RpcResponse {
    let mut msg = RpcMessage::default();
    let outcome = match decode_request(&method, &body, false, &mut msg) {
        Ok(dispatch) => negotiate_session(&state, &dispatch),
        Err(failure) => Err(failure),
    };
    respond(msg, outcome)
}

fn negotiate_session(state: &AppState, dispatch: &Dispatch) -> Result<Value, RpcFailure> {
    if dispatch.class != MethodClass::SessionKey {
        return Err(wrong_route(dispatch));
    }
    let client_pubkey = dispatch
        .params
        .first()
        .and_then(|p| p.as_str())
        .ok_or_else(|| RpcFailure::bare(RpcErrorKind::MissingParams))?;

    let session = session::negotiate(client_pubkey, Utc::now())
        .map_err(|e| RpcFailure::internal(e.to_string()))?;
    let response = session.response();

    let sender = dispatch.sender_address();
    state
        .sessions
        .insert(sender, session.shared_key, session.expiry);
    tracing::info!(%sender, expiry = response.expiry, "session key issued");

    to_json(response)
}

/// Execute a contract or local method on behalf of the sender.
#[utoipa::path(
    post,
    path = "/backend",
    tag = "Gateway",
    request_body = RpcMessage,
    responses((status = 200, description = "JSON-RPC response", body = RpcMessage))
)]
pub async fn backend(State(state): State<AppState>, method: Method, body: Bytes) -> RpcResponse {
    let mut msg = RpcMessage::default();
    let outcome = match decode_request(&method, &body, true, &mut msg) {
        Ok(dispatch) => execute(&state, dispatch).await,
        Err(failure) => Err(failure),
    };
    respond(msg, outcome)
}

async fn execute(state: &AppState, dispatch: Dispatch) -> Result<Value, RpcFailure> {
    if !matches!(dispatch.class, MethodClass::Contract | MethodClass::Local) {
        return Err(wrong_route(&dispatch));
    }

    let sender = dispatch.sender_address();
    let shared_key = state.sessions.get(sender).map_err(|lookup| match lookup {
        SessionLookup::Missing => RpcFailure::new(
            RpcErrorKind::ServerKeyExpired,
            "no server keys found associated with the sender",
        ),
        SessionLookup::Expired => RpcFailure::bare(RpcErrorKind::ServerKeyExpired),
    })?;

    let signing_key =
        session::decrypt_signing_key(&shared_key, &dispatch.sender.signing_key, sender)
            .map_err(|e| RpcFailure::new(RpcErrorKind::InvalidSigningKey, e.to_string()))?;

    tracing::info!(%sender, method = dispatch.method, "executing rpc method");

    match dispatch.class {
        MethodClass::Contract => {
            let request = methods::contract_request(dispatch.method, &dispatch.params)
                .ok_or_else(|| {
                    RpcFailure::internal(format!(
                        "missing implementation for method {}",
                        dispatch.method
                    ))
                })?;
            let bond_chat = &state.bond_chat;
            match request {
                ContractRequest::Transact(call) => {
                    let opts = bond_chat.transport().transactor(sender, signing_key);
                    let tx_hash = bond_chat
                        .transact(&opts, &call)
                        .await
                        .map_err(|e| RpcFailure::internal(e.to_string()))?;
                    Ok(json!({ "tx_hash": tx_hash.to_string() }))
                }
                ContractRequest::SecureDetails { bond } => {
                    let details = bond_chat
                        .secure_details(sender, &signing_key, bond)
                        .await
                        .map_err(|e| RpcFailure::internal(e.to_string()))?;
                    to_json(details)
                }
            }
        }
        _ => query_local(state, &dispatch, sender),
    }
}

fn query_local(state: &AppState, dispatch: &Dispatch, sender: Address) -> Result<Value, RpcFailure> {
    let db_failure = |e: crate::storage::DbError| RpcFailure::internal(e.to_string());
    let bond_param = || {
        methods::address_param(&dispatch.params, 0)
            .ok_or_else(|| RpcFailure::bare(RpcErrorKind::UnknownParam))
    };

    match dispatch.method {
        "getBonds" => to_json(state.db.get_bonds(sender).map_err(db_failure)?),
        "getBondByAddress" => to_json(
            state
                .db
                .get_bond_by_address(bond_param()?, sender)
                .map_err(db_failure)?,
        ),
        "getChats" => to_json(
            state
                .db
                .get_chats(bond_param()?, sender)
                .map_err(db_failure)?,
        ),
        other => Err(RpcFailure::internal(format!(
            "missing implementation for method {other}"
        ))),
    }
}
