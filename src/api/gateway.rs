// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request validation shared by every RPC route.
//!
//! [`decode_request`] runs the checks in a fixed order and stops at the first
//! failure, so a request missing both a sender and a method reports the
//! missing method.

use alloy::primitives::Address;
use axum::http::Method;

use super::methods::{self, MethodClass, Param};
use super::rpc::{RpcMessage, SenderInfo, JSONRPC_VERSION};
use crate::error::{RpcErrorKind, RpcFailure};

/// A validated request, ready for its route handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub method: &'static str,
    pub class: MethodClass,
    pub sender: SenderInfo,
    pub params: Vec<Param>,
}

impl Dispatch {
    pub fn sender_address(&self) -> Address {
        self.sender.address
    }
}

/// Validate an incoming request.
///
/// `msg` receives whatever could be decoded (so the response echoes the
/// request id) and has its request-only fields stripped on success.
pub fn decode_request(
    http_method: &Method,
    body: &[u8],
    require_signer: bool,
    msg: &mut RpcMessage,
) -> Result<Dispatch, RpcFailure> {
    if *http_method != Method::POST {
        return Err(RpcFailure::new(
            RpcErrorKind::InvalidRequest,
            format!("invalid http method {http_method} found expected POST"),
        ));
    }

    *msg = serde_json::from_slice(body)
        .map_err(|e| RpcFailure::new(RpcErrorKind::ParseError, e.to_string()))?;

    if msg.version != JSONRPC_VERSION {
        return Err(RpcFailure::new(
            RpcErrorKind::InvalidRequest,
            format!(
                "expected JSON-RPC version {JSONRPC_VERSION} but found {}",
                msg.version
            ),
        ));
    }

    if msg.method.is_empty() {
        return Err(RpcFailure::new(
            RpcErrorKind::MethodMissing,
            "expected a method to be provided",
        ));
    }

    let sender = match msg.sender.take() {
        Some(sender) if sender.address != Address::ZERO => sender,
        _ => {
            return Err(RpcFailure::new(
                RpcErrorKind::SenderMissing,
                "expected sender address to be provided",
            ))
        }
    };

    if require_signer && sender.signing_key.is_empty() {
        return Err(RpcFailure::new(
            RpcErrorKind::SignerKeyMissing,
            "expected sender signer key to be provided",
        ));
    }

    let descriptor = methods::lookup(&msg.method).ok_or_else(|| {
        RpcFailure::new(
            RpcErrorKind::UnknownMethod,
            format!("method {} not supported", msg.method),
        )
    })?;

    if descriptor.params.len() != msg.params.len() {
        return Err(RpcFailure::new(
            RpcErrorKind::MissingParams,
            format!(
                "method {} requires {} params found {} params",
                descriptor.name,
                descriptor.params.len(),
                msg.params.len()
            ),
        ));
    }

    let params = msg
        .params
        .iter()
        .zip(descriptor.params)
        .map(|(value, ty)| methods::cast_param(value, *ty))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|detail| RpcFailure::new(RpcErrorKind::UnknownParam, detail))?;

    msg.method.clear();
    msg.params.clear();

    Ok(Dispatch {
        method: descriptor.name,
        class: descriptor.class,
        sender,
        params,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const SENDER: &str = "0x22bB522c7356A8a6EAbd8ebd2B48d690FcB01787";
    const CLIENT_PUBKEY: &str =
        "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    fn body(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    fn decode(
        value: serde_json::Value,
        require_signer: bool,
    ) -> (RpcMessage, Result<Dispatch, RpcFailure>) {
        let mut msg = RpcMessage::default();
        let result = decode_request(&Method::POST, &body(value), require_signer, &mut msg);
        (msg, result)
    }

    fn code_of(result: Result<Dispatch, RpcFailure>) -> (u16, Option<String>) {
        let failure = result.unwrap_err();
        (failure.kind.code(), failure.detail)
    }

    #[test]
    fn server_pubkey_request_is_session_key_class() {
        let (msg, result) = decode(
            json!({
                "id": 3,
                "jsonrpc": "2.0",
                "method": "getServerPubKey",
                "sender": {"address": SENDER},
                "params": [CLIENT_PUBKEY]
            }),
            false,
        );
        let dispatch = result.unwrap();
        assert_eq!(dispatch.class, MethodClass::SessionKey);
        assert_eq!(dispatch.method, "getServerPubKey");
        assert_eq!(dispatch.params, vec![Param::String(CLIENT_PUBKEY.into())]);
        assert_eq!(dispatch.sender_address().to_checksum(None), SENDER);

        // Request-only fields are gone; the id survives for the response.
        assert_eq!(msg.id, 3);
        assert!(msg.method.is_empty());
        assert!(msg.sender.is_none());
        assert!(msg.params.is_empty());
    }

    #[test]
    fn non_post_is_rejected_before_decoding() {
        let mut msg = RpcMessage::default();
        let result = decode_request(&Method::GET, b"not json", false, &mut msg);
        assert_eq!(
            code_of(result),
            (1001, Some("invalid http method GET found expected POST".into()))
        );
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let mut msg = RpcMessage::default();
        let result = decode_request(&Method::POST, b"{\"id\":", false, &mut msg);
        assert_eq!(code_of(result).0, 1000);
    }

    #[test]
    fn wrong_version_is_invalid_request() {
        let (_, result) = decode(
            json!({"id": 1, "jsonrpc": "1.0", "method": "getBonds", "sender": {"address": SENDER}}),
            false,
        );
        assert_eq!(
            code_of(result),
            (1001, Some("expected JSON-RPC version 2.0 but found 1.0".into()))
        );
    }

    #[test]
    fn method_is_checked_before_sender() {
        let (_, result) = decode(json!({"id": 1, "jsonrpc": "2.0"}), false);
        assert_eq!(code_of(result).0, 1003);
    }

    #[test]
    fn zero_sender_is_missing() {
        let (_, result) = decode(
            json!({
                "id": 1,
                "jsonrpc": "2.0",
                "method": "getServerPubKey",
                "sender": {"address": "0x0000000000000000000000000000000000000000"},
                "params": [CLIENT_PUBKEY]
            }),
            false,
        );
        assert_eq!(code_of(result).0, 1004);

        let (_, result) = decode(
            json!({"id": 1, "jsonrpc": "2.0", "method": "getBonds"}),
            false,
        );
        assert_eq!(code_of(result).0, 1004);
    }

    #[test]
    fn signer_key_required_only_when_asked() {
        let request = json!({
            "id": 1,
            "jsonrpc": "2.0",
            "method": "getBonds",
            "sender": {"address": SENDER}
        });
        assert_eq!(code_of(decode(request.clone(), true).1).0, 1006);
        assert!(decode(request, false).1.is_ok());
    }

    #[test]
    fn unknown_method_names_the_method() {
        let (_, result) = decode(
            json!({
                "id": 1,
                "jsonrpc": "2.0",
                "method": "dropTables",
                "sender": {"address": SENDER, "signingkey": "00"}
            }),
            true,
        );
        assert_eq!(
            code_of(result),
            (1008, Some("method dropTables not supported".into()))
        );
    }

    #[test]
    fn create_bond_and_sign_is_not_exposed() {
        let (msg, result) = decode(
            json!({
                "id": 12,
                "jsonrpc": "2.0",
                "method": "createBondAndSign",
                "sender": {"address": SENDER, "signingkey": "00"},
                "params": [SENDER]
            }),
            true,
        );
        let (code, detail) = code_of(result);
        assert_eq!(code, 1008);
        assert_eq!(detail.as_deref(), Some("method createBondAndSign not supported"));
        assert!(detail.unwrap().contains("createBondAndSign"));
        assert_eq!(msg.id, 12);
    }

    #[test]
    fn arity_mismatch_reports_counts() {
        let (_, result) = decode(
            json!({
                "id": 1,
                "jsonrpc": "2.0",
                "method": "getServerPubKey",
                "sender": {"address": SENDER},
                "params": [CLIENT_PUBKEY, "extra"]
            }),
            false,
        );
        assert_eq!(
            code_of(result),
            (
                1007,
                Some("method getServerPubKey requires 1 params found 2 params".into())
            )
        );
    }

    #[test]
    fn param_type_mismatch_is_unknown_param() {
        let (_, result) = decode(
            json!({
                "id": 1,
                "jsonrpc": "2.0",
                "method": "updateBondStatus",
                "sender": {"address": SENDER, "signingkey": "00"},
                "params": [SENDER, 300]
            }),
            true,
        );
        assert_eq!(
            code_of(result),
            (1009, Some("expected a max value of 255 but found 300".into()))
        );
    }
}
