// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC 2.0 envelope shared by requests and responses.

use alloy::primitives::Address;
use axum::{
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{RpcError, RpcFailure};

pub const JSONRPC_VERSION: &str = "2.0";

/// Sent on every response.
pub const HSTS_VALUE: &str = "max-age=63072000; includeSubDomains";

/// Identity of the caller attached to every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SenderInfo {
    #[serde(default)]
    #[schema(value_type = String, example = "0x22bB522c7356A8a6EAbd8ebd2B48d690FcB01787")]
    pub address: Address,
    /// Hex `nonce || AES-256-GCM ciphertext` of the sender's secp256k1 key,
    /// sealed under the session key from `getServerPubKey`.
    #[serde(default, rename = "signingkey", skip_serializing_if = "String::is_empty")]
    pub signing_key: String,
}

/// Request and response envelope.
///
/// `method`, `sender` and `params` exist only on requests and are stripped
/// before the message is echoed back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RpcMessage {
    #[serde(default)]
    pub id: u16,
    #[serde(default, rename = "jsonrpc")]
    pub version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<SenderInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    #[schema(value_type = Vec<Object>)]
    pub params: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcMessage {
    fn strip_request_fields(&mut self) {
        self.method.clear();
        self.sender = None;
        self.params.clear();
    }

    /// Turn the message into an error response.
    pub fn pack_error(&mut self, failure: RpcFailure) {
        self.strip_request_fields();
        self.result = None;
        self.error = Some(failure.into());
    }

    /// Turn the message into a success response. Empty results become `{}`.
    pub fn pack_result(&mut self, result: serde_json::Value) {
        self.strip_request_fields();
        self.error = None;
        self.result = Some(match result {
            serde_json::Value::Null => serde_json::json!({}),
            serde_json::Value::Array(items) if items.is_empty() => serde_json::json!({}),
            other => other,
        });
    }
}

/// HTTP response carrying an [`RpcMessage`]. Always status 200.
pub struct RpcResponse(pub RpcMessage);

impl IntoResponse for RpcResponse {
    fn into_response(self) -> Response {
        (
            [(header::STRICT_TRANSPORT_SECURITY, HSTS_VALUE)],
            Json(self.0),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    use super::*;
    use crate::error::RpcErrorKind;

    fn request() -> RpcMessage {
        serde_json::from_str(
            r#"{"id":7,"jsonrpc":"2.0","method":"getBonds",
                "sender":{"address":"0x22bB522c7356A8a6EAbd8ebd2B48d690FcB01787","signingkey":"abcd"},
                "params":[1,"x"]}"#,
        )
        .unwrap()
    }

    #[test]
    fn pack_error_strips_request_fields() {
        let mut msg = request();
        msg.pack_error(RpcFailure::new(RpcErrorKind::UnknownMethod, "method x not supported"));

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "jsonrpc": "2.0",
                "error": {"code": 1008, "message": "unknown method", "data": "method x not supported"}
            })
        );
    }

    #[test]
    fn pack_result_replaces_empty_with_object() {
        let mut msg = request();
        msg.pack_result(serde_json::Value::Array(vec![]));
        assert_eq!(msg.result, Some(serde_json::json!({})));
        assert!(msg.sender.is_none());
        assert!(msg.params.is_empty());

        msg.pack_result(serde_json::json!({"tx_hash": "0x01"}));
        assert_eq!(msg.result, Some(serde_json::json!({"tx_hash": "0x01"})));
    }

    #[tokio::test]
    async fn response_is_json_with_hsts() {
        let mut msg = request();
        msg.pack_result(serde_json::json!([1]));
        let response = RpcResponse(msg).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(response.headers()[header::STRICT_TRANSPORT_SECURITY], HSTS_VALUE);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(
            String::from_utf8(body.to_vec()).unwrap(),
            r#"{"id":7,"jsonrpc":"2.0","result":[1]}"#
        );
    }
}
