// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JSON-RPC error codes returned by the gateway.

use serde::Serialize;
use utoipa::ToSchema;

/// Gateway failure classes with stable wire codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorKind {
    ParseError,
    InvalidRequest,
    Internal,
    MethodMissing,
    SenderMissing,
    ServerKeyExpired,
    SignerKeyMissing,
    MissingParams,
    UnknownMethod,
    UnknownParam,
    InvalidSigningKey,
    Unmapped,
}

impl RpcErrorKind {
    pub fn code(&self) -> u16 {
        match self {
            RpcErrorKind::ParseError => 1000,
            RpcErrorKind::InvalidRequest => 1001,
            RpcErrorKind::Internal => 1002,
            RpcErrorKind::MethodMissing => 1003,
            RpcErrorKind::SenderMissing => 1004,
            RpcErrorKind::ServerKeyExpired => 1005,
            RpcErrorKind::SignerKeyMissing => 1006,
            RpcErrorKind::MissingParams => 1007,
            RpcErrorKind::UnknownMethod => 1008,
            RpcErrorKind::UnknownParam => 1009,
            RpcErrorKind::InvalidSigningKey => 1010,
            RpcErrorKind::Unmapped => u16::MAX,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            RpcErrorKind::ParseError => "parse error",
            RpcErrorKind::InvalidRequest => "invalid request",
            RpcErrorKind::Internal => "internal error",
            RpcErrorKind::MethodMissing => "method missing",
            RpcErrorKind::SenderMissing => "sender address missing",
            RpcErrorKind::ServerKeyExpired => "server key expired",
            RpcErrorKind::SignerKeyMissing => "signer key missing",
            RpcErrorKind::MissingParams => "missing params",
            RpcErrorKind::UnknownMethod => "unknown method",
            RpcErrorKind::UnknownParam => "unknown params",
            RpcErrorKind::InvalidSigningKey => "invalid signing key",
            RpcErrorKind::Unmapped => "unknown error",
        }
    }
}

/// A failed request: its class plus optional detail for the `data` field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} ({})", .kind.message(), .kind.code())]
pub struct RpcFailure {
    pub kind: RpcErrorKind,
    pub detail: Option<String>,
}

impl RpcFailure {
    pub fn new(kind: RpcErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
        }
    }

    pub fn bare(kind: RpcErrorKind) -> Self {
        Self { kind, detail: None }
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(RpcErrorKind::Internal, detail)
    }
}

/// Wire form of an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize, ToSchema)]
pub struct RpcError {
    pub code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl From<RpcFailure> for RpcError {
    fn from(failure: RpcFailure) -> Self {
        Self {
            code: failure.kind.code(),
            message: failure.kind.message().to_string(),
            data: failure.detail,
        }
    }
}
