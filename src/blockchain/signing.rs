// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! secp256k1 signing for signed queries and transactions.
//!
//! Signing is injected as a [`SignerFn`] so the transport never holds key
//! material beyond the call it signs.

use std::sync::Arc;

use alloy::{
    primitives::{Address, Signature, B256},
    signers::{local::PrivateKeySigner, SignerSync},
};

/// Produces a 65-byte RSV signature over `digest` with `private_key`.
pub type SignerFn = Arc<dyn Fn(B256, &[u8]) -> Result<Vec<u8>, SigningError> + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("invalid private key")]
    InvalidPrivateKey,

    #[error("signing failed: {0}")]
    Sign(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),
}

/// Build a signer from raw private key bytes.
///
/// The underlying error is dropped so key bytes never end up in a message.
pub fn signer_from_bytes(private_key: &[u8]) -> Result<PrivateKeySigner, SigningError> {
    PrivateKeySigner::from_slice(private_key).map_err(|_| SigningError::InvalidPrivateKey)
}

/// Address controlled by `private_key`.
pub fn address_of(private_key: &[u8]) -> Result<Address, SigningError> {
    Ok(signer_from_bytes(private_key)?.address())
}

/// Default [`SignerFn`] backed by alloy's local signer.
pub fn local_signer_fn() -> SignerFn {
    Arc::new(|digest: B256, private_key: &[u8]| {
        let signer = signer_from_bytes(private_key)?;
        let signature = signer
            .sign_hash_sync(&digest)
            .map_err(|e| SigningError::Sign(e.to_string()))?;
        Ok(signature.as_bytes().to_vec())
    })
}

/// Parse an RSV signature produced by a [`SignerFn`].
pub fn parse_signature(raw: &[u8]) -> Result<Signature, SigningError> {
    Signature::from_raw(raw).map_err(|e| SigningError::MalformedSignature(e.to_string()))
}
