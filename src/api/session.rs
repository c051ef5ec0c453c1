// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-sender session keys.
//!
//! A client sends its secp256k1 public key to `/serverpubkey`; the gateway
//! answers with an ephemeral public key and both sides derive the ECDH shared
//! secret. The client then seals its signing key under that secret with
//! AES-256-GCM and attaches it to every `/backend` request as
//! `hex(nonce || ciphertext)`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use alloy::primitives::{hex, Address};
use chrono::{DateTime, Duration, Utc};
use k256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zeroize::Zeroizing;

use crate::blockchain::signing;

/// Lifetime of a negotiated session.
pub const SESSION_TTL: Duration = Duration::minutes(10);

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("invalid client public key used")]
    InvalidClientKey,

    #[error("signing key is not valid hex")]
    MalformedSigningKey,

    #[error("signing key ciphertext is too short")]
    TruncatedSigningKey,

    #[error("signing key could not be decrypted")]
    Decrypt,

    #[error("decrypted signing key is not a valid secp256k1 key")]
    InvalidSigningKey,

    #[error("signing key belongs to {derived}, not the sender {sender}")]
    SenderMismatch { sender: Address, derived: Address },
}

/// Result of `getServerPubKey`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ServerKeyResponse {
    /// Compressed SEC1 public key of the gateway, hex encoded
    pub pubkey: String,
    /// Unix seconds after which the session must be renegotiated
    pub expiry: i64,
}

/// A freshly negotiated session.
pub struct Session {
    pub shared_key: Zeroizing<[u8; 32]>,
    pub server_pubkey: String,
    pub expiry: DateTime<Utc>,
}

impl Session {
    pub fn response(&self) -> ServerKeyResponse {
        ServerKeyResponse {
            pubkey: self.server_pubkey.clone(),
            expiry: self.expiry.timestamp(),
        }
    }
}

/// Generate an ephemeral server key and derive the shared secret with the
/// client's hex encoded SEC1 public key.
pub fn negotiate(client_pubkey_hex: &str, now: DateTime<Utc>) -> Result<Session, SessionError> {
    let client_bytes =
        hex::decode(client_pubkey_hex.trim()).map_err(|_| SessionError::InvalidClientKey)?;
    let client_pub =
        PublicKey::from_sec1_bytes(&client_bytes).map_err(|_| SessionError::InvalidClientKey)?;

    let server_secret = SecretKey::random(&mut OsRng);
    let shared = k256::ecdh::diffie_hellman(server_secret.to_nonzero_scalar(), client_pub.as_affine());

    let mut shared_key = Zeroizing::new([0u8; 32]);
    shared_key.copy_from_slice(shared.raw_secret_bytes());

    let server_pubkey = hex::encode(server_secret.public_key().to_encoded_point(true).as_bytes());

    Ok(Session {
        shared_key,
        server_pubkey,
        expiry: now + SESSION_TTL,
    })
}

/// Recover the sender's signing key from `hex(nonce || ciphertext)`.
///
/// The key must derive to `sender`.
pub fn decrypt_signing_key(
    shared_key: &[u8; 32],
    sealed_hex: &str,
    sender: Address,
) -> Result<Zeroizing<Vec<u8>>, SessionError> {
    let sealed = hex::decode(sealed_hex.trim()).map_err(|_| SessionError::MalformedSigningKey)?;
    if sealed.len() <= NONCE_LEN {
        return Err(SessionError::TruncatedSigningKey);
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new_from_slice(shared_key).map_err(|_| SessionError::Decrypt)?;
    let key = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| SessionError::Decrypt)?,
    );

    if key.len() != 32 {
        return Err(SessionError::InvalidSigningKey);
    }
    let derived = signing::address_of(&key).map_err(|_| SessionError::InvalidSigningKey)?;
    if derived != sender {
        return Err(SessionError::SenderMismatch { sender, derived });
    }
    Ok(key)
}
