// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session cipher for the confidential runtime.
//!
//! ## Scheme
//!
//! - Key agreement: X25519 between a fresh local keypair and the runtime's
//!   published calldata public key.
//! - Key derivation: HMAC-SHA512/256 keyed with a fixed domain label over the
//!   raw shared secret.
//! - AEAD: **XChaCha20-Poly1305** with a 24-byte random nonce and empty
//!   associated data.
//!
//! The local secret and the derived key are wiped when the cipher is dropped.
//! One cipher is created per process run and shared read-only behind an `Arc`.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha512_256;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::envelope::{
    from_cbor, to_cbor, AeadEnvelope, CallFormat, CallResult, CborBytes, Data, Envelope,
    InnerResult,
};

/// XChaCha20-Poly1305 nonce length.
pub const NONCE_SIZE: usize = 24;

/// X25519 point and scalar length.
pub const KEY_SIZE: usize = 32;

const KDF_LABEL: &[u8] = b"dhamana/x25519-xchacha20poly1305/v1";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("key exchange failed: {0}")]
    KeyExchange(String),

    #[error("encryption failed")]
    Encrypt,

    #[error("envelope authentication failed")]
    Decrypt,

    #[error("CBOR encoding failed: {0}")]
    Encode(String),

    #[error("call failed in module {module} with code {code}")]
    CallFailed {
        module: String,
        code: u64,
        message: String,
    },

    #[error("{0}")]
    CallReverted(String),

    #[error("could not decode call result")]
    CallResultDecode,
}

// =============================================================================
// KeyPair
// =============================================================================

/// Ephemeral X25519 keypair.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a keypair from the OS random source.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    pub fn public_bytes(&self) -> [u8; KEY_SIZE] {
        self.public.to_bytes()
    }
}

// =============================================================================
// SessionCipher
// =============================================================================

pub struct SessionCipher {
    aead: XChaCha20Poly1305,
    keypair: KeyPair,
}

impl SessionCipher {
    /// Run the key exchange against the runtime public key with a fresh keypair.
    pub fn establish(runtime_public_key: &[u8]) -> Result<Self, CipherError> {
        Self::from_keypair(KeyPair::generate(), runtime_public_key)
    }

    /// Run the key exchange with a caller supplied keypair.
    pub fn from_keypair(keypair: KeyPair, peer_public_key: &[u8]) -> Result<Self, CipherError> {
        let peer: [u8; KEY_SIZE] = peer_public_key.try_into().map_err(|_| {
            CipherError::KeyExchange(format!(
                "peer public key must be {KEY_SIZE} bytes, got {}",
                peer_public_key.len()
            ))
        })?;

        let shared = keypair.secret.diffie_hellman(&PublicKey::from(peer));
        if !shared.was_contributory() {
            return Err(CipherError::KeyExchange(
                "peer public key is a low-order point".to_string(),
            ));
        }

        let key = derive_symmetric_key(shared.as_bytes())?;
        let aead = XChaCha20Poly1305::new(Key::from_slice(key.as_slice()));

        Ok(Self { aead, keypair })
    }

    pub fn kind(&self) -> CallFormat {
        CallFormat::X25519Aead
    }

    /// Local public key, sent alongside every sealed call.
    pub fn public_key(&self) -> [u8; KEY_SIZE] {
        self.keypair.public_bytes()
    }

    /// Seal `plaintext` under a fresh random nonce.
    ///
    /// # Panics
    ///
    /// Panics when the OS random source is unavailable. Continuing without a
    /// fresh nonce would risk nonce reuse under the session key.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_SIZE]), CipherError> {
        let mut nonce = [0u8; NONCE_SIZE];
        if let Err(e) = OsRng.try_fill_bytes(&mut nonce) {
            panic!("OS random source is unavailable: {e}");
        }

        let ciphertext = self
            .aead
            .encrypt(
                XNonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &[],
                },
            )
            .map_err(|_| CipherError::Encrypt)?;

        Ok((ciphertext, nonce))
    }

    /// Open a sealed box. Never returns partial plaintext.
    pub fn decrypt(&self, nonce: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        if nonce.len() != NONCE_SIZE {
            return Err(CipherError::Decrypt);
        }
        self.aead
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: &[],
                },
            )
            .map_err(|_| CipherError::Decrypt)
    }

    /// Frame and seal outbound call data.
    ///
    /// Returns `None` for empty data: plain value transfers carry nothing
    /// confidential and are sent as-is.
    pub fn wrap_outbound(&self, plaintext: &[u8]) -> Result<Option<Envelope>, CipherError> {
        if plaintext.is_empty() {
            return Ok(None);
        }

        let framed = Zeroizing::new(to_cbor(&Data {
            body: CborBytes::from(plaintext),
        })?);
        let (ciphertext, nonce) = self.encrypt(&framed)?;

        Ok(Some(Envelope {
            format: self.kind(),
            nonce: nonce.to_vec(),
            ciphertext,
            pk: Some(self.public_key()),
        }))
    }

    /// Wire form of [`wrap_outbound`](Self::wrap_outbound). Empty data stays empty.
    pub fn encrypt_encode(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        match self.wrap_outbound(plaintext)? {
            Some(envelope) => envelope.to_cbor(),
            None => Ok(Vec::new()),
        }
    }

    /// Decode, decrypt and unwrap a runtime response.
    pub fn unwrap_result(&self, response: &[u8]) -> Result<Vec<u8>, CipherError> {
        let envelope = match CallResult::decode(response)? {
            CallResult::Failure(fail) => {
                return Err(CipherError::CallFailed {
                    module: fail.module,
                    code: fail.code,
                    message: fail.message,
                })
            }
            CallResult::Ok(bytes) => match from_cbor::<AeadEnvelope>(&bytes) {
                Some(envelope) => envelope,
                // Not sealed: the runtime answered in plaintext.
                None => return Ok(bytes),
            },
            CallResult::Unknown(envelope) => envelope,
        };

        let plaintext = self.decrypt(&envelope.nonce.0, &envelope.data.0)?;
        match InnerResult::decode(&plaintext)? {
            InnerResult::Ok(bytes) => Ok(bytes),
            InnerResult::Failure(fail) => Err(CipherError::CallReverted(fail.describe())),
        }
    }
}

/// Runtime side of the exchange. Tests use it to stand in for the runtime.
#[cfg(test)]
impl SessionCipher {
    /// Open the inbound framing of a sealed call data envelope.
    pub fn open_outbound(&self, envelope: &Envelope) -> Result<Vec<u8>, CipherError> {
        let framed = Zeroizing::new(self.decrypt(&envelope.nonce, &envelope.ciphertext)?);
        let data: Data = from_cbor(&framed).ok_or(CipherError::CallResultDecode)?;
        Ok(data.body.0)
    }

    /// Seal a response payload into an [`AeadEnvelope`].
    pub fn seal_result(&self, inner: &InnerResult) -> Result<AeadEnvelope, CipherError> {
        let (ciphertext, nonce) = self.encrypt(&inner.encode()?)?;
        Ok(AeadEnvelope {
            nonce: nonce.to_vec().into(),
            data: ciphertext.into(),
        })
    }
}

impl std::fmt::Debug for SessionCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCipher")
            .field("kind", &self.kind())
            .field("public_key", &alloy::hex::encode(self.public_key()))
            .finish_non_exhaustive()
    }
}

fn derive_symmetric_key(shared: &[u8; KEY_SIZE]) -> Result<Zeroizing<[u8; KEY_SIZE]>, CipherError> {
    let mut mac = <Hmac<Sha512_256> as Mac>::new_from_slice(KDF_LABEL)
        .map_err(|e| CipherError::KeyExchange(e.to_string()))?;
    mac.update(shared);
    let digest = mac.finalize().into_bytes();

    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    key.copy_from_slice(&digest);
    Ok(key)
}
