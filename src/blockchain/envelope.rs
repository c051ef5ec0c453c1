// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! CBOR wire types exchanged with the confidential runtime.
//!
//! ## Outbound
//!
//! ```text
//! { "body": { "pk": bytes, "nonce": bytes, "data": bytes }, "format": 1 }
//! ```
//!
//! where `data` seals the CBOR framing `{ "body": <calldata> }`.
//!
//! ## Inbound
//!
//! The runtime answers with a `CallResult` map holding exactly one of
//! `fail`, `ok` or `unknown`. The sealed payload opens to an inner result
//! holding `ok` or `fail`.

use std::fmt;

use serde::de::{self, DeserializeOwned, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::cipher::CipherError;

// =============================================================================
// Byte strings
// =============================================================================

/// Byte vector that serializes as a CBOR byte string instead of an array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CborBytes(pub Vec<u8>);

impl From<Vec<u8>> for CborBytes {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for CborBytes {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl Serialize for CborBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.0)
    }
}

impl<'de> Deserialize<'de> for CborBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BytesVisitor;

        impl<'de> Visitor<'de> for BytesVisitor {
            type Value = CborBytes;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a byte string")
            }

            fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
                Ok(CborBytes(v.to_vec()))
            }

            fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
                Ok(CborBytes(v))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(b) = seq.next_element::<u8>()? {
                    out.push(b);
                }
                Ok(CborBytes(out))
            }
        }

        deserializer.deserialize_bytes(BytesVisitor)
    }
}

// =============================================================================
// Codec helpers
// =============================================================================

pub(crate) fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, CipherError> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).map_err(|e| CipherError::Encode(e.to_string()))?;
    Ok(out)
}

pub(crate) fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Option<T> {
    ciborium::de::from_reader(bytes).ok()
}

// =============================================================================
// Outbound framing
// =============================================================================

/// Envelope format tag carried on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallFormat {
    Plain,
    X25519Aead,
}

impl CallFormat {
    pub fn as_u64(self) -> u64 {
        match self {
            CallFormat::Plain => 0,
            CallFormat::X25519Aead => 1,
        }
    }

    pub fn from_u64(value: u64) -> Option<Self> {
        match value {
            0 => Some(CallFormat::Plain),
            1 => Some(CallFormat::X25519Aead),
            _ => None,
        }
    }
}

/// Plaintext framing sealed inside every outbound envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    pub body: CborBytes,
}

/// Sealed outbound call payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub format: CallFormat,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    /// Caller's ephemeral public key so the runtime can rederive the session key.
    pub pk: Option<[u8; 32]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireBody {
    pub pk: CborBytes,
    pub nonce: CborBytes,
    pub data: CborBytes,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireEnvelope {
    pub body: WireBody,
    pub format: u64,
}

impl Envelope {
    pub fn to_wire(&self) -> WireEnvelope {
        WireEnvelope {
            body: WireBody {
                pk: self.pk.map(|pk| pk.to_vec()).unwrap_or_default().into(),
                nonce: self.nonce.clone().into(),
                data: self.ciphertext.clone().into(),
            },
            format: self.format.as_u64(),
        }
    }

    pub fn from_wire(wire: WireEnvelope) -> Option<Self> {
        let format = CallFormat::from_u64(wire.format)?;
        let pk = match wire.body.pk.0.len() {
            0 => None,
            32 => {
                let mut pk = [0u8; 32];
                pk.copy_from_slice(&wire.body.pk.0);
                Some(pk)
            }
            _ => return None,
        };
        Some(Self {
            format,
            nonce: wire.body.nonce.0,
            ciphertext: wire.body.data.0,
            pk,
        })
    }

    /// CBOR encoding placed in a call's data field.
    pub fn to_cbor(&self) -> Result<Vec<u8>, CipherError> {
        to_cbor(&self.to_wire())
    }

    pub fn from_cbor(bytes: &[u8]) -> Option<Self> {
        from_cbor::<WireEnvelope>(bytes).and_then(Self::from_wire)
    }
}

/// True when `data` already carries a sealed envelope and must not be sealed again.
pub fn is_sealed(data: &[u8]) -> bool {
    !data.is_empty() && Envelope::from_cbor(data).is_some()
}

// =============================================================================
// Inbound results
// =============================================================================

/// Module-level failure reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub module: String,
    pub code: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl Failure {
    /// Human readable description, synthesized from module and code when the
    /// runtime omits a message.
    pub fn describe(&self) -> String {
        if self.message.is_empty() {
            format!(
                "call failed in module {} with code {}",
                self.module, self.code
            )
        } else {
            self.message.clone()
        }
    }
}

/// Sealed response payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AeadEnvelope {
    pub nonce: CborBytes,
    pub data: CborBytes,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct RawCallResult {
    #[serde(default, alias = "failure", skip_serializing_if = "Option::is_none")]
    pub fail: Option<Failure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<CborBytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown: Option<AeadEnvelope>,
}

/// Outer runtime response. Exactly one arm is ever populated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallResult {
    Failure(Failure),
    Ok(Vec<u8>),
    Unknown(AeadEnvelope),
}

impl TryFrom<RawCallResult> for CallResult {
    type Error = CipherError;

    fn try_from(raw: RawCallResult) -> Result<Self, Self::Error> {
        if let Some(fail) = raw.fail {
            return Ok(CallResult::Failure(fail));
        }
        if let Some(ok) = raw.ok {
            return Ok(CallResult::Ok(ok.0));
        }
        if let Some(unknown) = raw.unknown {
            return Ok(CallResult::Unknown(unknown));
        }
        Err(CipherError::CallResultDecode)
    }
}

impl CallResult {
    pub fn decode(bytes: &[u8]) -> Result<Self, CipherError> {
        from_cbor::<RawCallResult>(bytes)
            .ok_or(CipherError::CallResultDecode)?
            .try_into()
    }

    pub fn encode(&self) -> Result<Vec<u8>, CipherError> {
        let raw = match self {
            CallResult::Failure(f) => RawCallResult {
                fail: Some(f.clone()),
                ..Default::default()
            },
            CallResult::Ok(bytes) => RawCallResult {
                ok: Some(bytes.clone().into()),
                ..Default::default()
            },
            CallResult::Unknown(env) => RawCallResult {
                unknown: Some(env.clone()),
                ..Default::default()
            },
        };
        to_cbor(&raw)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct RawInnerResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<CborBytes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<Failure>,
}

/// Decrypted second-layer result: the actual contract outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InnerResult {
    Ok(Vec<u8>),
    Failure(Failure),
}

impl InnerResult {
    pub fn decode(bytes: &[u8]) -> Result<Self, CipherError> {
        let raw: RawInnerResult = from_cbor(bytes).ok_or(CipherError::CallResultDecode)?;
        match (raw.ok, raw.fail) {
            (Some(ok), _) => Ok(InnerResult::Ok(ok.0)),
            (None, Some(fail)) => Ok(InnerResult::Failure(fail)),
            (None, None) => Err(CipherError::CallResultDecode),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CipherError> {
        let raw = match self {
            InnerResult::Ok(bytes) => RawInnerResult {
                ok: Some(bytes.clone().into()),
                fail: None,
            },
            InnerResult::Failure(f) => RawInnerResult {
                ok: None,
                fail: Some(f.clone()),
            },
        };
        to_cbor(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cbor_bytes_encode_as_byte_string() {
        let encoded = to_cbor(&CborBytes(vec![1, 2, 3])).unwrap();
        // major type 2 (byte string), length 3
        assert_eq!(encoded, vec![0x43, 1, 2, 3]);
    }

    #[test]
    fn envelope_wire_layout() {
        let env = Envelope {
            format: CallFormat::X25519Aead,
            nonce: vec![7; 24],
            ciphertext: vec![9; 40],
            pk: Some([1; 32]),
        };
        let bytes = env.to_cbor().unwrap();
        let value: ciborium::Value = ciborium::de::from_reader(bytes.as_slice()).unwrap();
        let map = value.as_map().unwrap();
        let keys: Vec<_> = map.iter().filter_map(|(k, _)| k.as_text()).collect();
        assert_eq!(keys, vec!["body", "format"]);

        assert_eq!(Envelope::from_cbor(&bytes), Some(env));
        assert!(is_sealed(&bytes));
        assert!(!is_sealed(b"\xa9\x05\x9c\xbb"));
        assert!(!is_sealed(&[]));
    }

    #[test]
    fn call_result_picks_single_arm() {
        let fail = CallResult::Failure(Failure {
            module: "evm".into(),
            code: 8,
            message: String::new(),
        });
        assert_eq!(CallResult::decode(&fail.encode().unwrap()).unwrap(), fail);

        let ok = CallResult::Ok(vec![1, 2]);
        assert_eq!(CallResult::decode(&ok.encode().unwrap()).unwrap(), ok);

        let empty = to_cbor(&RawCallResult::default()).unwrap();
        assert!(matches!(
            CallResult::decode(&empty),
            Err(CipherError::CallResultDecode)
        ));
    }

    #[test]
    fn legacy_failure_key_is_accepted() {
        #[derive(Serialize)]
        struct Legacy {
            failure: Failure,
        }
        let bytes = to_cbor(&Legacy {
            failure: Failure {
                module: "core".into(),
                code: 3,
                message: "out of gas".into(),
            },
        })
        .unwrap();
        match CallResult::decode(&bytes).unwrap() {
            CallResult::Failure(f) => assert_eq!(f.describe(), "out of gas"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn failure_message_is_synthesized_when_empty() {
        let f = Failure {
            module: "evm".into(),
            code: 2,
            message: String::new(),
        };
        assert_eq!(f.describe(), "call failed in module evm with code 2");
    }

    #[test]
    fn inner_result_without_arms_is_rejected() {
        let bytes = to_cbor(&RawInnerResult::default()).unwrap();
        assert!(matches!(
            InnerResult::decode(&bytes),
            Err(CipherError::CallResultDecode)
        ));
    }
}
