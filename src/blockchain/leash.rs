// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Leash-bound signed call data.
//!
//! A signed query proves the caller controls `from` without exposing it in
//! plaintext. The leash pins the signature to a recent block so the runtime
//! rejects it once the chain head leaves `[block_number, block_number + range]`.
//!
//! The digest is the EIP-712 hash of
//!
//! ```text
//! Call(address from,address to,uint64 gasLimit,uint256 gasPrice,uint256 value,bytes data,Leash leash)
//! Leash(uint64 nonce,uint64 blockNumber,bytes32 blockHash,uint64 blockRange)
//! ```
//!
//! under the domain `oasis-runtime-sdk/evm: signed query` version `1.0.0`.

use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::{Eip712Domain, SolStruct};
use serde::{Deserialize, Serialize};

use super::backend::BlockHeader;
use super::cipher::{CipherError, SessionCipher};
use super::envelope::{to_cbor, CborBytes, Data, WireEnvelope};
use super::signing::{SignerFn, SigningError};

/// Blocks after the leash block during which a signed call stays valid.
pub const DEFAULT_BLOCK_RANGE: u64 = 15;

const SIGNED_QUERY_DOMAIN: &str = "oasis-runtime-sdk/evm: signed query";
const SIGNED_QUERY_VERSION: &str = "1.0.0";

mod typed {
    alloy::sol! {
        struct Leash {
            uint64 nonce;
            uint64 blockNumber;
            bytes32 blockHash;
            uint64 blockRange;
        }

        struct Call {
            address from;
            address to;
            uint64 gasLimit;
            uint256 gasPrice;
            uint256 value;
            bytes data;
            Leash leash;
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("signing call data failed: {0}")]
    Signing(#[from] SigningError),
}

// =============================================================================
// Leash
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leash {
    /// Nonce of the leash block header.
    pub nonce: u64,
    pub block_number: u64,
    pub block_hash: B256,
    pub block_range: u64,
}

impl Leash {
    pub fn new(nonce: u64, block_number: u64, block_hash: B256, block_range: u64) -> Self {
        Self {
            nonce,
            block_number,
            block_hash,
            block_range,
        }
    }

    pub fn from_header(header: &BlockHeader, block_range: u64) -> Self {
        Self::new(header.nonce, header.number, header.hash, block_range)
    }

    /// Whether a runtime at `head` accepts calls bound to this leash.
    pub fn is_valid_at(&self, head: u64) -> bool {
        head >= self.block_number && head - self.block_number <= self.block_range
    }

    fn typed(&self) -> typed::Leash {
        typed::Leash {
            nonce: self.nonce,
            blockNumber: self.block_number,
            blockHash: self.block_hash,
            blockRange: self.block_range,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireLeash {
    pub nonce: u64,
    pub block_number: u64,
    pub block_hash: CborBytes,
    pub block_range: u64,
}

impl From<&Leash> for WireLeash {
    fn from(leash: &Leash) -> Self {
        Self {
            nonce: leash.nonce,
            block_number: leash.block_number,
            block_hash: leash.block_hash.as_slice().into(),
            block_range: leash.block_range,
        }
    }
}

impl TryFrom<&WireLeash> for Leash {
    type Error = CipherError;

    fn try_from(wire: &WireLeash) -> Result<Self, Self::Error> {
        if wire.block_hash.0.len() != 32 {
            return Err(CipherError::CallResultDecode);
        }
        Ok(Leash::new(
            wire.nonce,
            wire.block_number,
            B256::from_slice(&wire.block_hash.0),
            wire.block_range,
        ))
    }
}

// =============================================================================
// Signed call data
// =============================================================================

/// Plain call fields covered by the signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFields {
    pub chain_id: u64,
    pub from: Address,
    pub to: Address,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub value: U256,
    pub data: Bytes,
}

impl CallFields {
    fn domain(&self) -> Eip712Domain {
        Eip712Domain::new(
            Some(SIGNED_QUERY_DOMAIN.into()),
            Some(SIGNED_QUERY_VERSION.into()),
            Some(U256::from(self.chain_id)),
            None,
            None,
        )
    }

    /// EIP-712 digest of these fields bound to `leash`.
    pub fn signing_hash(&self, leash: &Leash) -> B256 {
        let call = typed::Call {
            from: self.from,
            to: self.to,
            gasLimit: self.gas_limit,
            gasPrice: self.gas_price,
            value: self.value,
            data: self.data.clone(),
            leash: leash.typed(),
        };
        call.eip712_signing_hash(&self.domain())
    }
}

#[derive(Debug, Clone)]
pub struct SignedCallData {
    pub fields: CallFields,
    pub leash: Leash,
    pub signature: Vec<u8>,
}

/// Data slot of a packed call: sealed when there is calldata, plain otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PackData {
    Sealed(WireEnvelope),
    Plain(Data),
}

/// Wire form of a signed call: leash and signature travel beside the sealed data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedCallPack {
    pub data: PackData,
    pub leash: WireLeash,
    pub signature: CborBytes,
}

impl SignedCallData {
    /// Sign `fields` bound to `leash` with `signer`.
    pub fn pack(
        signer: &SignerFn,
        private_key: &[u8],
        fields: CallFields,
        leash: Leash,
    ) -> Result<Self, PackError> {
        let digest = fields.signing_hash(&leash);
        let signature = signer(digest, private_key)?;
        Ok(Self {
            fields,
            leash,
            signature,
        })
    }

    pub fn signing_hash(&self) -> B256 {
        self.fields.signing_hash(&self.leash)
    }

    /// Seal the call data and produce the transport-ready blob.
    pub fn encrypt_encode(&self, cipher: &SessionCipher) -> Result<Vec<u8>, CipherError> {
        let data = match cipher.wrap_outbound(&self.fields.data)? {
            Some(envelope) => PackData::Sealed(envelope.to_wire()),
            None => PackData::Plain(Data {
                body: CborBytes::default(),
            }),
        };
        to_cbor(&SignedCallPack {
            data,
            leash: WireLeash::from(&self.leash),
            signature: self.signature.clone().into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, b256};
    use std::sync::Arc;

    use super::*;
    use crate::blockchain::cipher::KeyPair;
    use crate::blockchain::envelope::{from_cbor, Envelope};
    use crate::blockchain::signing::{address_of, local_signer_fn, parse_signature};

    const KEY: [u8; 32] = [0x07; 32];

    fn fields() -> CallFields {
        CallFields {
            chain_id: 0x5aff,
            from: address_of(&KEY).unwrap(),
            to: address!("22bB522c7356A8a6EAbd8ebd2B48d690FcB01787"),
            gas_limit: 30_000_000,
            gas_price: U256::from(100_000_000_000u64),
            value: U256::ZERO,
            data: Bytes::from_static(&[0xde, 0xad, 0xbe, 0xef]),
        }
    }

    fn leash() -> Leash {
        Leash::new(
            9,
            1_000,
            b256!("00000000000000000000000000000000000000000000000000000000000000aa"),
            DEFAULT_BLOCK_RANGE,
        )
    }

    #[test]
    fn leash_window_is_inclusive() {
        let l = leash();
        assert!(!l.is_valid_at(999));
        assert!(l.is_valid_at(1_000));
        assert!(l.is_valid_at(1_015));
        assert!(!l.is_valid_at(1_016));
    }

    #[test]
    fn digest_is_deterministic_and_leash_bound() {
        let f = fields();
        assert_eq!(f.signing_hash(&leash()), f.signing_hash(&leash()));

        let mut other = leash();
        other.block_number += 1;
        assert_ne!(f.signing_hash(&leash()), f.signing_hash(&other));

        let mut other_chain = fields();
        other_chain.chain_id = 0x5afe;
        assert_ne!(f.signing_hash(&leash()), other_chain.signing_hash(&leash()));
    }

    #[test]
    fn pack_signature_recovers_sender() {
        let packed = SignedCallData::pack(&local_signer_fn(), &KEY, fields(), leash()).unwrap();
        let sig = parse_signature(&packed.signature).unwrap();
        let who = sig
            .recover_address_from_prehash(&packed.signing_hash())
            .unwrap();
        assert_eq!(who, packed.fields.from);
    }

    #[test]
    fn pack_surfaces_signer_failure() {
        let failing: SignerFn = Arc::new(|_, _| Err(SigningError::Sign("hsm offline".into())));
        let err = SignedCallData::pack(&failing, &KEY, fields(), leash()).unwrap_err();
        assert!(matches!(err, PackError::Signing(_)));
    }

    #[test]
    fn encrypt_encode_keeps_leash_in_clear_and_seals_data() {
        let runtime = KeyPair::generate();
        let cipher = SessionCipher::establish(&runtime.public_bytes()).unwrap();
        let packed = SignedCallData::pack(&local_signer_fn(), &KEY, fields(), leash()).unwrap();

        let blob = packed.encrypt_encode(&cipher).unwrap();
        let decoded: SignedCallPack = from_cbor(&blob).unwrap();
        assert_eq!(Leash::try_from(&decoded.leash).unwrap(), leash());
        assert_eq!(decoded.signature.0, packed.signature);

        let PackData::Sealed(wire) = decoded.data else {
            panic!("calldata should be sealed");
        };
        let envelope = Envelope::from_wire(wire).unwrap();
        let server = SessionCipher::from_keypair(runtime, &envelope.pk.unwrap()).unwrap();
        assert_eq!(server.open_outbound(&envelope).unwrap(), fields().data.to_vec());
    }
}
