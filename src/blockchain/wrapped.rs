// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Confidential transport over any [`ChainBackend`].
//!
//! Outbound calldata is sealed with the session cipher before it leaves the
//! process. Queries from a non-zero sender are additionally signed and bound
//! to a recent block (see [`leash`](super::leash)). Transactions are signed
//! as legacy transactions after their input has been sealed.

use std::sync::Arc;

use alloy::consensus::{SignableTransaction, Signed, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::primitives::{Address, Bytes, TxKind, B256, U256};
use tokio_util::sync::CancellationToken;
use zeroize::Zeroizing;

use super::backend::{CallMsg, ChainBackend};
use super::cipher::{CipherError, SessionCipher};
use super::client::ClientError;
use super::envelope::is_sealed;
use super::leash::{CallFields, Leash, PackError, SignedCallData, DEFAULT_BLOCK_RANGE};
use super::signing::{parse_signature, SignerFn, SigningError};

/// 100 gwei.
pub const DEFAULT_GAS_PRICE: u128 = 100_000_000_000;

pub const DEFAULT_GAS_LIMIT: u64 = 30_000_000;

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to query chain id: {0}")]
    ChainId(#[source] ClientError),

    #[error("failed to fetch latest header: {0}")]
    LatestHeader(#[source] ClientError),

    #[error("failed to fetch leash header: {0}")]
    LeashHeader(#[source] ClientError),

    #[error("no block precedes block {0} to bind a signed call to")]
    NoLeashBlock(u64),

    #[error("failed to pack signed call: {0}")]
    Pack(#[from] PackError),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error("contract call failed: {0}")]
    Call(#[source] ClientError),

    #[error("failed to fetch pending nonce: {0}")]
    Nonce(#[source] ClientError),

    #[error("failed to broadcast transaction: {0}")]
    Broadcast(#[source] ClientError),

    #[error("not authorized to sign for {requested}, transactor is {configured}")]
    NotAuthorized {
        requested: Address,
        configured: Address,
    },

    #[error("signed call from {0} requires a signing key")]
    MissingSigningKey(Address),

    #[error("transaction signing failed: {0}")]
    Signing(#[from] SigningError),

    #[error("could not decode return data: {0}")]
    AbiDecode(String),

    #[error("call cancelled")]
    Cancelled,
}

// =============================================================================
// Transact options
// =============================================================================

pub type TxSignerFn =
    Arc<dyn Fn(Address, TxLegacy) -> Result<Signed<TxLegacy>, TransportError> + Send + Sync>;

/// Authorization to submit transactions for one account.
#[derive(Clone)]
pub struct TransactOpts {
    pub from: Address,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub signer: TxSignerFn,
}

impl std::fmt::Debug for TransactOpts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactOpts")
            .field("from", &self.from)
            .field("gas_price", &self.gas_price)
            .field("gas_limit", &self.gas_limit)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// ConfidentialBackend
// =============================================================================

#[derive(Clone)]
pub struct ConfidentialBackend {
    inner: Arc<dyn ChainBackend>,
    cipher: Arc<SessionCipher>,
    chain_id: u64,
    signer: SignerFn,
}

impl ConfidentialBackend {
    pub fn new(
        inner: Arc<dyn ChainBackend>,
        cipher: Arc<SessionCipher>,
        chain_id: u64,
        signer: SignerFn,
    ) -> Self {
        Self {
            inner,
            cipher,
            chain_id,
            signer,
        }
    }

    /// Query the chain id and establish a session with the runtime key.
    pub async fn wrap(
        inner: Arc<dyn ChainBackend>,
        runtime_public_key: &[u8],
        signer: SignerFn,
    ) -> Result<Self, TransportError> {
        let chain_id = inner.chain_id().await.map_err(TransportError::ChainId)?;
        let cipher = SessionCipher::establish(runtime_public_key)?;
        tracing::debug!(chain_id, cipher = ?cipher, "confidential transport ready");
        Ok(Self::new(inner, Arc::new(cipher), chain_id, signer))
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn cipher(&self) -> &SessionCipher {
        &self.cipher
    }

    pub fn inner(&self) -> &Arc<dyn ChainBackend> {
        &self.inner
    }

    /// Transaction options for `from`, signing with `signing_key`.
    ///
    /// The returned signer seals transaction input that is not already an
    /// envelope and refuses any account other than `from`.
    pub fn transactor(&self, from: Address, signing_key: Zeroizing<Vec<u8>>) -> TransactOpts {
        let cipher = Arc::clone(&self.cipher);
        let sign = Arc::clone(&self.signer);

        let signer: TxSignerFn = Arc::new(move |requested, mut tx: TxLegacy| {
            if requested != from {
                return Err(TransportError::NotAuthorized {
                    requested,
                    configured: from,
                });
            }
            if !tx.input.is_empty() && !is_sealed(&tx.input) {
                tx.input = cipher.encrypt_encode(&tx.input)?.into();
            }
            let hash = tx.signature_hash();
            let raw = sign(hash, &signing_key)?;
            let signature = parse_signature(&raw)?;
            Ok(tx.into_signed(signature))
        });

        TransactOpts {
            from,
            gas_price: DEFAULT_GAS_PRICE,
            gas_limit: DEFAULT_GAS_LIMIT,
            signer,
        }
    }

    /// Sign and broadcast a call to `to`. Returns the transaction hash.
    pub async fn transact(
        &self,
        opts: &TransactOpts,
        to: Address,
        data: Bytes,
    ) -> Result<B256, TransportError> {
        let nonce = self
            .inner
            .pending_nonce_at(opts.from)
            .await
            .map_err(TransportError::Nonce)?;

        let tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce,
            gas_price: opts.gas_price,
            gas_limit: opts.gas_limit,
            to: TxKind::Call(to),
            value: U256::ZERO,
            input: data,
        };
        let signed = (opts.signer)(opts.from, tx)?;
        let raw = TxEnvelope::from(signed).encoded_2718();

        let hash = self
            .inner
            .send_raw_transaction(&raw)
            .await
            .map_err(TransportError::Broadcast)?;
        tracing::info!(from = %opts.from, to = %to, nonce, tx_hash = %hash, "transaction submitted");
        Ok(hash)
    }

    /// Execute a confidential read-only call.
    ///
    /// A zero `from` sends an anonymous sealed query. Any other sender signs
    /// the call with `signing_key`, bound to the header before `block` (or
    /// before the head when `block` is `None`).
    pub async fn call_contract(
        &self,
        call: &CallMsg,
        block: Option<u64>,
        signing_key: Option<&[u8]>,
    ) -> Result<Bytes, TransportError> {
        let data = if call.from.is_zero() {
            self.cipher.encrypt_encode(&call.data)?
        } else {
            let key = signing_key.ok_or(TransportError::MissingSigningKey(call.from))?;
            let leash = self.leash_for(block).await?;
            let gas_price = if call.gas_price.is_zero() {
                U256::from(DEFAULT_GAS_PRICE)
            } else {
                call.gas_price
            };
            let fields = CallFields {
                chain_id: self.chain_id,
                from: call.from,
                to: call.to,
                gas_limit: DEFAULT_GAS_LIMIT,
                gas_price,
                value: call.value,
                data: call.data.clone(),
            };
            SignedCallData::pack(&self.signer, key, fields, leash)?.encrypt_encode(&self.cipher)?
        };

        let sealed = CallMsg {
            data: data.into(),
            ..call.clone()
        };
        let response = self
            .inner
            .call_contract(&sealed, block)
            .await
            .map_err(TransportError::Call)?;

        Ok(self.cipher.unwrap_result(&response)?.into())
    }

    /// [`call_contract`](Self::call_contract) that gives up when `cancel` fires.
    pub async fn call_contract_cancellable(
        &self,
        call: &CallMsg,
        block: Option<u64>,
        signing_key: Option<&[u8]>,
        cancel: &CancellationToken,
    ) -> Result<Bytes, TransportError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TransportError::Cancelled),
            result = self.call_contract(call, block, signing_key) => result,
        }
    }

    /// Gas is not estimated over sealed calldata; every call gets the default limit.
    pub async fn estimate_gas(&self, _call: &CallMsg) -> Result<u64, TransportError> {
        Ok(DEFAULT_GAS_LIMIT)
    }

    /// Leash bound to the block strictly before `block` (or the head).
    async fn leash_for(&self, block: Option<u64>) -> Result<Leash, TransportError> {
        let context = match block {
            Some(n) => n,
            None => {
                self.inner
                    .header_by_number(None)
                    .await
                    .map_err(TransportError::LatestHeader)?
                    .number
            }
        };
        let number = context
            .checked_sub(1)
            .ok_or(TransportError::NoLeashBlock(context))?;
        let header = self
            .inner
            .header_by_number(Some(number))
            .await
            .map_err(TransportError::LeashHeader)?;
        Ok(Leash::from_header(&header, DEFAULT_BLOCK_RANGE))
    }
}

impl std::fmt::Debug for ConfidentialBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfidentialBackend")
            .field("chain_id", &self.chain_id)
            .field("cipher", &self.cipher)
            .finish_non_exhaustive()
    }
}
