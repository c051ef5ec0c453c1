// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Oasis Sapphire JSON-RPC client.

use alloy::{
    consensus::BlockHeader as _,
    eips::{BlockId, BlockNumberOrTag},
    network::{Ethereum, TransactionBuilder},
    primitives::{Address, Bytes, B256},
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::{Filter, TransactionRequest},
};
use async_trait::async_trait;
use serde::Deserialize;

use super::backend::{BlockHeader, CallMsg, ChainBackend, ChainLog, LogQuery};
use super::types::NetworkConfig;

/// HTTP provider type for Sapphire (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// Sapphire ParaTime client.
pub struct SapphireClient {
    /// Network configuration
    network: NetworkConfig,
    rpc_url: url::Url,
    /// Alloy HTTP provider
    provider: HttpProvider,
}

impl SapphireClient {
    /// Create a new client for the specified network.
    ///
    /// `rpc_url` overrides the network's default gateway.
    pub fn new(network: NetworkConfig, rpc_url: Option<&str>) -> Result<Self, ClientError> {
        let raw = rpc_url.unwrap_or(network.rpc_url);
        let url: url::Url = raw
            .parse()
            .map_err(|e: url::ParseError| ClientError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url.clone());

        Ok(Self {
            network,
            rpc_url: url,
            provider,
        })
    }

    /// Get the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Fetch the runtime's calldata public key from this client's gateway.
    pub async fn runtime_public_key(&self) -> Result<[u8; 32], ClientError> {
        fetch_runtime_public_key(&reqwest::Client::new(), self.rpc_url.as_str()).await
    }
}

#[async_trait]
impl ChainBackend for SapphireClient {
    async fn chain_id(&self) -> Result<u64, ClientError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))
    }

    async fn block_number(&self) -> Result<u64, ClientError> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))
    }

    async fn header_by_number(&self, number: Option<u64>) -> Result<BlockHeader, ClientError> {
        let tag = number.map_or(BlockNumberOrTag::Latest, BlockNumberOrTag::Number);
        let block = self
            .provider
            .get_block_by_number(tag)
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))?
            .ok_or(ClientError::HeaderNotFound(number.unwrap_or_default()))?;

        let header = &block.header;
        Ok(BlockHeader {
            number: header.number(),
            hash: header.hash,
            nonce: header
                .nonce()
                .map(|n| u64::from_be_bytes(n.0))
                .unwrap_or_default(),
        })
    }

    async fn call_contract(
        &self,
        call: &CallMsg,
        block: Option<u64>,
    ) -> Result<Bytes, ClientError> {
        let block = block.map_or(BlockId::latest(), BlockId::number);
        self.provider
            .call(to_request(call))
            .block(block)
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))
    }

    async fn estimate_gas(&self, call: &CallMsg) -> Result<u64, ClientError> {
        self.provider
            .estimate_gas(to_request(call))
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))
    }

    async fn pending_nonce_at(&self, account: Address) -> Result<u64, ClientError> {
        self.provider
            .get_transaction_count(account)
            .pending()
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, ClientError> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(|e| ClientError::TransactionFailed(e.to_string()))?;
        Ok(*pending.tx_hash())
    }

    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<ChainLog>, ClientError> {
        let mut filter = Filter::new()
            .address(query.address)
            .event_signature(query.topic0)
            .from_block(query.from_block);
        if let Some(to) = query.to_block {
            filter = filter.to_block(to);
        }

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| ClientError::Rpc(e.to_string()))?;

        // Pending logs have no provenance yet and are picked up once mined.
        Ok(logs
            .into_iter()
            .filter_map(|log| {
                Some(ChainLog {
                    address: log.address(),
                    topics: log.topics().to_vec(),
                    data: log.data().data.clone(),
                    block_number: log.block_number?,
                    tx_hash: log.transaction_hash?,
                    log_index: log.log_index?,
                })
            })
            .collect())
    }
}

fn to_request(call: &CallMsg) -> TransactionRequest {
    let mut request = TransactionRequest::default()
        .with_to(call.to)
        .with_value(call.value)
        .with_input(call.data.clone());
    if !call.from.is_zero() {
        request = request.with_from(call.from);
    }
    if !call.gas_price.is_zero() {
        request = request.with_gas_price(call.gas_price.saturating_to::<u128>());
    }
    request
}

// =============================================================================
// Runtime public key discovery
// =============================================================================

#[derive(Deserialize)]
struct RpcEnvelope<T> {
    result: Option<T>,
    error: Option<RpcFault>,
}

#[derive(Deserialize)]
struct RpcFault {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct CallDataPublicKey {
    /// Hex encoded X25519 public key.
    key: String,
}

/// Query `oasis_callDataPublicKey` on a Sapphire gateway.
pub async fn fetch_runtime_public_key(
    http: &reqwest::Client,
    gateway: &str,
) -> Result<[u8; 32], ClientError> {
    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "oasis_callDataPublicKey",
        "params": [],
        "id": 1,
    });

    let response: RpcEnvelope<CallDataPublicKey> = http
        .post(gateway)
        .json(&request)
        .send()
        .await
        .map_err(|e| ClientError::Rpc(format!("runtime public key request failed: {e}")))?
        .json()
        .await
        .map_err(|e| ClientError::InvalidRuntimeKey(format!("unexpected response: {e}")))?;

    if let Some(fault) = response.error {
        return Err(ClientError::Rpc(format!(
            "runtime public key request rejected ({}): {}",
            fault.code, fault.message
        )));
    }

    let result = response
        .result
        .ok_or_else(|| ClientError::InvalidRuntimeKey("missing result".to_string()))?;
    parse_runtime_key(&result.key)
}

fn parse_runtime_key(hex_key: &str) -> Result<[u8; 32], ClientError> {
    let bytes = alloy::hex::decode(hex_key)
        .map_err(|e| ClientError::InvalidRuntimeKey(e.to_string()))?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| ClientError::InvalidRuntimeKey("invalid public key length".to_string()))
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Block header {0} not found")]
    HeaderNotFound(u64),

    #[error("Invalid runtime public key: {0}")]
    InvalidRuntimeKey(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::types::SAPPHIRE_LOCALNET;

    #[test]
    fn runtime_key_must_be_32_bytes() {
        let good = format!("0x{}", "ab".repeat(32));
        assert_eq!(parse_runtime_key(&good).unwrap(), [0xab; 32]);
        assert!(parse_runtime_key("0xabcd").is_err());
        assert!(parse_runtime_key("zz").is_err());
    }

    #[test]
    fn rpc_url_override_is_validated() {
        assert!(SapphireClient::new(SAPPHIRE_LOCALNET, None).is_ok());
        assert!(SapphireClient::new(SAPPHIRE_LOCALNET, Some("http://127.0.0.1:9545")).is_ok());
        assert!(matches!(
            SapphireClient::new(SAPPHIRE_LOCALNET, Some("not a url")),
            Err(ClientError::InvalidRpcUrl(_))
        ));
    }

    #[test]
    fn call_request_omits_zero_sender() {
        let anonymous = to_request(&CallMsg::default());
        assert!(anonymous.from.is_none());

        let signed = to_request(&CallMsg {
            from: Address::repeat_byte(1),
            ..Default::default()
        });
        assert_eq!(signed.from, Some(Address::repeat_byte(1)));
    }
}
