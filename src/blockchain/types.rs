// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sapphire network parameters and bond-chat contract deployments.

use alloy::primitives::{address, b256, Address, B256};

/// Sapphire network configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Short network identifier (`mainnet`, `testnet`, `localnet`)
    pub name: &'static str,
    /// Chain ID
    pub chain_id: u64,
    /// Default web3 gateway URL
    pub rpc_url: &'static str,
}

/// Sapphire Mainnet configuration.
pub const SAPPHIRE_MAINNET: NetworkConfig = NetworkConfig {
    name: "mainnet",
    chain_id: 0x5afe,
    rpc_url: "https://sapphire.oasis.io",
};

/// Sapphire Testnet configuration.
pub const SAPPHIRE_TESTNET: NetworkConfig = NetworkConfig {
    name: "testnet",
    chain_id: 0x5aff,
    rpc_url: "https://testnet.sapphire.oasis.dev",
};

/// Local sapphire-dev node.
pub const SAPPHIRE_LOCALNET: NetworkConfig = NetworkConfig {
    name: "localnet",
    chain_id: 0x5afd,
    rpc_url: "http://localhost:8545",
};

/// Resolve a network by name.
pub fn network_by_name(raw: &str) -> Option<NetworkConfig> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "mainnet" => Some(SAPPHIRE_MAINNET),
        "testnet" => Some(SAPPHIRE_TESTNET),
        "localnet" => Some(SAPPHIRE_LOCALNET),
        _ => None,
    }
}

/// Recorded deployment of the bond-chat contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deployment {
    pub network: &'static str,
    pub chain_id: u64,
    pub contract: Address,
    pub tx_hash: B256,
    /// Unix timestamp of the deployment transaction
    pub deployed_at: i64,
    /// First block that can hold contract logs
    pub block: u64,
}

pub const TESTNET_DEPLOYMENT: Deployment = Deployment {
    network: "testnet",
    chain_id: 23295,
    contract: address!("22bB522c7356A8a6EAbd8ebd2B48d690FcB01787"),
    tx_hash: b256!("ea8794eed416a9759d2cf646f139de2b3fbd0d25586dd9a76cbf02a20d5c906c"),
    deployed_at: 1_692_704_415,
    block: 2_310_736,
};

pub const LOCALNET_DEPLOYMENT: Deployment = Deployment {
    network: "localnet",
    chain_id: 23293,
    contract: address!("48C85A77897508D5c8976EFa56EeaA93e4226bE5"),
    tx_hash: b256!("93416c146f80f07584eebe1d4c28bac1fa9e3ea7f2634d27be315ae7ce2001dd"),
    deployed_at: 1_692_566_525,
    block: 1,
};

/// Deployment record for a network. Mainnet has none yet.
pub fn deployment_for(network: &NetworkConfig) -> Option<Deployment> {
    match network.name {
        "testnet" => Some(TESTNET_DEPLOYMENT),
        "localnet" => Some(LOCALNET_DEPLOYMENT),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DeploymentError {
    #[error("no contract deployment recorded for network {0}")]
    NotDeployed(String),

    #[error("deployment chain id {deployment} does not match network chain id {network}")]
    ChainIdMismatch { deployment: u64, network: u64 },

    #[error("deployment record is incomplete: {0}")]
    Incomplete(&'static str),
}

impl Deployment {
    /// Check the record is complete and belongs to `network`.
    pub fn validate(&self, network: &NetworkConfig) -> Result<(), DeploymentError> {
        if self.network != network.name {
            return Err(DeploymentError::NotDeployed(network.name.to_string()));
        }
        if self.chain_id != network.chain_id {
            return Err(DeploymentError::ChainIdMismatch {
                deployment: self.chain_id,
                network: network.chain_id,
            });
        }
        if self.contract.is_zero() {
            return Err(DeploymentError::Incomplete("contract address"));
        }
        if self.tx_hash.is_zero() {
            return Err(DeploymentError::Incomplete("transaction hash"));
        }
        if self.deployed_at == 0 {
            return Err(DeploymentError::Incomplete("deployment time"));
        }
        if self.block == 0 {
            return Err(DeploymentError::Incomplete("block number"));
        }
        Ok(())
    }
}
