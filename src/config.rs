// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup and validated
//! before anything connects to the chain.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `NETWORK` | Sapphire network (`mainnet`, `testnet`, `localnet`) | `testnet` |
//! | `DATA_DIR` | Directory holding the bond database | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `30443` |
//! | `RPC_URL` | Web3 gateway override | Network default |
//! | `CONTRACT_ADDRESS` | Bond-chat contract override | Recorded deployment |
//! | `DEPLOYMENT_BLOCK` | First block to synchronize from | Recorded deployment |
//! | `TLS_CERT_FILE` | PEM certificate; enables HTTPS with `TLS_KEY_FILE` | Unset |
//! | `TLS_KEY_FILE` | PEM private key | Unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use alloy::primitives::Address;

use crate::blockchain::types::{deployment_for, network_by_name, DeploymentError, NetworkConfig};

pub const NETWORK_ENV: &str = "NETWORK";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const CONTRACT_ADDRESS_ENV: &str = "CONTRACT_ADDRESS";
pub const DEPLOYMENT_BLOCK_ENV: &str = "DEPLOYMENT_BLOCK";
pub const TLS_CERT_FILE_ENV: &str = "TLS_CERT_FILE";
pub const TLS_KEY_FILE_ENV: &str = "TLS_KEY_FILE";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_NETWORK: &str = "testnet";
pub const DEFAULT_DATA_DIR: &str = "/data";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 30443;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported network used: {0:?}")]
    UnknownNetwork(String),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("{0} must be set: no deployment is recorded for this network")]
    Missing(&'static str),

    #[error("{0} and {1} must be set together")]
    Incomplete(&'static str, &'static str),

    #[error(transparent)]
    Deployment(#[from] DeploymentError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Validated gateway configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub rpc_url: Option<String>,
    pub contract: Address,
    pub deployment_block: u64,
    pub tls: Option<TlsFiles>,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let network_name = var(NETWORK_ENV).unwrap_or_else(|| DEFAULT_NETWORK.to_string());
        let network =
            network_by_name(&network_name).ok_or(ConfigError::UnknownNetwork(network_name))?;

        let recorded = deployment_for(&network);
        if let Some(deployment) = &recorded {
            deployment.validate(&network)?;
        }

        let contract = match var(CONTRACT_ADDRESS_ENV) {
            Some(raw) => parse::<Address>(CONTRACT_ADDRESS_ENV, &raw)?,
            None => recorded
                .map(|d| d.contract)
                .ok_or(ConfigError::Missing(CONTRACT_ADDRESS_ENV))?,
        };
        if contract.is_zero() {
            return Err(ConfigError::Invalid {
                var: CONTRACT_ADDRESS_ENV,
                reason: "zero address".into(),
            });
        }

        let deployment_block = match var(DEPLOYMENT_BLOCK_ENV) {
            Some(raw) => parse::<u64>(DEPLOYMENT_BLOCK_ENV, &raw)?,
            None => recorded
                .map(|d| d.block)
                .ok_or(ConfigError::Missing(DEPLOYMENT_BLOCK_ENV))?,
        };

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var(PORT_ENV) {
            Some(raw) => parse::<u16>(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };
        let bind_addr = parse::<SocketAddr>(HOST_ENV, &format!("{host}:{port}"))?;

        let tls = match (var(TLS_CERT_FILE_ENV), var(TLS_KEY_FILE_ENV)) {
            (Some(cert), Some(key)) => Some(TlsFiles {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => return Err(ConfigError::Incomplete(TLS_CERT_FILE_ENV, TLS_KEY_FILE_ENV)),
        };

        let log_format = match var(LOG_FORMAT_ENV).as_deref().map(str::trim) {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: LOG_FORMAT_ENV,
                    reason: format!("expected json or pretty, found {other:?}"),
                })
            }
        };

        Ok(Self {
            network,
            data_dir: var(DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            bind_addr,
            rpc_url: var(RPC_URL_ENV),
            contract,
            deployment_block,
            tls,
            log_format,
        })
    }
}

fn parse<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}
