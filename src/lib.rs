// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Dhamana Gateway - Confidential Bond Negotiation Backend
//!
//! Off-chain gateway for the Dhamana bond-chat contract on Oasis Sapphire.
//! Clients talk JSON-RPC to the gateway; the gateway signs and seals their
//! calls for the confidential runtime and serves a local projection of the
//! contract's events.
//!
//! ## Modules
//!
//! - `api` - JSON-RPC routes, request validation and session keys (Axum)
//! - `blockchain` - Sapphire calldata sealing, signed queries and transport
//! - `indexer` - Contract event synchronizer
//! - `storage` - Bond database (redb) and session key cache

pub mod api;
pub mod blockchain;
pub mod config;
pub mod error;
pub mod indexer;
pub mod state;
pub mod storage;
