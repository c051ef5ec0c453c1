// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Oasis Sapphire integration.
//!
//! This module provides functionality for:
//! - Sealing calldata for the confidential runtime (`cipher`, `envelope`)
//! - Leash-bound signed queries (`leash`, `signing`)
//! - A chain capability trait with an alloy-backed client (`backend`, `client`)
//! - The confidential transport and bond-chat bindings (`wrapped`, `contract`)

pub mod backend;
pub mod cipher;
pub mod client;
pub mod contract;
pub mod envelope;
pub mod leash;
pub mod signing;
pub mod types;
pub mod wrapped;

pub use backend::{BlockHeader, CallMsg, ChainBackend, ChainLog, LogQuery, LogSubscription};
pub use cipher::{CipherError, SessionCipher};
pub use client::{ClientError, SapphireClient};
pub use contract::{BondChat, BondChatCall, SecureDetails};
pub use types::*;
pub use wrapped::{ConfidentialBackend, TransactOpts, TransportError};
