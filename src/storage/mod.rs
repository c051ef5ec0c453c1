// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Local state of the gateway:
//!
//! - a redb database projecting bond-chat contract events into bonds, status
//!   signatures and chat history, plus the synchronizer checkpoints;
//! - an in-memory cache of per-sender session keys.
//!
//! ## Storage Layout
//!
//! ```text
//! {DATA_DIR}/
//!   bonds.redb       # events, projections, sync state
//! ```

pub mod bond_database;
pub mod records;
pub mod session_cache;

pub use bond_database::{BondDatabase, DbError, DbResult};
pub use records::{
    BondDetails, BondRecord, BondStatusRecord, BondSummary, ChatEntry, ChatRecord, EventKind,
    EventRecord, StatusSignatures, Topic,
};
pub use session_cache::{SessionCache, SessionLookup};

/// Database file name under the data directory.
pub const DATABASE_FILE: &str = "bonds.redb";
