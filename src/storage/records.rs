// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persisted event and projection records.

use alloy::primitives::{Address, B256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Bond status while terms are still being negotiated.
pub const STATUS_NEGOTIATION: u8 = 0;

// =============================================================================
// Topics and events
// =============================================================================

/// Contract log topics followed by the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    BondBodyTerms,
    BondMotivation,
    StatusSigned,
    HolderUpdate,
    NewBondCreated,
    NewChatMessage,
    StatusChange,
    StatusResigned,
}

impl Topic {
    pub const ALL: [Topic; 8] = [
        Topic::BondBodyTerms,
        Topic::BondMotivation,
        Topic::StatusSigned,
        Topic::HolderUpdate,
        Topic::NewBondCreated,
        Topic::NewChatMessage,
        Topic::StatusChange,
        Topic::StatusResigned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::BondBodyTerms => "bond_body_terms",
            Topic::BondMotivation => "bond_motivation",
            Topic::StatusSigned => "status_signed",
            Topic::HolderUpdate => "holder_update",
            Topic::NewBondCreated => "new_bond_created",
            Topic::NewChatMessage => "new_chat_message",
            Topic::StatusChange => "status_change",
            Topic::StatusResigned => "status_resigned",
        }
    }

    /// Stable one-byte tag used in event keys.
    pub(crate) fn tag(&self) -> u8 {
        match self {
            Topic::BondBodyTerms => 1,
            Topic::BondMotivation => 2,
            Topic::StatusSigned => 3,
            Topic::HolderUpdate => 4,
            Topic::NewBondCreated => 5,
            Topic::NewChatMessage => 6,
            Topic::StatusChange => 7,
            Topic::StatusResigned => 8,
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded event fields, one variant per topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    BondCreated {
        sender: Address,
        bond: Address,
        timestamp: u64,
    },
    BodyTerms {
        bond: Address,
        principal: u32,
        coupon_rate: u8,
        coupon_date: u32,
        maturity_date: u32,
        currency: u8,
    },
    Motivation {
        sender: Address,
        bond: Address,
        message: String,
    },
    StatusChanged {
        sender: Address,
        bond: Address,
        status: u8,
    },
    StatusSigned {
        sender: Address,
        bond: Address,
        status: u8,
    },
    StatusResigned {
        sender: Address,
        bond: Address,
        status: u8,
    },
    HolderUpdated {
        bond: Address,
        holder: Address,
    },
    ChatMessage {
        bond: Address,
        sender: Address,
        message: String,
        timestamp: u64,
    },
}

impl EventKind {
    pub fn topic(&self) -> Topic {
        match self {
            EventKind::BondCreated { .. } => Topic::NewBondCreated,
            EventKind::BodyTerms { .. } => Topic::BondBodyTerms,
            EventKind::Motivation { .. } => Topic::BondMotivation,
            EventKind::StatusChanged { .. } => Topic::StatusChange,
            EventKind::StatusSigned { .. } => Topic::StatusSigned,
            EventKind::StatusResigned { .. } => Topic::StatusResigned,
            EventKind::HolderUpdated { .. } => Topic::HolderUpdate,
            EventKind::ChatMessage { .. } => Topic::NewChatMessage,
        }
    }

    /// The bond this event belongs to.
    pub fn bond(&self) -> Address {
        match self {
            EventKind::BondCreated { bond, .. }
            | EventKind::BodyTerms { bond, .. }
            | EventKind::Motivation { bond, .. }
            | EventKind::StatusChanged { bond, .. }
            | EventKind::StatusSigned { bond, .. }
            | EventKind::StatusResigned { bond, .. }
            | EventKind::HolderUpdated { bond, .. }
            | EventKind::ChatMessage { bond, .. } => *bond,
        }
    }
}

/// A contract log with its provenance and decoded fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub contract: Address,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
    pub kind: EventKind,
}

impl EventRecord {
    pub fn topic(&self) -> Topic {
        self.kind.topic()
    }

    /// Position of the log on chain.
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }

    /// Idempotency key: topic | contract | block | log index.
    pub(crate) fn key(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(1 + 20 + 8 + 8);
        key.push(self.topic().tag());
        key.extend_from_slice(self.contract.as_slice());
        key.extend_from_slice(&self.block_number.to_be_bytes());
        key.extend_from_slice(&self.log_index.to_be_bytes());
        key
    }
}

// =============================================================================
// Projections
// =============================================================================

/// Local view of a bond assembled from its events.
///
/// Topics are delivered independently, so any field may arrive before the
/// creation event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondRecord {
    pub bond_address: Address,
    pub issuer: Option<Address>,
    pub holder: Option<Address>,
    pub created_time: Option<DateTime<Utc>>,
    pub tx_hash: Option<B256>,
    pub created_block: Option<u64>,
    pub principal: u32,
    pub coupon_rate: u8,
    pub coupon_date: u32,
    pub maturity_date: u32,
    pub currency: u8,
    pub intro_msg: String,
    pub last_status: u8,
    /// Chain position of the status change that set `last_status`.
    pub status_position: (u64, u64),
    pub last_update: Option<DateTime<Utc>>,
    pub last_update_block: u64,
}

impl BondRecord {
    pub fn new(bond_address: Address) -> Self {
        Self {
            bond_address,
            ..Default::default()
        }
    }

    /// Parties see their bonds; everyone sees bonds still under negotiation.
    pub fn is_visible_to(&self, sender: Address) -> bool {
        self.last_status == STATUS_NEGOTIATION
            || self.issuer == Some(sender)
            || self.holder == Some(sender)
    }
}

/// Addresses that signed one status of a bond, as stored.
///
/// Signers are attributed to the issuer or holder only on read: the bond's
/// parties may not be known yet when a signature event is ingested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSignatures {
    pub bond_address: Address,
    pub status: u8,
    pub signers: Vec<Address>,
    pub resigned: bool,
    pub update_block: u64,
}

impl StatusSignatures {
    pub fn add_signer(&mut self, signer: Address) {
        if !self.signers.contains(&signer) {
            self.signers.push(signer);
        }
    }

    /// Attribute the signers against the bond's current parties.
    pub fn resolve(&self, bond: &BondRecord) -> BondStatusRecord {
        let signed_by = |party: Option<Address>| party.is_some_and(|p| self.signers.contains(&p));
        BondStatusRecord {
            bond_address: self.bond_address,
            status: self.status,
            issuer_signed: signed_by(bond.issuer),
            holder_signed: signed_by(bond.holder),
            resigned: self.resigned,
            update_block: self.update_block,
        }
    }
}

/// Signatures collected for one status of a bond.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondStatusRecord {
    pub bond_address: Address,
    pub status: u8,
    pub issuer_signed: bool,
    pub holder_signed: bool,
    pub resigned: bool,
    pub update_block: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub sender: Address,
    pub bond_address: Address,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub block_number: u64,
}

// =============================================================================
// Query responses
// =============================================================================

/// Bond summary returned by `getBonds`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BondSummary {
    #[schema(value_type = String)]
    pub bond_address: Address,
    #[serde(rename = "issuer_address")]
    #[schema(value_type = Option<String>)]
    pub issuer: Option<Address>,
    pub created_time: Option<DateTime<Utc>>,
    pub coupon_rate: u8,
    pub currency: u8,
    pub last_status: u8,
}

/// Full public bond details returned by `getBondByAddress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BondDetails {
    #[serde(flatten)]
    pub summary: BondSummary,
    #[serde(rename = "holder_address")]
    #[schema(value_type = Option<String>)]
    pub holder: Option<Address>,
    pub created_at_block: Option<u64>,
    pub principal: u32,
    pub coupon_date: u32,
    pub maturity_date: u32,
    #[serde(rename = "intro_msg")]
    pub intro_message: String,
    pub last_update: Option<DateTime<Utc>>,
    pub last_synced_block: u64,
}

/// Chat message returned by `getChats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChatEntry {
    #[schema(value_type = String)]
    pub sender: Address,
    #[schema(value_type = String)]
    pub bond_address: Address,
    #[serde(rename = "chat_msg")]
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub last_synced_block: u64,
}

impl From<&BondRecord> for BondSummary {
    fn from(bond: &BondRecord) -> Self {
        Self {
            bond_address: bond.bond_address,
            issuer: bond.issuer,
            created_time: bond.created_time,
            coupon_rate: bond.coupon_rate,
            currency: bond.currency,
            last_status: bond.last_status,
        }
    }
}

impl BondDetails {
    pub fn from_record(bond: &BondRecord, last_synced_block: u64) -> Self {
        Self {
            summary: BondSummary::from(bond),
            holder: bond.holder,
            created_at_block: bond.created_block,
            principal: bond.principal,
            coupon_date: bond.coupon_date,
            maturity_date: bond.maturity_date,
            intro_message: bond.intro_msg.clone(),
            last_update: bond.last_update,
            last_synced_block,
        }
    }
}
