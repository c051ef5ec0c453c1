// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded bond database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `events`: topic|contract|block|log_index → serialized EventRecord
//! - `bonds`: lowercase bond address → serialized BondRecord
//! - `bond_status`: bond|status → serialized StatusSignatures
//! - `chats`: bond|block|log_index → serialized ChatRecord
//! - `sync_state`: key → value (checkpoint state)

use std::path::Path;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};

use super::records::{
    BondDetails, BondRecord, BondStatusRecord, BondSummary, ChatEntry, ChatRecord, EventKind,
    EventRecord, StatusSignatures, Topic,
};

// =============================================================================
// Table Definitions
// =============================================================================

/// Raw events keyed for idempotent upserts.
const EVENTS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("events");

const BONDS: TableDefinition<&str, &[u8]> = TableDefinition::new("bonds");

/// Key format: `bond(20) | status(1)`.
const BOND_STATUS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("bond_status");

/// Key format: `bond(20) | block_be(8) | log_index_be(8)` for chain-ordered scans.
const CHATS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("chats");

/// Sync state: key → u64 big-endian.
const SYNC_STATE: TableDefinition<&str, &[u8]> = TableDefinition::new("sync_state");

const LAST_SYNCED_BLOCK: &str = "last_synced_block";

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Key Helpers
// =============================================================================

fn bond_key(bond: &Address) -> String {
    bond.to_string().to_lowercase()
}

fn status_key(bond: &Address, status: u8) -> Vec<u8> {
    let mut key = Vec::with_capacity(21);
    key.extend_from_slice(bond.as_slice());
    key.push(status);
    key
}

fn chat_key(bond: &Address, block: u64, log_index: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(36);
    key.extend_from_slice(bond.as_slice());
    key.extend_from_slice(&block.to_be_bytes());
    key.extend_from_slice(&log_index.to_be_bytes());
    key
}

fn chat_prefix_end(bond: &Address) -> Vec<u8> {
    let mut end = Vec::with_capacity(36);
    end.extend_from_slice(bond.as_slice());
    end.extend_from_slice(&[0xFF; 16]);
    end
}

fn topic_key(topic: Topic) -> String {
    format!("topic_{}", topic.as_str())
}

fn decode_u64(raw: &[u8]) -> Option<u64> {
    raw.try_into().ok().map(u64::from_be_bytes)
}

fn unix_to_datetime(secs: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(i64::try_from(secs).ok()?, 0)
}

// =============================================================================
// BondDatabase
// =============================================================================

/// Local projection of bond-chat contract events.
pub struct BondDatabase {
    db: Database,
}

impl BondDatabase {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(EVENTS)?;
            let _ = write_txn.open_table(BONDS)?;
            let _ = write_txn.open_table(BOND_STATUS)?;
            let _ = write_txn.open_table(CHATS)?;
            let _ = write_txn.open_table(SYNC_STATE)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Store an event and project it onto the bond tables.
    ///
    /// Returns `false` when the event was already stored; nothing is written
    /// in that case.
    pub fn upsert_event(&self, event: &EventRecord) -> DbResult<bool> {
        let key = event.key();

        let write_txn = self.db.begin_write()?;
        let exists = {
            let events = write_txn.open_table(EVENTS)?;
            let found = events.get(key.as_slice())?.is_some();
            found
        };
        if exists {
            write_txn.abort()?;
            return Ok(false);
        }
        {
            let mut events = write_txn.open_table(EVENTS)?;
            let json = serde_json::to_vec(event)?;
            events.insert(key.as_slice(), json.as_slice())?;
        }
        project(&write_txn, event)?;
        write_txn.commit()?;
        Ok(true)
    }

    pub fn has_event(&self, event: &EventRecord) -> DbResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS)?;
        Ok(table.get(event.key().as_slice())?.is_some())
    }

    pub fn event_count(&self) -> DbResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS)?;
        Ok(table.len()?)
    }

    // =========================================================================
    // Checkpoints
    // =========================================================================

    /// Last block fully ingested for `topic`.
    pub fn topic_checkpoint(&self, topic: Topic) -> DbResult<Option<u64>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SYNC_STATE)?;
        Ok(table
            .get(topic_key(topic).as_str())?
            .and_then(|v| decode_u64(v.value())))
    }

    /// Last block ingested by every topic.
    pub fn last_synced_block(&self) -> DbResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SYNC_STATE)?;
        Ok(table
            .get(LAST_SYNCED_BLOCK)?
            .and_then(|v| decode_u64(v.value()))
            .unwrap_or(0))
    }

    /// Move `topic`'s checkpoint forward to `block` and recompute the global
    /// checkpoint. Never moves backwards. Returns the global checkpoint.
    ///
    /// The global checkpoint is the lowest topic checkpoint; a topic that has
    /// not ingested anything counts as `start_block`.
    pub fn advance_checkpoint(
        &self,
        topic: Topic,
        block: u64,
        start_block: u64,
    ) -> DbResult<u64> {
        let write_txn = self.db.begin_write()?;
        let global = {
            let mut table = write_txn.open_table(SYNC_STATE)?;

            let key = topic_key(topic);
            let current = table
                .get(key.as_str())?
                .and_then(|v| decode_u64(v.value()))
                .unwrap_or(0);
            if block > current {
                table.insert(key.as_str(), block.to_be_bytes().as_slice())?;
            }

            let mut slowest = u64::MAX;
            for t in Topic::ALL {
                let checkpoint = table
                    .get(topic_key(t).as_str())?
                    .and_then(|v| decode_u64(v.value()))
                    .unwrap_or(start_block);
                slowest = slowest.min(checkpoint);
            }
            let previous = table
                .get(LAST_SYNCED_BLOCK)?
                .and_then(|v| decode_u64(v.value()))
                .unwrap_or(0);
            if slowest > previous {
                table.insert(LAST_SYNCED_BLOCK, slowest.to_be_bytes().as_slice())?;
            }
            slowest.max(previous)
        };
        write_txn.commit()?;
        Ok(global)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Bonds visible to `sender`, most recently updated first.
    pub fn get_bonds(&self, sender: Address) -> DbResult<Vec<BondSummary>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BONDS)?;

        let mut bonds = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            let bond: BondRecord = serde_json::from_slice(value.value())?;
            if bond.is_visible_to(sender) {
                bonds.push(bond);
            }
        }
        bonds.sort_by(|a, b| b.last_update_block.cmp(&a.last_update_block));
        Ok(bonds.iter().map(BondSummary::from).collect())
    }

    /// Public details of `bond` if `sender` may see it.
    pub fn get_bond_by_address(
        &self,
        bond: Address,
        sender: Address,
    ) -> DbResult<Option<BondDetails>> {
        let Some(record) = self.bond_record(bond)? else {
            return Ok(None);
        };
        if !record.is_visible_to(sender) {
            return Ok(None);
        }
        Ok(Some(BondDetails::from_record(
            &record,
            self.last_synced_block()?,
        )))
    }

    /// Chat history of `bond` in chain order if `sender` may see the bond.
    pub fn get_chats(&self, bond: Address, sender: Address) -> DbResult<Vec<ChatEntry>> {
        match self.bond_record(bond)? {
            Some(record) if record.is_visible_to(sender) => {}
            _ => return Ok(Vec::new()),
        }
        let last_synced_block = self.last_synced_block()?;

        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(CHATS)?;
        let start = chat_key(&bond, 0, 0);
        let end = chat_prefix_end(&bond);

        let mut chats = Vec::new();
        for entry in table.range(start.as_slice()..end.as_slice())? {
            let (_, value) = entry?;
            let chat: ChatRecord = serde_json::from_slice(value.value())?;
            chats.push(ChatEntry {
                sender: chat.sender,
                bond_address: chat.bond_address,
                message: chat.message,
                created_at: chat.created_at,
                last_synced_block,
            });
        }
        Ok(chats)
    }

    pub fn bond_record(&self, bond: Address) -> DbResult<Option<BondRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(BONDS)?;
        match table.get(bond_key(&bond).as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Signatures on `status` of `bond`, attributed to the bond's parties as
    /// currently known.
    pub fn bond_status(&self, bond: Address, status: u8) -> DbResult<Option<BondStatusRecord>> {
        let read_txn = self.db.begin_read()?;
        let statuses = read_txn.open_table(BOND_STATUS)?;
        let Some(signatures) =
            load::<StatusSignatures>(statuses.get(status_key(&bond, status).as_slice())?)?
        else {
            return Ok(None);
        };
        let bonds = read_txn.open_table(BONDS)?;
        let record = match bonds.get(bond_key(&bond).as_str())? {
            Some(value) => serde_json::from_slice(value.value())?,
            None => BondRecord::new(bond),
        };
        Ok(Some(signatures.resolve(&record)))
    }
}

// =============================================================================
// Projection
// =============================================================================

fn load<T: serde::de::DeserializeOwned>(
    raw: Option<redb::AccessGuard<'_, &'static [u8]>>,
) -> DbResult<Option<T>> {
    match raw {
        Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
        None => Ok(None),
    }
}

/// Apply `event` to the bond, status and chat tables inside `txn`.
fn project(txn: &WriteTransaction, event: &EventRecord) -> DbResult<()> {
    let bond_addr = event.kind.bond();
    let mut bonds = txn.open_table(BONDS)?;
    let key = bond_key(&bond_addr);
    let mut bond: BondRecord =
        load(bonds.get(key.as_str())?)?.unwrap_or_else(|| BondRecord::new(bond_addr));

    match &event.kind {
        EventKind::BondCreated {
            sender, timestamp, ..
        } => {
            bond.issuer = Some(*sender);
            bond.created_time = unix_to_datetime(*timestamp);
            bond.tx_hash = Some(event.tx_hash);
            bond.created_block = Some(event.block_number);
        }
        EventKind::BodyTerms {
            principal,
            coupon_rate,
            coupon_date,
            maturity_date,
            currency,
            ..
        } => {
            bond.principal = *principal;
            bond.coupon_rate = *coupon_rate;
            bond.coupon_date = *coupon_date;
            bond.maturity_date = *maturity_date;
            bond.currency = *currency;
        }
        EventKind::Motivation { message, .. } => {
            bond.intro_msg = message.clone();
        }
        EventKind::StatusChanged { status, .. } => {
            if event.position() >= bond.status_position {
                bond.last_status = *status;
                bond.status_position = event.position();
            }
            update_status(txn, &bond, *status, event.block_number, |_| {})?;
        }
        EventKind::StatusSigned { sender, status, .. }
        | EventKind::StatusResigned { sender, status, .. } => {
            let resigned = matches!(event.kind, EventKind::StatusResigned { .. });
            update_status(txn, &bond, *status, event.block_number, |record| {
                record.add_signer(*sender);
                record.resigned |= resigned;
            })?;
        }
        EventKind::HolderUpdated { holder, .. } => {
            bond.holder = Some(*holder);
        }
        EventKind::ChatMessage {
            sender,
            message,
            timestamp,
            ..
        } => {
            let chat = ChatRecord {
                sender: *sender,
                bond_address: bond_addr,
                message: message.clone(),
                created_at: unix_to_datetime(*timestamp).unwrap_or_default(),
                block_number: event.block_number,
            };
            let mut chats = txn.open_table(CHATS)?;
            let json = serde_json::to_vec(&chat)?;
            chats.insert(
                chat_key(&bond_addr, event.block_number, event.log_index).as_slice(),
                json.as_slice(),
            )?;
        }
    }

    if event.block_number >= bond.last_update_block {
        bond.last_update_block = event.block_number;
        bond.last_update = Some(Utc::now());
    }
    let json = serde_json::to_vec(&bond)?;
    bonds.insert(key.as_str(), json.as_slice())?;
    Ok(())
}

fn update_status(
    txn: &WriteTransaction,
    bond: &BondRecord,
    status: u8,
    block: u64,
    apply: impl FnOnce(&mut StatusSignatures),
) -> DbResult<()> {
    let mut table = txn.open_table(BOND_STATUS)?;
    let key = status_key(&bond.bond_address, status);
    let mut record: StatusSignatures =
        load(table.get(key.as_slice())?)?.unwrap_or_else(|| StatusSignatures {
            bond_address: bond.bond_address,
            status,
            ..Default::default()
        });
    apply(&mut record);
    record.update_block = record.update_block.max(block);
    let json = serde_json::to_vec(&record)?;
    table.insert(key.as_slice(), json.as_slice())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::B256;

    use super::*;

    fn temp_db() -> (BondDatabase, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = BondDatabase::open(&dir.path().join("bonds.redb")).unwrap();
        (db, dir)
    }

    const CONTRACT: Address = Address::repeat_byte(0xcc);
    const BOND: Address = Address::repeat_byte(0xb0);
    const ISSUER: Address = Address::repeat_byte(0x01);
    const HOLDER: Address = Address::repeat_byte(0x02);
    const STRANGER: Address = Address::repeat_byte(0x03);

    fn event(block: u64, log_index: u64, kind: EventKind) -> EventRecord {
        EventRecord {
            contract: CONTRACT,
            block_number: block,
            tx_hash: B256::repeat_byte(block as u8),
            log_index,
            kind,
        }
    }

    fn created(block: u64) -> EventRecord {
        event(
            block,
            0,
            EventKind::BondCreated {
                sender: ISSUER,
                bond: BOND,
                timestamp: 1_700_000_000,
            },
        )
    }

    fn status(block: u64, log_index: u64, status: u8) -> EventRecord {
        event(
            block,
            log_index,
            EventKind::StatusChanged {
                sender: ISSUER,
                bond: BOND,
                status,
            },
        )
    }

    #[test]
    fn open_creates_db() {
        let (db, _dir) = temp_db();
        assert_eq!(db.event_count().unwrap(), 0);
        assert_eq!(db.last_synced_block().unwrap(), 0);
        assert!(db.topic_checkpoint(Topic::NewBondCreated).unwrap().is_none());
    }

    #[test]
    fn duplicate_event_is_stored_once() {
        let (db, _dir) = temp_db();
        assert!(db.upsert_event(&created(10)).unwrap());
        assert!(!db.upsert_event(&created(10)).unwrap());
        assert_eq!(db.event_count().unwrap(), 1);
        assert!(db.has_event(&created(10)).unwrap());
    }

    #[test]
    fn bond_creation_projects_record() {
        let (db, _dir) = temp_db();
        db.upsert_event(&created(10)).unwrap();

        let bond = db.bond_record(BOND).unwrap().unwrap();
        assert_eq!(bond.issuer, Some(ISSUER));
        assert_eq!(bond.created_block, Some(10));
        assert_eq!(
            bond.created_time.map(|t| t.timestamp()),
            Some(1_700_000_000)
        );
        assert_eq!(bond.last_status, 0);
    }

    #[test]
    fn events_before_creation_are_kept() {
        let (db, _dir) = temp_db();
        db.upsert_event(&event(
            12,
            0,
            EventKind::BodyTerms {
                bond: BOND,
                principal: 5_000,
                coupon_rate: 7,
                coupon_date: 30,
                maturity_date: 1_800_000_000,
                currency: 2,
            },
        ))
        .unwrap();
        db.upsert_event(&created(10)).unwrap();

        let bond = db.bond_record(BOND).unwrap().unwrap();
        assert_eq!(bond.issuer, Some(ISSUER));
        assert_eq!(bond.principal, 5_000);
        assert_eq!(bond.coupon_rate, 7);
        assert_eq!(bond.last_update_block, 12);
    }

    #[test]
    fn older_status_change_does_not_override_newer() {
        let (db, _dir) = temp_db();
        db.upsert_event(&created(10)).unwrap();
        db.upsert_event(&status(20, 1, 3)).unwrap();
        db.upsert_event(&status(15, 0, 2)).unwrap();

        let bond = db.bond_record(BOND).unwrap().unwrap();
        assert_eq!(bond.last_status, 3);
        assert!(db.bond_status(BOND, 2).unwrap().is_some());
    }

    #[test]
    fn status_signatures_are_attributed_to_parties() {
        let (db, _dir) = temp_db();
        db.upsert_event(&created(10)).unwrap();
        db.upsert_event(&event(11, 0, EventKind::HolderUpdated { bond: BOND, holder: HOLDER }))
            .unwrap();
        db.upsert_event(&event(
            12,
            0,
            EventKind::StatusSigned {
                sender: HOLDER,
                bond: BOND,
                status: 1,
            },
        ))
        .unwrap();
        db.upsert_event(&event(
            13,
            0,
            EventKind::StatusResigned {
                sender: ISSUER,
                bond: BOND,
                status: 1,
            },
        ))
        .unwrap();

        let record = db.bond_status(BOND, 1).unwrap().unwrap();
        assert!(record.holder_signed);
        assert!(record.issuer_signed);
        assert!(record.resigned);
        assert_eq!(record.update_block, 13);
    }

    #[test]
    fn signatures_before_parties_are_known_are_attributed() {
        let (db, _dir) = temp_db();
        db.upsert_event(&event(
            12,
            0,
            EventKind::StatusSigned {
                sender: ISSUER,
                bond: BOND,
                status: 0,
            },
        ))
        .unwrap();
        db.upsert_event(&event(
            14,
            0,
            EventKind::StatusSigned {
                sender: HOLDER,
                bond: BOND,
                status: 0,
            },
        ))
        .unwrap();

        let record = db.bond_status(BOND, 0).unwrap().unwrap();
        assert!(!record.issuer_signed);
        assert!(!record.holder_signed);

        db.upsert_event(&created(10)).unwrap();
        assert!(db.bond_status(BOND, 0).unwrap().unwrap().issuer_signed);

        db.upsert_event(&event(11, 0, EventKind::HolderUpdated { bond: BOND, holder: HOLDER }))
            .unwrap();
        let record = db.bond_status(BOND, 0).unwrap().unwrap();
        assert!(record.issuer_signed);
        assert!(record.holder_signed);
        assert!(!record.resigned);
        assert_eq!(record.update_block, 14);
    }

    #[test]
    fn queries_respect_visibility() {
        let (db, _dir) = temp_db();
        db.upsert_event(&created(10)).unwrap();
        db.upsert_event(&event(11, 0, EventKind::HolderUpdated { bond: BOND, holder: HOLDER }))
            .unwrap();
        db.upsert_event(&event(
            12,
            0,
            EventKind::ChatMessage {
                bond: BOND,
                sender: ISSUER,
                message: "terms attached".into(),
                timestamp: 1_700_000_100,
            },
        ))
        .unwrap();

        // Negotiation: anyone may look.
        assert_eq!(db.get_bonds(STRANGER).unwrap().len(), 1);
        assert_eq!(db.get_chats(BOND, STRANGER).unwrap().len(), 1);

        db.upsert_event(&status(13, 0, 2)).unwrap();
        assert!(db.get_bonds(STRANGER).unwrap().is_empty());
        assert!(db.get_bond_by_address(BOND, STRANGER).unwrap().is_none());
        assert!(db.get_chats(BOND, STRANGER).unwrap().is_empty());

        let details = db.get_bond_by_address(BOND, HOLDER).unwrap().unwrap();
        assert_eq!(details.holder, Some(HOLDER));
        assert_eq!(details.summary.last_status, 2);

        let chats = db.get_chats(BOND, ISSUER).unwrap();
        assert_eq!(chats[0].message, "terms attached");
    }

    #[test]
    fn chats_are_returned_in_chain_order() {
        let (db, _dir) = temp_db();
        db.upsert_event(&created(10)).unwrap();
        for (block, idx, text) in [(30, 0, "c"), (20, 5, "b"), (20, 1, "a")] {
            db.upsert_event(&event(
                block,
                idx,
                EventKind::ChatMessage {
                    bond: BOND,
                    sender: ISSUER,
                    message: text.into(),
                    timestamp: 0,
                },
            ))
            .unwrap();
        }
        let texts: Vec<_> = db
            .get_chats(BOND, ISSUER)
            .unwrap()
            .into_iter()
            .map(|c| c.message)
            .collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }

    #[test]
    fn topic_checkpoints_are_monotonic() {
        let (db, _dir) = temp_db();
        db.advance_checkpoint(Topic::NewBondCreated, 100, 5).unwrap();
        db.advance_checkpoint(Topic::NewBondCreated, 90, 5).unwrap();
        assert_eq!(db.topic_checkpoint(Topic::NewBondCreated).unwrap(), Some(100));
    }

    #[test]
    fn global_checkpoint_never_passes_slowest_topic() {
        let (db, _dir) = temp_db();

        // Topics without a checkpoint count as the start block.
        assert_eq!(db.advance_checkpoint(Topic::NewBondCreated, 100, 5).unwrap(), 5);
        for topic in Topic::ALL {
            if topic != Topic::NewChatMessage {
                db.advance_checkpoint(topic, 150, 5).unwrap();
            }
        }
        assert_eq!(db.last_synced_block().unwrap(), 5);

        assert_eq!(db.advance_checkpoint(Topic::NewChatMessage, 40, 5).unwrap(), 40);
        assert_eq!(db.advance_checkpoint(Topic::NewChatMessage, 200, 5).unwrap(), 150);

        let global = db.last_synced_block().unwrap();
        for topic in Topic::ALL {
            assert!(global <= db.topic_checkpoint(topic).unwrap().unwrap());
        }
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bonds.redb");
        {
            let db = BondDatabase::open(&path).unwrap();
            db.upsert_event(&created(10)).unwrap();
            db.advance_checkpoint(Topic::NewBondCreated, 10, 1).unwrap();
        }
        let db = BondDatabase::open(&path).unwrap();
        assert_eq!(db.topic_checkpoint(Topic::NewBondCreated).unwrap(), Some(10));
        assert!(!db.upsert_event(&created(10)).unwrap());
    }
}
