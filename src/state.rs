// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::sync::Arc;

use crate::blockchain::BondChat;
use crate::storage::{BondDatabase, SessionCache};

/// Upper bound on concurrently negotiated sessions.
pub const SESSION_CAPACITY: usize = 10_000;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<BondDatabase>,
    pub sessions: Arc<SessionCache>,
    pub bond_chat: Arc<BondChat>,
    pub data_dir: PathBuf,
}

impl AppState {
    pub fn new(db: Arc<BondDatabase>, bond_chat: BondChat, data_dir: PathBuf) -> Self {
        Self {
            db,
            sessions: Arc::new(SessionCache::new(SESSION_CAPACITY)),
            bond_chat: Arc::new(bond_chat),
            data_dir,
        }
    }
}
