// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Event Synchronizer
//!
//! Background task that mirrors bond-chat contract events into the embedded
//! redb database.
//!
//! ## Strategy
//!
//! One log subscription per event topic. Each subscription streams logs in
//! chain order from the topic's checkpoint; every log is decoded, stored and
//! projected in one write transaction, and only then is the topic checkpoint
//! advanced. Topics run independently: a failed subscription is restarted
//! from its own checkpoint while the others keep going.
//!
//! ## Checkpointing
//!
//! Per-topic checkpoints plus a global checkpoint (the lowest topic
//! checkpoint, with silent topics counted at the deployment block) live in
//! the `sync_state` table. A restart resumes from the checkpoint block
//! itself; events already stored are skipped.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use alloy::sol_types::SolEvent;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::blockchain::contract::IBondChat;
use crate::blockchain::{ChainBackend, ChainLog, ClientError, LogQuery, LogSubscription};
use crate::storage::{BondDatabase, DbError, EventKind, EventRecord, Topic};

/// Delay before a failed topic subscription is reopened.
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

/// First block to read: the checkpoint, but never before the deployment.
pub fn resume_block(checkpoint: u64, deployment_block: u64) -> u64 {
    checkpoint.max(deployment_block)
}

/// Event signature hash for `topic`.
pub fn topic_signature(topic: Topic) -> B256 {
    match topic {
        Topic::BondBodyTerms => IBondChat::BondBodyTerms::SIGNATURE_HASH,
        Topic::BondMotivation => IBondChat::BondMotivation::SIGNATURE_HASH,
        Topic::StatusSigned => IBondChat::StatusSigned::SIGNATURE_HASH,
        Topic::HolderUpdate => IBondChat::HolderUpdate::SIGNATURE_HASH,
        Topic::NewBondCreated => IBondChat::NewBondCreated::SIGNATURE_HASH,
        Topic::NewChatMessage => IBondChat::NewChatMessage::SIGNATURE_HASH,
        Topic::StatusChange => IBondChat::StatusChange::SIGNATURE_HASH,
        Topic::StatusResigned => IBondChat::StatusResigned::SIGNATURE_HASH,
    }
}

/// Decode a raw log of `topic` into an [`EventRecord`].
pub fn decode_log(topic: Topic, log: &ChainLog) -> Result<EventRecord, IndexerError> {
    fn raw<E: SolEvent>(topic: Topic, log: &ChainLog) -> Result<E, IndexerError> {
        E::decode_raw_log(log.topics.iter().copied(), &log.data).map_err(|e| {
            IndexerError::Decode {
                topic,
                reason: e.to_string(),
            }
        })
    }

    let kind = match topic {
        Topic::NewBondCreated => {
            let ev: IBondChat::NewBondCreated = raw(topic, log)?;
            EventKind::BondCreated {
                sender: ev.sender,
                bond: ev.bondAddress,
                timestamp: ev.timestamp.saturating_to(),
            }
        }
        Topic::BondBodyTerms => {
            let ev: IBondChat::BondBodyTerms = raw(topic, log)?;
            EventKind::BodyTerms {
                bond: ev.bondAddress,
                principal: ev.principal,
                coupon_rate: ev.couponRate,
                coupon_date: ev.couponDate,
                maturity_date: ev.maturityDate,
                currency: ev.currency,
            }
        }
        Topic::BondMotivation => {
            let ev: IBondChat::BondMotivation = raw(topic, log)?;
            EventKind::Motivation {
                sender: ev.sender,
                bond: ev.bondAddress,
                message: ev.message,
            }
        }
        Topic::StatusChange => {
            let ev: IBondChat::StatusChange = raw(topic, log)?;
            EventKind::StatusChanged {
                sender: ev.sender,
                bond: ev.bondAddress,
                status: ev.status,
            }
        }
        Topic::StatusSigned => {
            let ev: IBondChat::StatusSigned = raw(topic, log)?;
            EventKind::StatusSigned {
                sender: ev.sender,
                bond: ev.bondAddress,
                status: ev.status,
            }
        }
        Topic::StatusResigned => {
            let ev: IBondChat::StatusResigned = raw(topic, log)?;
            EventKind::StatusResigned {
                sender: ev.sender,
                bond: ev.bondAddress,
                status: ev.status,
            }
        }
        Topic::HolderUpdate => {
            let ev: IBondChat::HolderUpdate = raw(topic, log)?;
            EventKind::HolderUpdated {
                bond: ev.bondAddress,
                holder: ev.holder,
            }
        }
        Topic::NewChatMessage => {
            let ev: IBondChat::NewChatMessage = raw(topic, log)?;
            EventKind::ChatMessage {
                bond: ev.bondAddress,
                sender: ev.chat.sender,
                message: ev.chat.message,
                timestamp: ev.chat.timestamp.saturating_to(),
            }
        }
    };

    Ok(EventRecord {
        contract: log.address,
        block_number: log.block_number,
        tx_hash: log.tx_hash,
        log_index: log.log_index,
        kind,
    })
}

/// Contract event synchronizer that runs as a set of background tokio tasks.
#[derive(Clone)]
pub struct EventSynchronizer {
    backend: Arc<dyn ChainBackend>,
    db: Arc<BondDatabase>,
    contract: Address,
    deployment_block: u64,
    retry_delay: Duration,
}

impl EventSynchronizer {
    pub fn new(
        backend: Arc<dyn ChainBackend>,
        db: Arc<BondDatabase>,
        contract: Address,
        deployment_block: u64,
    ) -> Self {
        Self {
            backend,
            db,
            contract,
            deployment_block,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Block from which a full resync would start.
    pub fn resume(&self) -> Result<u64, IndexerError> {
        Ok(resume_block(
            self.db.last_synced_block()?,
            self.deployment_block,
        ))
    }

    /// Block from which `topic` resumes.
    pub fn resume_topic(&self, topic: Topic) -> Result<u64, IndexerError> {
        let checkpoint = self.db.topic_checkpoint(topic)?.unwrap_or(0);
        Ok(resume_block(checkpoint, self.deployment_block))
    }

    /// Store one event and advance its topic checkpoint.
    ///
    /// Returns `false` for an event that was already stored.
    pub fn ingest(&self, event: &EventRecord) -> Result<bool, IndexerError> {
        let inserted = self.db.upsert_event(event)?;
        self.db
            .advance_checkpoint(event.topic(), event.block_number, self.deployment_block)?;
        Ok(inserted)
    }

    /// Follow `topic` from `start` until `cancel` fires or the subscription fails.
    pub async fn watch(
        &self,
        topic: Topic,
        start: u64,
        cancel: &CancellationToken,
    ) -> Result<(), IndexerError> {
        let query = LogQuery::new(self.contract, topic_signature(topic), start);
        let mut subscription = LogSubscription::spawn(Arc::clone(&self.backend), query, cancel);

        while let Some(log) = subscription.next().await {
            let event = match decode_log(topic, &log) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(
                        topic = %topic,
                        block = log.block_number,
                        log_index = log.log_index,
                        error = %e,
                        "Skipping undecodable log"
                    );
                    continue;
                }
            };

            if self.ingest(&event)? {
                tracing::debug!(
                    topic = %topic,
                    bond = %event.kind.bond(),
                    block = event.block_number,
                    "Event stored"
                );
            }
        }

        subscription.finish().await?;
        Ok(())
    }

    /// Run every topic until the cancellation token is triggered.
    ///
    /// This should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(synchronizer.run(shutdown.clone()));
    /// ```
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            contract = %self.contract,
            deployment_block = self.deployment_block,
            topics = Topic::ALL.len(),
            "Event synchronizer starting"
        );

        let mut tasks = JoinSet::new();
        for topic in Topic::ALL {
            let sync = self.clone();
            let shutdown = shutdown.clone();
            tasks.spawn(async move { sync.follow(topic, shutdown).await });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Topic task panicked");
            }
        }
        tracing::info!("Event synchronizer shut down");
    }

    /// Keep `topic` subscribed, restarting from its checkpoint after failures.
    async fn follow(&self, topic: Topic, shutdown: CancellationToken) {
        loop {
            let result = match self.resume_topic(topic) {
                Ok(start) => {
                    tracing::debug!(topic = %topic, start, "Subscribing");
                    self.watch(topic, start, &shutdown).await
                }
                Err(e) => Err(e),
            };

            if shutdown.is_cancelled() {
                return;
            }
            if let Err(e) = result {
                tracing::warn!(topic = %topic, error = %e, "Topic subscription failed, will retry");
            }

            tokio::select! {
                _ = tokio::time::sleep(self.retry_delay) => {},
                _ = shutdown.cancelled() => return,
            }
        }
    }
}

/// Errors from the synchronizer.
#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("subscription error: {0}")]
    Subscription(#[from] ClientError),

    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("could not decode {topic} log: {reason}")]
    Decode { topic: Topic, reason: String },
}
