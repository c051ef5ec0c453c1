// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Raw chain capability consumed by the confidential transport and the
//! event synchronizer.
//!
//! [`ChainBackend`] is implemented by [`SapphireClient`](super::SapphireClient)
//! over JSON-RPC and by in-memory fakes in tests.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::client::ClientError;

/// Default block chunk size per `eth_getLogs` query.
pub const LOG_CHUNK_SIZE: u64 = 2000;

/// Default poll interval when caught up to chain head.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Buffered logs per subscription before the poller waits on the consumer.
const SUBSCRIPTION_BUFFER: usize = 256;

/// Header fields needed to build a leash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: B256,
    pub nonce: u64,
}

/// Contract call request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallMsg {
    pub from: Address,
    pub to: Address,
    pub gas_price: U256,
    pub value: U256,
    pub data: Bytes,
}

/// Log filter over one contract and one event signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogQuery {
    pub address: Address,
    pub topic0: B256,
    pub from_block: u64,
    pub to_block: Option<u64>,
}

impl LogQuery {
    pub fn new(address: Address, topic0: B256, from_block: u64) -> Self {
        Self {
            address,
            topic0,
            from_block,
            to_block: None,
        }
    }

    pub fn range(&self, from_block: u64, to_block: u64) -> Self {
        Self {
            from_block,
            to_block: Some(to_block),
            ..*self
        }
    }
}

/// Raw log with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub tx_hash: B256,
    pub log_index: u64,
}

#[async_trait]
pub trait ChainBackend: Send + Sync {
    async fn chain_id(&self) -> Result<u64, ClientError>;

    async fn block_number(&self) -> Result<u64, ClientError>;

    /// Header at `number`, or the latest header when `None`.
    async fn header_by_number(&self, number: Option<u64>) -> Result<BlockHeader, ClientError>;

    async fn call_contract(&self, call: &CallMsg, block: Option<u64>)
        -> Result<Bytes, ClientError>;

    async fn estimate_gas(&self, call: &CallMsg) -> Result<u64, ClientError>;

    async fn pending_nonce_at(&self, account: Address) -> Result<u64, ClientError>;

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, ClientError>;

    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<ChainLog>, ClientError>;

    fn poll_interval(&self) -> Duration {
        DEFAULT_POLL_INTERVAL
    }

    /// Stream logs matching `query` into `sink`, from `query.from_block`
    /// onward, until `cancel` fires or the receiver is dropped.
    ///
    /// The default implementation polls [`filter_logs`](Self::filter_logs)
    /// in chunks toward the head. Logs are delivered in chain order.
    /// Cancellation is observed between and during chunks, so a long
    /// catch-up stops as soon as `cancel` fires.
    async fn subscribe_filter_logs(
        &self,
        query: LogQuery,
        sink: mpsc::Sender<ChainLog>,
        cancel: CancellationToken,
    ) -> Result<(), ClientError> {
        let mut next = query.from_block;
        loop {
            let head = self.block_number().await?;
            let head = query.to_block.map_or(head, |end| end.min(head));

            while next <= head {
                let to = (next + LOG_CHUNK_SIZE - 1).min(head);
                let chunk = query.range(next, to);
                let logs = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    logs = self.filter_logs(&chunk) => logs?,
                };
                for log in logs {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(()),
                        sent = sink.send(log) => if sent.is_err() {
                            return Ok(());
                        },
                    }
                }
                next = to + 1;
            }

            if query.to_block.is_some_and(|end| next > end) {
                return Ok(());
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval()) => {},
                _ = cancel.cancelled() => return Ok(()),
            }
        }
    }
}

// =============================================================================
// Subscriptions
// =============================================================================

/// Live log stream for one query.
///
/// Dropping the subscription cancels the background poller and releases its
/// channel.
pub struct LogSubscription {
    logs: mpsc::Receiver<ChainLog>,
    task: JoinHandle<Result<(), ClientError>>,
    _guard: DropGuard,
}

impl LogSubscription {
    /// Start streaming `query` from `backend`. The poller stops when `cancel`
    /// fires or the subscription is dropped.
    pub fn spawn(
        backend: Arc<dyn ChainBackend>,
        query: LogQuery,
        cancel: &CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let token = cancel.child_token();
        let poller_token = token.clone();
        let task = tokio::spawn(async move {
            backend
                .subscribe_filter_logs(query, tx, poller_token)
                .await
        });
        Self {
            logs: rx,
            task,
            _guard: token.drop_guard(),
        }
    }

    /// Next log, or `None` once the stream has ended. Call
    /// [`finish`](Self::finish) afterwards to learn why it ended.
    pub async fn next(&mut self) -> Option<ChainLog> {
        self.logs.recv().await
    }

    /// Wait for the poller and return its terminal status.
    pub async fn finish(self) -> Result<(), ClientError> {
        let Self { logs, task, _guard } = self;
        drop(logs);
        drop(_guard);
        match task.await {
            Ok(result) => result,
            Err(e) => Err(ClientError::Rpc(format!("log poller aborted: {e}"))),
        }
    }
}

// =============================================================================
// Test double
// =============================================================================

#[cfg(test)]
pub mod fake {
    //! In-memory chain used by transport, synchronizer and gateway tests.

    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use alloy::primitives::keccak256;

    use super::*;

    type CallHandler = Box<dyn Fn(&CallMsg, u64) -> Result<Bytes, ClientError> + Send + Sync>;

    pub struct FakeChain {
        pub chain_id: u64,
        pub head: Mutex<u64>,
        pub logs: Mutex<Vec<ChainLog>>,
        pub nonces: Mutex<BTreeMap<Address, u64>>,
        pub sent: Mutex<Vec<Vec<u8>>>,
        pub calls: Mutex<Vec<CallMsg>>,
        pub fail_logs: Mutex<bool>,
        pub log_delay: Mutex<Duration>,
        call_handler: Mutex<Option<CallHandler>>,
    }

    impl FakeChain {
        pub fn new(chain_id: u64, head: u64) -> Self {
            Self {
                chain_id,
                head: Mutex::new(head),
                logs: Mutex::new(Vec::new()),
                nonces: Mutex::new(BTreeMap::new()),
                sent: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
                fail_logs: Mutex::new(false),
                log_delay: Mutex::new(Duration::ZERO),
                call_handler: Mutex::new(None),
            }
        }

        pub fn set_head(&self, head: u64) {
            *self.head.lock().unwrap() = head;
        }

        pub fn push_log(&self, log: ChainLog) {
            self.logs.lock().unwrap().push(log);
        }

        pub fn on_call(
            &self,
            handler: impl Fn(&CallMsg, u64) -> Result<Bytes, ClientError> + Send + Sync + 'static,
        ) {
            *self.call_handler.lock().unwrap() = Some(Box::new(handler));
        }

        pub fn header(number: u64) -> BlockHeader {
            BlockHeader {
                number,
                hash: keccak256(number.to_be_bytes()),
                nonce: number.wrapping_mul(31),
            }
        }
    }

    #[async_trait]
    impl ChainBackend for FakeChain {
        async fn chain_id(&self) -> Result<u64, ClientError> {
            Ok(self.chain_id)
        }

        async fn block_number(&self) -> Result<u64, ClientError> {
            Ok(*self.head.lock().unwrap())
        }

        async fn header_by_number(&self, number: Option<u64>) -> Result<BlockHeader, ClientError> {
            let head = *self.head.lock().unwrap();
            match number {
                Some(n) if n > head => Err(ClientError::HeaderNotFound(n)),
                Some(n) => Ok(Self::header(n)),
                None => Ok(Self::header(head)),
            }
        }

        async fn call_contract(
            &self,
            call: &CallMsg,
            _block: Option<u64>,
        ) -> Result<Bytes, ClientError> {
            self.calls.lock().unwrap().push(call.clone());
            let head = *self.head.lock().unwrap();
            match self.call_handler.lock().unwrap().as_ref() {
                Some(handler) => handler(call, head),
                None => Ok(Bytes::new()),
            }
        }

        async fn estimate_gas(&self, _call: &CallMsg) -> Result<u64, ClientError> {
            Ok(21_000)
        }

        async fn pending_nonce_at(&self, account: Address) -> Result<u64, ClientError> {
            Ok(*self.nonces.lock().unwrap().get(&account).unwrap_or(&0))
        }

        async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, ClientError> {
            self.sent.lock().unwrap().push(raw.to_vec());
            Ok(keccak256(raw))
        }

        async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<ChainLog>, ClientError> {
            let delay = *self.log_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if *self.fail_logs.lock().unwrap() {
                return Err(ClientError::Rpc("log filter unavailable".into()));
            }
            let to = query.to_block.unwrap_or(u64::MAX);
            let mut logs: Vec<_> = self
                .logs
                .lock()
                .unwrap()
                .iter()
                .filter(|l| {
                    l.address == query.address
                        && l.topics.first() == Some(&query.topic0)
                        && l.block_number >= query.from_block
                        && l.block_number <= to
                })
                .cloned()
                .collect();
            logs.sort_by_key(|l| (l.block_number, l.log_index));
            Ok(logs)
        }

        fn poll_interval(&self) -> Duration {
            Duration::from_millis(10)
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::fake::FakeChain;
    use super::*;

    const CONTRACT: Address = address!("48C85A77897508D5c8976EFa56EeaA93e4226bE5");

    fn log(topic: B256, block: u64, index: u64) -> ChainLog {
        ChainLog {
            address: CONTRACT,
            topics: vec![topic],
            data: Bytes::new(),
            block_number: block,
            tx_hash: B256::repeat_byte(block as u8),
            log_index: index,
        }
    }

    #[tokio::test]
    async fn subscription_streams_in_order_and_follows_head() {
        let chain = Arc::new(FakeChain::new(0x5afd, 10));
        let topic = B256::repeat_byte(0xab);
        chain.push_log(log(topic, 7, 1));
        chain.push_log(log(topic, 3, 0));
        chain.push_log(log(B256::repeat_byte(0xcd), 4, 0));

        let cancel = CancellationToken::new();
        let mut sub = LogSubscription::spawn(chain.clone(), LogQuery::new(CONTRACT, topic, 0), &cancel);

        assert_eq!(sub.next().await.unwrap().block_number, 3);
        assert_eq!(sub.next().await.unwrap().block_number, 7);

        chain.push_log(log(topic, 12, 0));
        chain.set_head(12);
        assert_eq!(sub.next().await.unwrap().block_number, 12);

        cancel.cancel();
        assert!(sub.next().await.is_none());
        assert!(sub.finish().await.is_ok());
    }

    #[tokio::test]
    async fn subscription_reports_filter_errors() {
        let chain = Arc::new(FakeChain::new(0x5afd, 10));
        *chain.fail_logs.lock().unwrap() = true;

        let cancel = CancellationToken::new();
        let mut sub = LogSubscription::spawn(
            chain,
            LogQuery::new(CONTRACT, B256::ZERO, 0),
            &cancel,
        );
        assert!(sub.next().await.is_none());
        assert!(matches!(sub.finish().await, Err(ClientError::Rpc(_))));
    }

    #[tokio::test]
    async fn cancel_interrupts_long_catch_up() {
        // Ten thousand slow chunks between the start block and the head.
        let chain = Arc::new(FakeChain::new(0x5afd, 20_000_000));
        *chain.log_delay.lock().unwrap() = Duration::from_millis(5);

        let cancel = CancellationToken::new();
        let mut sub = LogSubscription::spawn(
            chain,
            LogQuery::new(CONTRACT, B256::repeat_byte(0xab), 0),
            &cancel,
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let ended = tokio::time::timeout(Duration::from_secs(2), sub.next()).await;
        assert_eq!(ended.ok(), Some(None));
        assert!(sub.finish().await.is_ok());
    }

    #[tokio::test]
    async fn bounded_query_ends_at_to_block() {
        let chain = Arc::new(FakeChain::new(0x5afd, 50));
        let topic = B256::repeat_byte(0x01);
        chain.push_log(log(topic, 5, 0));
        chain.push_log(log(topic, 40, 0));

        let (tx, mut rx) = mpsc::channel(8);
        let query = LogQuery::new(CONTRACT, topic, 0).range(0, 20);
        chain
            .subscribe_filter_logs(query, tx, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(rx.recv().await.unwrap().block_number, 5);
        assert!(rx.recv().await.is_none());
    }
}
