mod rpc;

pub use rpc::RpcTransport;

use alloy::primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::TransportError;

/// A request as handed to the transport: addressing, funding, and
/// calldata. Option values the caller didn't set are left for the
/// transport (or the node) to default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallRequest {
    pub from: Option<Address>,
    pub to: Option<Address>,
    pub gas: Option<u64>,
    pub gas_price: Option<U256>,
    pub value: Option<U256>,
    pub data: Option<Bytes>,
}

/// One raw log record from a receipt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// The outcome record of a finalized state-changing submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Receipt {
    pub transaction_hash: B256,
    pub status: Option<bool>,
    pub gas_used: Option<u64>,
    pub contract_address: Option<Address>,
    pub block_number: Option<u64>,
    pub logs: Vec<LogEntry>,
}

/// A deployment progress notification. The transport may deliver a
/// hash-only notice while the instance is pending and a later one once
/// the address is known.
#[derive(Debug, Clone, Default)]
pub struct DeployNotice {
    pub transaction_hash: Option<B256>,
    pub address: Option<Address>,
}

/// The collaborator boundary to a remote node. Nothing in this layer
/// implements execution; it only shapes requests and interprets results.
pub trait Transport: Send + Sync {
    /// Invoke a read-only function and return its raw return data.
    fn call(
        &self,
        request: CallRequest,
    ) -> impl Future<Output = Result<Bytes, TransportError>> + Send;

    /// Submit a state-changing invocation and return its transaction
    /// hash. Confirmation is the caller's concern.
    fn send_transaction(
        &self,
        request: CallRequest,
    ) -> impl Future<Output = Result<B256, TransportError>> + Send;

    /// Fetch the receipt for a hash; `None` while the transaction is
    /// still pending.
    fn transaction_receipt(
        &self,
        hash: B256,
    ) -> impl Future<Output = Result<Option<Receipt>, TransportError>> + Send;

    /// Submit a create-instance request. The returned channel may carry
    /// more than one notice for a single deployment.
    fn create(
        &self,
        request: CallRequest,
    ) -> impl Future<
        Output = Result<mpsc::Receiver<Result<DeployNotice, TransportError>>, TransportError>,
    > + Send;

    /// The identifier of the network the transport is connected to.
    fn network_id(&self) -> impl Future<Output = Result<String, TransportError>> + Send;
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Per-hash receipt script: report "pending" for a number of polls,
    /// then either the receipt or pending forever.
    struct ReceiptScript {
        remaining_empty: usize,
        receipt: Option<Receipt>,
    }

    #[derive(Default)]
    struct Inner {
        network: String,
        call_results: VecDeque<Result<Bytes, TransportError>>,
        send_results: VecDeque<Result<B256, TransportError>>,
        receipts: HashMap<B256, ReceiptScript>,
        notices: Vec<Result<DeployNotice, TransportError>>,
        poll_counts: HashMap<B256, usize>,
    }

    /// A scripted transport for exercising the client without a node.
    pub struct MockTransport {
        inner: Mutex<Inner>,
        pub sends: AtomicUsize,
        pub creates: AtomicUsize,
        pub network_queries: AtomicUsize,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::with_network("1")
        }

        pub fn with_network(network: &str) -> Self {
            Self {
                inner: Mutex::new(Inner {
                    network: network.to_string(),
                    ..Default::default()
                }),
                sends: AtomicUsize::new(0),
                creates: AtomicUsize::new(0),
                network_queries: AtomicUsize::new(0),
            }
        }

        pub fn queue_call(&self, result: Result<Bytes, TransportError>) {
            self.inner.lock().unwrap().call_results.push_back(result);
        }

        pub fn queue_send(&self, result: Result<B256, TransportError>) {
            self.inner.lock().unwrap().send_results.push_back(result);
        }

        /// Script the receipt for `hash`: `empty_polls` pending polls,
        /// then `receipt` (or pending forever when `None`).
        pub fn script_receipt(&self, hash: B256, empty_polls: usize, receipt: Option<Receipt>) {
            self.inner.lock().unwrap().receipts.insert(hash, ReceiptScript {
                remaining_empty: empty_polls,
                receipt,
            });
        }

        pub fn script_deploy(&self, notices: Vec<Result<DeployNotice, TransportError>>) {
            self.inner.lock().unwrap().notices = notices;
        }

        pub fn polls_for(&self, hash: B256) -> usize {
            self.inner
                .lock()
                .unwrap()
                .poll_counts
                .get(&hash)
                .copied()
                .unwrap_or(0)
        }
    }

    impl Transport for MockTransport {
        async fn call(&self, _request: CallRequest) -> Result<Bytes, TransportError> {
            self.inner
                .lock()
                .unwrap()
                .call_results
                .pop_front()
                .unwrap_or_else(|| Ok(Bytes::new()))
        }

        async fn send_transaction(&self, _request: CallRequest) -> Result<B256, TransportError> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            self.inner
                .lock()
                .unwrap()
                .send_results
                .pop_front()
                .unwrap_or_else(|| Ok(B256::repeat_byte(0x11)))
        }

        async fn transaction_receipt(
            &self,
            hash: B256,
        ) -> Result<Option<Receipt>, TransportError> {
            let mut inner = self.inner.lock().unwrap();
            *inner.poll_counts.entry(hash).or_insert(0) += 1;
            match inner.receipts.get_mut(&hash) {
                Some(script) => {
                    if script.remaining_empty > 0 {
                        script.remaining_empty -= 1;
                        Ok(None)
                    } else {
                        Ok(script.receipt.clone())
                    }
                }
                None => Ok(None),
            }
        }

        async fn create(
            &self,
            _request: CallRequest,
        ) -> Result<mpsc::Receiver<Result<DeployNotice, TransportError>>, TransportError> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            let notices = std::mem::take(&mut self.inner.lock().unwrap().notices);
            let (tx, rx) = mpsc::channel(notices.len().max(1));
            for notice in notices {
                tx.try_send(notice).expect("deploy channel sized to fit");
            }
            Ok(rx)
        }

        async fn network_id(&self) -> Result<String, TransportError> {
            self.network_queries.fetch_add(1, Ordering::SeqCst);
            Ok(self.inner.lock().unwrap().network.clone())
        }
    }
}
