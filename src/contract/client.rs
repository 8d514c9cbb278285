use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, B256, Bytes};
use futures::future::try_join_all;

use super::events::{self, DecodedEvent};
use crate::abi::{self, AbiFunction};
use crate::artifacts::ContractDescriptor;
use crate::error::{Error, Result};
use crate::options::{self, CallOptions};
use crate::transport::{CallRequest, Receipt, Transport};

/// Fixed per-client behavior: polling cadence, confirmation timeout, and
/// the outcome shape of state-changing calls.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Delay between receipt polls.
    pub poll_interval: Duration,
    /// Wall-clock confirmation window. `Duration::ZERO` waits
    /// indefinitely.
    pub timeout: Duration,
    /// When set, `send` resolves to the full `{hash, receipt, events}`
    /// bundle; otherwise to the bare transaction hash.
    pub extended_outcomes: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(240),
            extended_outcomes: true,
        }
    }
}

/// The outcome of a confirmed state-changing call, in one of the two
/// shapes selected by [`ClientConfig::extended_outcomes`].
#[derive(Debug, Clone)]
pub enum TransactionOutcome {
    /// Legacy shape: just the transaction hash.
    Hash(B256),
    /// Extended shape: hash, receipt, and the decoded events.
    Extended(Confirmation),
}

#[derive(Debug, Clone)]
pub struct Confirmation {
    pub transaction_hash: B256,
    pub receipt: Receipt,
    pub events: Vec<DecodedEvent>,
}

impl TransactionOutcome {
    pub fn transaction_hash(&self) -> B256 {
        match self {
            Self::Hash(hash) => *hash,
            Self::Extended(confirmation) => confirmation.transaction_hash,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodKind {
    Call,
    Send,
}

#[derive(Debug, Clone, Copy)]
struct Method {
    index: usize,
    kind: MethodKind,
}

/// A contract bound to a deployed address.
///
/// Holds an immutable descriptor snapshot; switching networks on the
/// factory never affects an existing instance. The method table is built
/// once from the ABI at construction.
pub struct Contract<T> {
    descriptor: Arc<ContractDescriptor>,
    transport: Arc<T>,
    address: Address,
    defaults: CallOptions,
    config: ClientConfig,
    methods: BTreeMap<String, Method>,
}

// Manual impl: a derive would demand `T: Debug`, which transports need
// not provide.
impl<T> fmt::Debug for Contract<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contract")
            .field("address", &self.address)
            .field("network_id", &self.descriptor.network_id)
            .field("methods", &self.methods.len())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Contract<T> {
    pub(crate) fn new(
        descriptor: Arc<ContractDescriptor>,
        transport: Arc<T>,
        address: Address,
        defaults: CallOptions,
        config: ClientConfig,
    ) -> Self {
        let methods = descriptor
            .abi
            .functions
            .iter()
            .enumerate()
            .map(|(index, function)| {
                let kind = if function.is_constant() {
                    MethodKind::Call
                } else {
                    MethodKind::Send
                };
                (function.name.clone(), Method { index, kind })
            })
            .collect();

        Self {
            descriptor,
            transport,
            address,
            defaults,
            config,
            methods,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.descriptor
    }

    /// Look up a function entry through the method table.
    pub fn function(&self, name: &str) -> Result<&AbiFunction> {
        let method = self
            .methods
            .get(name)
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;
        Ok(&self.descriptor.abi.functions[method.index])
    }

    /// Whether the ABI marks this function read-only.
    pub fn is_read_only(&self, name: &str) -> Result<bool> {
        let method = self
            .methods
            .get(name)
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;
        Ok(method.kind == MethodKind::Call)
    }

    fn request(
        &self,
        function: &AbiFunction,
        params: &[String],
        overrides: Option<&CallOptions>,
    ) -> Result<CallRequest> {
        let effective = options::merge(
            &self.defaults,
            overrides.unwrap_or(&CallOptions::default()),
        );
        let calldata = abi::encode_call(function, params)?;

        Ok(CallRequest {
            from: effective.from,
            to: Some(self.address),
            gas: effective.gas,
            gas_price: effective.gas_price,
            value: effective.value,
            data: Some(Bytes::from(calldata)),
        })
    }

    /// Issue a read-only invocation and decode the returned values.
    ///
    /// Transport failures are propagated verbatim; there is no retry.
    pub async fn call(
        &self,
        name: &str,
        params: &[String],
        overrides: Option<&CallOptions>,
    ) -> Result<Vec<String>> {
        let function = self.function(name)?;
        let request = self.request(function, params, overrides)?;
        let raw = self.transport.call(request).await?;
        abi::decode_params(&function.outputs, &raw)
    }

    /// Submit a state-changing invocation and poll until it confirms or
    /// the configured window elapses.
    ///
    /// Dropping the returned future abandons polling but does not cancel
    /// the transaction: it may still confirm on chain. Likewise a
    /// [`Error::Timeout`] is the client giving up, not proof of failure.
    pub async fn send(
        &self,
        name: &str,
        params: &[String],
        overrides: Option<&CallOptions>,
    ) -> Result<TransactionOutcome> {
        let function = self.function(name)?;
        let request = self.request(function, params, overrides)?;

        // A submission error rejects immediately; no polling happens.
        let hash = self.transport.send_transaction(request).await?;
        let receipt = self.wait_for(hash).await?;

        if !self.config.extended_outcomes {
            return Ok(TransactionOutcome::Hash(hash));
        }

        let decoded = events::decode_logs(&receipt.logs, &self.descriptor.events)?;
        Ok(TransactionOutcome::Extended(Confirmation {
            transaction_hash: hash,
            receipt,
            events: decoded,
        }))
    }

    /// Poll for the receipt of an already-submitted transaction.
    pub async fn wait_for(&self, hash: B256) -> Result<Receipt> {
        let start = Instant::now();

        loop {
            if let Some(receipt) = self.transport.transaction_receipt(hash).await? {
                tracing::debug!(
                    %hash,
                    gas_used = ?receipt.gas_used,
                    "transaction confirmed"
                );
                return Ok(receipt);
            }

            if self.config.timeout > Duration::ZERO && start.elapsed() > self.config.timeout {
                return Err(Error::Timeout {
                    hash,
                    timeout: self.config.timeout,
                });
            }

            tracing::trace!(%hash, "receipt not yet available");
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Wait on every hash concurrently; resolves once all have confirmed
    /// and rejects on the first timeout or failure, abandoning the rest.
    pub async fn wait_for_all(&self, hashes: &[B256]) -> Result<Vec<Receipt>> {
        try_join_all(hashes.iter().map(|hash| self.wait_for(*hash))).await
    }
}
