use std::time::Duration;

use alloy::{
    network::EthereumWallet,
    primitives::{B256, Bytes, TxKind},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::{TransactionInput, TransactionRequest},
    signers::local::PrivateKeySigner,
};
use tokio::sync::mpsc;

use super::{CallRequest, DeployNotice, LogEntry, Receipt, Transport};
use crate::error::TransportError;

/// Polling cadence of the deployment watcher.
const DEPLOY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A [`Transport`] backed by an RPC node via Alloy.
pub struct RpcTransport {
    rpc_url: String,
    signer: Option<PrivateKeySigner>,
}

impl RpcTransport {
    pub fn new(rpc_url: &str) -> Self {
        Self {
            rpc_url: rpc_url.to_string(),
            signer: None,
        }
    }

    /// Set the signer for write transactions and deployments.
    pub fn with_signer(mut self, private_key: &str) -> Result<Self, TransportError> {
        let clean_key = private_key.strip_prefix("0x").unwrap_or(private_key);
        let signer: PrivateKeySigner = clean_key
            .parse()
            .map_err(|e| TransportError(format!("failed to parse private key: {e}")))?;
        self.signer = Some(signer);
        Ok(self)
    }

    async fn provider(&self) -> Result<DynProvider, TransportError> {
        let provider = match &self.signer {
            Some(signer) => ProviderBuilder::new()
                .wallet(EthereumWallet::from(signer.clone()))
                .connect(&self.rpc_url)
                .await
                .map_err(|e| TransportError(format!("failed to connect to RPC: {e}")))?
                .erased(),
            None => ProviderBuilder::new()
                .connect(&self.rpc_url)
                .await
                .map_err(|e| TransportError(format!("failed to connect to RPC: {e}")))?
                .erased(),
        };
        Ok(provider)
    }
}

fn build_request(request: CallRequest) -> TransactionRequest {
    let mut tx = TransactionRequest::default();
    tx.from = request.from;
    tx.to = Some(match request.to {
        Some(address) => TxKind::Call(address),
        None => TxKind::Create,
    });
    tx.gas = request.gas;
    tx.gas_price = request.gas_price.map(|price| price.to::<u128>());
    tx.value = request.value;
    tx.input = request.data.map(TransactionInput::new).unwrap_or_default();
    tx
}

fn convert_receipt(receipt: alloy::rpc::types::TransactionReceipt) -> Receipt {
    let logs = receipt
        .inner
        .logs()
        .iter()
        .map(|log| LogEntry {
            address: log.inner.address,
            topics: log.inner.data.topics().to_vec(),
            data: log.inner.data.data.clone(),
        })
        .collect();

    Receipt {
        transaction_hash: receipt.transaction_hash,
        status: Some(receipt.status()),
        gas_used: Some(receipt.gas_used),
        contract_address: receipt.contract_address,
        block_number: receipt.block_number,
        logs,
    }
}

impl Transport for RpcTransport {
    async fn call(&self, request: CallRequest) -> Result<Bytes, TransportError> {
        let provider = self.provider().await?;
        provider
            .call(build_request(request))
            .await
            .map_err(|e| TransportError(format!("call failed: {e}")))
    }

    async fn send_transaction(&self, request: CallRequest) -> Result<B256, TransportError> {
        let provider = self.provider().await?;
        let pending = provider
            .send_transaction(build_request(request))
            .await
            .map_err(|e| TransportError(format!("failed to send transaction: {e}")))?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<Receipt>, TransportError> {
        let provider = self.provider().await?;
        let receipt = provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| TransportError(format!("receipt lookup failed: {e}")))?;
        Ok(receipt.map(convert_receipt))
    }

    async fn create(
        &self,
        request: CallRequest,
    ) -> Result<mpsc::Receiver<Result<DeployNotice, TransportError>>, TransportError> {
        let provider = self.provider().await?;
        let pending = provider
            .send_transaction(build_request(request))
            .await
            .map_err(|e| TransportError(format!("failed to submit deployment: {e}")))?;
        let hash = *pending.tx_hash();

        let (tx, rx) = mpsc::channel(2);

        // First notice: submitted, address not yet known.
        let _ = tx.try_send(Ok(DeployNotice {
            transaction_hash: Some(hash),
            address: None,
        }));

        tokio::spawn(async move {
            loop {
                match provider.get_transaction_receipt(hash).await {
                    Ok(Some(receipt)) => {
                        let address = receipt.contract_address;
                        tracing::debug!(%hash, ?address, "deployment transaction mined");
                        let _ = tx
                            .send(Ok(DeployNotice {
                                transaction_hash: Some(hash),
                                address,
                            }))
                            .await;
                        return;
                    }
                    Ok(None) => tokio::time::sleep(DEPLOY_POLL_INTERVAL).await,
                    Err(e) => {
                        let _ = tx
                            .send(Err(TransportError(format!("receipt lookup failed: {e}"))))
                            .await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn network_id(&self) -> Result<String, TransportError> {
        let provider = self.provider().await?;
        let chain_id = provider
            .get_chain_id()
            .await
            .map_err(|e| TransportError(format!("failed to query network id: {e}")))?;
        Ok(chain_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::*;

    #[test]
    fn test_build_request_carries_fields() {
        let request = CallRequest {
            from: Some(Address::repeat_byte(0xaa)),
            to: Some(Address::repeat_byte(0xbb)),
            gas: Some(3_000_000),
            gas_price: None,
            value: None,
            data: Some(Bytes::from_static(&[0x01, 0x02])),
        };

        let tx = build_request(request);
        assert_eq!(tx.from, Some(Address::repeat_byte(0xaa)));
        assert_eq!(tx.to, Some(TxKind::Call(Address::repeat_byte(0xbb))));
        assert_eq!(tx.gas, Some(3_000_000));
        assert_eq!(tx.input.input().unwrap().as_ref(), &[0x01, 0x02]);
    }

    #[test]
    fn test_build_request_without_to_is_a_create() {
        let tx = build_request(CallRequest::default());
        assert_eq!(tx.to, Some(TxKind::Create));
    }

    #[test]
    fn test_with_signer_rejects_garbage() {
        assert!(
            RpcTransport::new("http://localhost:8545")
                .with_signer("not-a-key")
                .is_err()
        );
    }
}
