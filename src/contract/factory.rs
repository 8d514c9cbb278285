use std::collections::BTreeMap;
use std::sync::Arc;

use alloy::primitives::{Address, B256, Bytes};

use super::client::{ClientConfig, Contract};
use crate::abi::{self, AbiEvent};
use crate::artifacts::{ContractArtifacts, ContractDescriptor};
use crate::error::{Error, Result};
use crate::linker;
use crate::options::{self, CallOptions};
use crate::transport::{CallRequest, Transport};

/// Historical labels under which a main-network deployment may be keyed.
const MAIN_NETWORK_ALIASES: &[&str] = &["1", "live", "default"];

/// The two recognized states of an in-flight deployment. The transport
/// may notify more than once; only the first address-bearing notice
/// moves the machine to `Confirmed`.
enum DeployState {
    Pending,
    Confirmed(Address),
}

/// The class-level contract object: owns the per-network artifact table,
/// the transport binding, class defaults, and client configuration.
///
/// Network selection builds a fresh immutable [`ContractDescriptor`];
/// instances handed out earlier keep the descriptor they were built
/// with, so switching networks never races an in-flight call.
pub struct ContractFactory<T> {
    artifacts: ContractArtifacts,
    transport: Option<Arc<T>>,
    defaults: CallOptions,
    config: ClientConfig,
    network_id: Option<String>,
    descriptor: Arc<ContractDescriptor>,
    extra_links: BTreeMap<String, String>,
    extra_events: BTreeMap<B256, AbiEvent>,
}

impl<T: Transport> ContractFactory<T> {
    /// Build a factory over an artifact table. The initial descriptor is
    /// the `"default"` network record (or an empty one), and the network
    /// id is left unpinned so first use auto-detects.
    pub fn new(artifacts: ContractArtifacts) -> Result<Self> {
        let descriptor = match artifacts.networks.get("default") {
            Some(record) => ContractDescriptor::from_artifacts("default", record)?,
            None => ContractDescriptor::empty("default"),
        };

        Ok(Self {
            artifacts,
            transport: None,
            defaults: CallOptions::default(),
            config: ClientConfig::default(),
            network_id: None,
            descriptor: Arc::new(descriptor),
            extra_links: BTreeMap::new(),
            extra_events: BTreeMap::new(),
        })
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind the transport every subsequent call and deployment goes
    /// through.
    pub fn set_transport(&mut self, transport: T) {
        self.transport = Some(Arc::new(transport));
    }

    /// Merge new class-level defaults over the existing ones.
    pub fn set_defaults(&mut self, defaults: &CallOptions) {
        self.defaults = options::merge(&self.defaults, defaults);
    }

    pub fn defaults(&self) -> &CallOptions {
        &self.defaults
    }

    /// The network identifiers present in the artifact table.
    pub fn networks(&self) -> Vec<String> {
        self.artifacts.network_ids()
    }

    /// The active descriptor.
    pub fn descriptor(&self) -> &Arc<ContractDescriptor> {
        &self.descriptor
    }

    /// Record a library link. Applies to the active descriptor (replaced
    /// wholesale) and to every network selected afterwards.
    pub fn link(&mut self, name: &str, address: &str) -> Result<()> {
        self.extra_links
            .insert(name.to_string(), address.to_string());
        self.rebuild_descriptor()
    }

    /// Adopt event schemas from a linked library so its logs decode on
    /// this contract's receipts.
    pub fn merge_events(&mut self, events: &BTreeMap<B256, AbiEvent>) -> Result<()> {
        for (topic, event) in events {
            self.extra_events.insert(*topic, event.clone());
        }
        self.rebuild_descriptor()
    }

    /// Replace the active descriptor unconditionally. An id with no
    /// artifact record yields an empty, undeployed descriptor;
    /// deployment can populate the network later.
    pub fn set_network(&mut self, network_id: &str) -> Result<()> {
        self.network_id = Some(network_id.to_string());
        self.rebuild_descriptor()
    }

    fn rebuild_descriptor(&mut self) -> Result<()> {
        let network_id = self
            .network_id
            .clone()
            .unwrap_or_else(|| self.descriptor.network_id.clone());

        let mut descriptor = match self.artifacts.networks.get(&network_id) {
            Some(record) => ContractDescriptor::from_artifacts(&network_id, record)?,
            None => ContractDescriptor::empty(&network_id),
        };

        for (name, address) in &self.extra_links {
            descriptor.links.insert(name.clone(), address.clone());
        }
        for (topic, event) in &self.extra_events {
            descriptor.events.insert(*topic, event.clone());
        }

        self.descriptor = Arc::new(descriptor);
        Ok(())
    }

    /// Resolve the active network, detecting it from the transport on
    /// first use.
    ///
    /// A pinned id short-circuits without a network round-trip. The
    /// recognized main-network identifier is remapped through its
    /// historical aliases, since a registry may key the same network
    /// under several labels.
    pub async fn resolve_network(&mut self) -> Result<Arc<ContractDescriptor>> {
        if self.network_id.is_some() {
            return Ok(self.descriptor.clone());
        }

        let transport = self.transport.as_ref().ok_or(Error::MissingProvider)?;
        let mut network_id = transport.network_id().await?;

        if network_id == "1" {
            for alias in MAIN_NETWORK_ALIASES {
                if self.artifacts.networks.contains_key(*alias) {
                    network_id = alias.to_string();
                    break;
                }
            }
        }

        if !self.artifacts.networks.contains_key(&network_id) {
            return Err(Error::NetworkNotConfigured(network_id));
        }

        tracing::info!(%network_id, "resolved active network");
        self.set_network(&network_id)?;
        Ok(self.descriptor.clone())
    }

    /// Bind an instance at an explicit address.
    pub fn at(&self, address: Address) -> Result<Contract<T>> {
        let transport = self.transport.clone().ok_or(Error::MissingProvider)?;
        Ok(Contract::new(
            self.descriptor.clone(),
            transport,
            address,
            self.defaults.clone(),
            self.config.clone(),
        ))
    }

    /// Bind the instance recorded as deployed on the active network.
    pub fn deployed(&self) -> Result<Contract<T>> {
        let address = self.descriptor.address.ok_or(Error::MissingAddress)?;
        self.at(address)
    }

    /// Deploy a new instance.
    ///
    /// Fails fast, before any transport submission, when no transport
    /// is bound, no bytecode template exists, or link placeholders
    /// remain unresolved. Unless the caller supplied deployment data in
    /// the options, the linked template (plus encoded constructor
    /// arguments) is used.
    pub async fn deploy(
        &self,
        constructor_args: &[String],
        overrides: Option<&CallOptions>,
    ) -> Result<Contract<T>> {
        let transport = self.transport.as_ref().ok_or(Error::MissingProvider)?;
        let descriptor = &self.descriptor;

        let template = descriptor
            .unlinked_binary
            .as_deref()
            .ok_or(Error::MissingBytecode)?;

        let unresolved = linker::unresolved(template, &descriptor.links);
        if !unresolved.is_empty() {
            return Err(Error::UnlinkedLibraries(unresolved.into_iter().collect()));
        }

        let effective = options::merge(
            &self.defaults,
            overrides.unwrap_or(&CallOptions::default()),
        );

        let mut data = match &effective.data {
            Some(data) => data.to_vec(),
            None => {
                let linked = linker::resolve(template, &descriptor.links);
                hex::decode(linked.strip_prefix("0x").unwrap_or(&linked))
                    .map_err(|_| Error::Abi("bytecode template is not valid hex".into()))?
            }
        };

        match &descriptor.abi.constructor {
            Some(constructor) => {
                data.extend(abi::encode_params(&constructor.inputs, constructor_args)?);
            }
            None if !constructor_args.is_empty() => {
                return Err(Error::Abi(
                    "constructor arguments supplied but the ABI declares no constructor".into(),
                ));
            }
            None => {}
        }

        let request = CallRequest {
            from: effective.from,
            to: None,
            gas: effective.gas,
            gas_price: effective.gas_price,
            value: effective.value,
            data: Some(Bytes::from(data)),
        };

        let mut notices = transport.create(request).await?;
        let mut state = DeployState::Pending;

        while let Some(notice) = notices.recv().await {
            let notice = notice.map_err(Error::Transport)?;
            match state {
                DeployState::Pending => match notice.address {
                    Some(address) => {
                        state = DeployState::Confirmed(address);
                        break;
                    }
                    None => {
                        tracing::debug!(
                            hash = ?notice.transaction_hash,
                            "deployment pending, no address yet"
                        );
                    }
                },
                // Settled already; late notifications are ignored.
                DeployState::Confirmed(_) => break,
            }
        }

        match state {
            DeployState::Confirmed(address) => {
                tracing::info!(%address, "contract deployed");
                self.at(address)
            }
            DeployState::Pending => Err(Error::Transport(crate::error::TransportError::new(
                "deployment ended without a confirmed address",
            ))),
        }
    }
}
