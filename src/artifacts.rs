use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::abi::{Abi, AbiEvent};
use crate::error::{Error, Result};
use crate::linker;

/// One network's slice of the generated artifact file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkArtifacts {
    /// Raw ABI array as emitted by the compiler toolchain.
    #[serde(default)]
    pub abi: Value,
    /// Bytecode template, possibly containing link placeholders.
    #[serde(default)]
    pub unlinked_binary: Option<String>,
    /// Address of the deployed instance, if any.
    #[serde(default)]
    pub address: Option<String>,
    /// Event schemas keyed by their topic identifier.
    #[serde(default)]
    pub events: BTreeMap<String, AbiEvent>,
    /// Library name to linked address.
    #[serde(default)]
    pub links: BTreeMap<String, String>,
    /// Millisecond timestamp of the last artifact regeneration.
    #[serde(default)]
    pub updated_at: Option<u64>,
}

/// The whole artifact: contract name plus every per-network record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractArtifacts {
    pub contract_name: String,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkArtifacts>,
}

impl ContractArtifacts {
    /// Parse an artifact from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Abi(format!("failed to parse artifact: {e}")))
    }

    /// Load an artifact from a JSON file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Abi(format!("failed to read {}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    /// The configured network identifiers.
    pub fn network_ids(&self) -> Vec<String> {
        self.networks.keys().cloned().collect()
    }
}

/// The immutable, resolved view of one network's deployment record.
///
/// Constructed once per network selection and shared behind an `Arc`;
/// switching networks builds a fresh descriptor rather than mutating
/// this one.
#[derive(Debug, Clone, Default)]
pub struct ContractDescriptor {
    pub network_id: String,
    pub abi: Abi,
    pub unlinked_binary: Option<String>,
    pub address: Option<Address>,
    pub events: BTreeMap<B256, AbiEvent>,
    pub links: BTreeMap<String, String>,
    pub updated_at: Option<u64>,
}

impl ContractDescriptor {
    /// An empty, undeployed descriptor for a network with no artifact
    /// record. Deployment can still populate the network later.
    pub fn empty(network_id: &str) -> Self {
        Self {
            network_id: network_id.to_string(),
            ..Default::default()
        }
    }

    /// Build the descriptor for one network record.
    pub fn from_artifacts(network_id: &str, record: &NetworkArtifacts) -> Result<Self> {
        let abi = if record.abi.is_null() {
            Abi::default()
        } else {
            Abi::parse(&record.abi)?
        };

        let address = match &record.address {
            Some(raw) => Some(
                raw.parse::<Address>()
                    .map_err(|_| Error::Abi(format!("invalid deployed address: {raw}")))?,
            ),
            None => None,
        };

        let mut events = BTreeMap::new();
        for (topic, event) in &record.events {
            let topic: B256 = topic
                .parse()
                .map_err(|_| Error::Abi(format!("invalid event topic: {topic}")))?;
            events.insert(topic, event.clone());
        }

        tracing::debug!(
            network_id,
            functions = abi.functions.len(),
            events = events.len(),
            deployed = address.is_some(),
            "built contract descriptor"
        );

        Ok(Self {
            network_id: network_id.to_string(),
            abi,
            unlinked_binary: record.unlinked_binary.clone(),
            address,
            events,
            links: record.links.clone(),
            updated_at: record.updated_at,
        })
    }

    /// The bytecode template with every known link substituted in.
    pub fn linked_binary(&self) -> Option<String> {
        self.unlinked_binary
            .as_deref()
            .map(|template| linker::resolve(template, &self.links))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTIFACT: &str = r#"{
        "contract_name": "ABM",
        "networks": {
            "1": {
                "abi": [
                    {
                        "type": "function",
                        "name": "tick",
                        "inputs": [],
                        "outputs": [],
                        "constant": false,
                        "payable": false
                    }
                ],
                "unlinked_binary": "0x6060__SirMath____5260",
                "address": "0xb20ab177ff2b2ac2a9c079451f6e593ed50b0281",
                "events": {
                    "0x5a6e5ec3bf040ed041d47a7b57dbb50b489a1c7335df9cb405bd97d610e8916e": {
                        "name": "simulationStep",
                        "anonymous": false,
                        "inputs": [
                            {"indexed": false, "name": "order", "type": "uint64"}
                        ]
                    }
                },
                "links": {"SirMath": "0x00000000000000000000000000000000000000aa"},
                "updated_at": 1483931367504
            }
        }
    }"#;

    #[test]
    fn test_parse_artifact() {
        let artifacts = ContractArtifacts::from_json(ARTIFACT).unwrap();
        assert_eq!(artifacts.contract_name, "ABM");
        assert_eq!(artifacts.network_ids(), vec!["1".to_string()]);
    }

    #[test]
    fn test_descriptor_from_record() {
        let artifacts = ContractArtifacts::from_json(ARTIFACT).unwrap();
        let descriptor =
            ContractDescriptor::from_artifacts("1", &artifacts.networks["1"]).unwrap();

        assert_eq!(descriptor.network_id, "1");
        assert_eq!(descriptor.abi.functions.len(), 1);
        assert_eq!(descriptor.events.len(), 1);
        assert_eq!(
            descriptor.address.unwrap().to_string().to_lowercase(),
            "0xb20ab177ff2b2ac2a9c079451f6e593ed50b0281"
        );
        assert_eq!(descriptor.updated_at, Some(1483931367504));
    }

    #[test]
    fn test_linked_binary_substitutes_links() {
        let artifacts = ContractArtifacts::from_json(ARTIFACT).unwrap();
        let descriptor =
            ContractDescriptor::from_artifacts("1", &artifacts.networks["1"]).unwrap();

        assert_eq!(
            descriptor.linked_binary().unwrap(),
            "0x606000000000000000000000000000000000000000aa5260"
        );
    }

    #[test]
    fn test_empty_descriptor() {
        let descriptor = ContractDescriptor::empty("1337");
        assert_eq!(descriptor.network_id, "1337");
        assert!(descriptor.unlinked_binary.is_none());
        assert!(descriptor.address.is_none());
        assert!(descriptor.linked_binary().is_none());
    }

    #[test]
    fn test_bad_topic_is_an_error() {
        let record = NetworkArtifacts {
            events: BTreeMap::from([("not-a-topic".to_string(), AbiEvent {
                name: "x".to_string(),
                inputs: vec![],
                anonymous: false,
            })]),
            ..Default::default()
        };
        assert!(ContractDescriptor::from_artifacts("1", &record).is_err());
    }
}
