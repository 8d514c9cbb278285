//! Transactional contract client.
//!
//! Turns a static interface description (an ABI plus per-network
//! deployment artifacts) into a client that can issue read-only calls,
//! submit state-changing transactions and poll them to confirmation,
//! decode receipt logs into named events, and deploy new instances once
//! library link placeholders are resolved.
//!
//! The remote execution environment is reached through the [`Transport`]
//! trait; [`RpcTransport`] is the bundled implementation. A
//! [`ContractFactory`] selects the active network and hands out bound
//! [`Contract`] instances, each holding an immutable descriptor
//! snapshot.

pub mod abi;
pub mod artifacts;
pub mod contract;
pub mod error;
pub mod linker;
pub mod options;
pub mod transport;

pub use abi::{Abi, AbiConstructor, AbiEvent, AbiFunction, AbiParam};
pub use artifacts::{ContractArtifacts, ContractDescriptor, NetworkArtifacts};
pub use contract::{
    ClientConfig, Confirmation, Contract, ContractFactory, DecodedEvent, TransactionOutcome,
};
pub use error::{Error, Result, TransportError};
pub use options::{CallOptions, merge};
pub use transport::{CallRequest, DeployNotice, LogEntry, Receipt, RpcTransport, Transport};
