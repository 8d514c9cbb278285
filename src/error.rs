use std::time::Duration;

use alloy::primitives::B256;
use thiserror::Error;

/// An error reported by the transport itself, carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Everything that can go wrong in the invocation layer.
#[derive(Debug, Error)]
pub enum Error {
    /// No transport has been bound to the factory.
    #[error("no provider set; bind a transport before issuing requests")]
    MissingProvider,

    /// The active network record carries no bytecode template.
    #[error("contract binary not set; can't deploy new instance")]
    MissingBytecode,

    /// The active network record carries no deployed address.
    #[error("cannot find deployed address: contract not deployed or address not set")]
    MissingAddress,

    /// The detected or requested network has no artifact record.
    #[error("can't find artifacts for network id '{0}'")]
    NetworkNotConfigured(String),

    /// Deployment was attempted while link placeholders remain.
    #[error(
        "contract contains unresolved libraries; deploy and link the following before deploying: {}",
        .0.join(", ")
    )]
    UnlinkedLibraries(Vec<String>),

    /// The name is not part of the contract's ABI.
    #[error("function '{0}' is not part of the contract interface")]
    UnknownFunction(String),

    /// Malformed schema, arguments, or return data.
    #[error("abi error: {0}")]
    Abi(String),

    /// Propagated transport failure, message untouched.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Confirmation polling gave up. The transaction may still confirm
    /// later; this is a client-side timeout, not proof of failure.
    #[error("transaction {hash} wasn't processed in {} seconds", .timeout.as_secs())]
    Timeout { hash: B256, timeout: Duration },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
