mod client;
mod events;
mod factory;

pub use client::{ClientConfig, Confirmation, Contract, TransactionOutcome};
pub use events::{DecodedEvent, decode_logs};
pub use factory::ContractFactory;
