use std::collections::BTreeMap;

use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Transaction parameters attached to a call, send, or deployment.
///
/// A per-call instance is produced by [`merge`]-ing class-level defaults
/// with caller-supplied overrides; neither input is ever mutated. Unknown
/// keys ride along in `extra` and are passed through untouched; value
/// validation is the transport's job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub fn gas(mut self, gas: u64) -> Self {
        self.gas = Some(gas);
        self
    }

    pub fn gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn data(mut self, data: Bytes) -> Self {
        self.data = Some(data);
        self
    }
}

/// Combine default options with call-site overrides. Keys present in
/// `overrides` win; everything else comes from `defaults`. Pure function:
/// both inputs are left untouched.
pub fn merge(defaults: &CallOptions, overrides: &CallOptions) -> CallOptions {
    let mut extra = defaults.extra.clone();
    for (key, value) in &overrides.extra {
        extra.insert(key.clone(), value.clone());
    }

    CallOptions {
        from: overrides.from.or(defaults.from),
        gas: overrides.gas.or(defaults.gas),
        gas_price: overrides.gas_price.or(defaults.gas_price),
        value: overrides.value.or(defaults.value),
        data: overrides.data.clone().or_else(|| defaults.data.clone()),
        extra,
    }
}
