use std::collections::BTreeMap;

use alloy::primitives::B256;

use crate::abi::{self, AbiEvent, AbiParam};
use crate::error::{Error, Result};
use crate::transport::LogEntry;

/// A raw log entry decoded against its event schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEvent {
    pub name: String,
    pub fields: BTreeMap<String, String>,
}

/// Decode receipt logs against a topic table.
///
/// Entries whose leading topic has no schema are silently dropped;
/// unrelated log records are expected. Output order matches input order,
/// which callers may rely on as the emission order of effects within one
/// transaction. Pure: re-decoding the same logs against the same table
/// yields the same events.
pub fn decode_logs(
    logs: &[LogEntry],
    topic_table: &BTreeMap<B256, AbiEvent>,
) -> Result<Vec<DecodedEvent>> {
    let mut decoded = Vec::new();

    for log in logs {
        let Some(topic) = log.topics.first() else {
            continue;
        };
        let Some(schema) = topic_table.get(topic) else {
            tracing::trace!(%topic, "skipping log with unrecognized topic");
            continue;
        };
        decoded.push(decode_log(log, schema)?);
    }

    Ok(decoded)
}

/// Decode a single matched log: indexed fields come from the topics,
/// everything else from the data words, in schema order.
fn decode_log(log: &LogEntry, schema: &AbiEvent) -> Result<DecodedEvent> {
    let unindexed: Vec<AbiParam> = schema
        .inputs
        .iter()
        .filter(|p| !p.indexed)
        .cloned()
        .collect();
    let mut data_values = abi::decode_params(&unindexed, &log.data)?.into_iter();

    let mut fields = BTreeMap::new();
    let mut topic_index = 1; // topics[0] names the event

    for param in &schema.inputs {
        let value = if param.indexed {
            let topic = log.topics.get(topic_index).ok_or_else(|| {
                Error::Abi(format!(
                    "missing topic for indexed field '{}' of event '{}'",
                    param.name, schema.name
                ))
            })?;
            topic_index += 1;
            abi::decode_word(&param.param_type, &topic.0)?
        } else {
            data_values.next().ok_or_else(|| {
                Error::Abi(format!(
                    "missing data for field '{}' of event '{}'",
                    param.name, schema.name
                ))
            })?
        };
        fields.insert(param.name.clone(), value);
    }

    Ok(DecodedEvent {
        name: schema.name.clone(),
        fields,
    })
}
