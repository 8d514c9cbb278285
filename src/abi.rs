use alloy::primitives::{Address, I256, U256, keccak256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Represents a function or event parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<AbiParam>>,
}

/// Represents a callable contract function from the ABI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiFunction {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub outputs: Vec<AbiParam>,
    #[serde(default)]
    pub constant: Option<bool>,
    #[serde(default)]
    pub payable: bool,
    #[serde(rename = "stateMutability", default)]
    pub state_mutability: Option<String>,
}

/// Represents an event schema from the ABI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbiEvent {
    pub name: String,
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub anonymous: bool,
}

/// Represents the constructor entry, when the ABI declares one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbiConstructor {
    #[serde(default)]
    pub inputs: Vec<AbiParam>,
    #[serde(default)]
    pub payable: bool,
}

/// A parsed ABI: the ordered function list, event schemas, and the
/// optional constructor.
#[derive(Debug, Clone, Default)]
pub struct Abi {
    pub functions: Vec<AbiFunction>,
    pub events: Vec<AbiEvent>,
    pub constructor: Option<AbiConstructor>,
}

impl Abi {
    /// Parse an ABI JSON array. Entries of unrecognized kinds (fallback,
    /// receive, ...) are skipped.
    pub fn parse(abi_json: &Value) -> Result<Self> {
        let entries = abi_json
            .as_array()
            .ok_or_else(|| Error::Abi("ABI must be a JSON array".into()))?;

        let mut abi = Abi::default();

        for entry in entries {
            let entry_type = entry.get("type").and_then(|t| t.as_str()).unwrap_or("");
            match entry_type {
                "function" => {
                    let function: AbiFunction = serde_json::from_value(entry.clone())
                        .map_err(|e| Error::Abi(format!("bad function entry: {e}")))?;
                    abi.functions.push(function);
                }
                "event" => {
                    let event: AbiEvent = serde_json::from_value(entry.clone())
                        .map_err(|e| Error::Abi(format!("bad event entry: {e}")))?;
                    abi.events.push(event);
                }
                "constructor" => {
                    let constructor: AbiConstructor = serde_json::from_value(entry.clone())
                        .map_err(|e| Error::Abi(format!("bad constructor entry: {e}")))?;
                    abi.constructor = Some(constructor);
                }
                _ => {}
            }
        }

        Ok(abi)
    }

    /// Parse an ABI from a JSON string.
    pub fn parse_str(abi_str: &str) -> Result<Self> {
        let abi_json: Value = serde_json::from_str(abi_str)
            .map_err(|e| Error::Abi(format!("failed to parse ABI as JSON: {e}")))?;
        Self::parse(&abi_json)
    }

    /// Look up a function entry by name.
    pub fn function(&self, name: &str) -> Option<&AbiFunction> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Look up an event schema by name.
    pub fn event(&self, name: &str) -> Option<&AbiEvent> {
        self.events.iter().find(|e| e.name == name)
    }
}

impl AbiFunction {
    /// Whether the function is read-only (a `call`, not a transaction).
    pub fn is_constant(&self) -> bool {
        if let Some(constant) = self.constant {
            return constant;
        }
        matches!(
            self.state_mutability.as_deref(),
            Some("view") | Some("pure")
        )
    }

    /// Canonical signature string, e.g. `transfer(address,uint256)`.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.inputs.iter().map(encode_param_type).collect();
        format!("{}({})", self.name, params.join(","))
    }

    /// The 4-byte selector derived from the canonical signature.
    pub fn selector(&self) -> [u8; 4] {
        let hash = keccak256(self.signature().as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }
}

fn encode_param_type(param: &AbiParam) -> String {
    if let Some(components) = &param.components {
        // Tuple type
        let inner: Vec<String> = components.iter().map(encode_param_type).collect();
        format!("({})", inner.join(","))
    } else {
        param.param_type.clone()
    }
}

/// Encode calldata for a function call: selector followed by the
/// ABI-encoded arguments.
pub fn encode_call(function: &AbiFunction, values: &[String]) -> Result<Vec<u8>> {
    let mut calldata = function.selector().to_vec();
    calldata.extend(encode_params(&function.inputs, values)?);
    Ok(calldata)
}

/// ABI-encode a parameter list. Static values land in the head; dynamic
/// values get an offset word and their payload in the tail.
pub fn encode_params(params: &[AbiParam], values: &[String]) -> Result<Vec<u8>> {
    if params.len() != values.len() {
        return Err(Error::Abi(format!(
            "expected {} arguments, got {}",
            params.len(),
            values.len()
        )));
    }

    let head_len = params.len() * 32;
    let mut head = Vec::with_capacity(head_len);
    let mut tail: Vec<u8> = Vec::new();

    for (param, value) in params.iter().zip(values) {
        if is_dynamic(&param.param_type) {
            let offset = U256::from(head_len + tail.len());
            head.extend_from_slice(&offset.to_be_bytes::<32>());
            tail.extend(encode_dynamic(&param.param_type, value)?);
        } else {
            head.extend_from_slice(&encode_word(&param.param_type, value)?);
        }
    }

    head.extend(tail);
    Ok(head)
}

/// Encode a single static parameter value into one 32-byte word.
fn encode_word(param_type: &str, value: &str) -> Result<[u8; 32]> {
    let mut word = [0u8; 32];

    match param_type {
        "address" => {
            let addr: Address = value
                .parse()
                .map_err(|_| Error::Abi(format!("invalid address: {value}")))?;
            word[12..].copy_from_slice(addr.as_slice());
        }
        "bool" => {
            let b = value.eq_ignore_ascii_case("true") || value == "1";
            word[31] = b as u8;
        }
        t if t.starts_with("uint") => {
            let num = parse_uint(value)?;
            word = num.to_be_bytes::<32>();
        }
        t if t.starts_with("int") => {
            let num = I256::from_dec_str(value)
                .map_err(|_| Error::Abi(format!("invalid {t}: {value}")))?;
            word = num.to_be_bytes::<32>();
        }
        t if t.starts_with("bytes") => {
            let width: usize = t[5..]
                .parse()
                .map_err(|_| Error::Abi(format!("unsupported parameter type: {t}")))?;
            let raw = hex::decode(value.strip_prefix("0x").unwrap_or(value))
                .map_err(|_| Error::Abi(format!("invalid {t}: {value}")))?;
            if width == 0 || width > 32 || raw.len() > width {
                return Err(Error::Abi(format!("invalid {t}: {value}")));
            }
            word[..raw.len()].copy_from_slice(&raw);
        }
        t => return Err(Error::Abi(format!("unsupported parameter type: {t}"))),
    }

    Ok(word)
}

/// Encode a dynamic value: length word followed by the payload padded to
/// a 32-byte boundary.
fn encode_dynamic(param_type: &str, value: &str) -> Result<Vec<u8>> {
    let payload: Vec<u8> = match param_type {
        "string" => value.as_bytes().to_vec(),
        "bytes" => hex::decode(value.strip_prefix("0x").unwrap_or(value))
            .map_err(|_| Error::Abi(format!("invalid bytes: {value}")))?,
        t => return Err(Error::Abi(format!("unsupported parameter type: {t}"))),
    };

    let mut out = U256::from(payload.len()).to_be_bytes::<32>().to_vec();
    out.extend_from_slice(&payload);
    while out.len() % 32 != 0 {
        out.push(0);
    }
    Ok(out)
}

fn parse_uint(value: &str) -> Result<U256> {
    if let Some(hex_digits) = value.strip_prefix("0x") {
        U256::from_str_radix(hex_digits, 16)
            .map_err(|_| Error::Abi(format!("invalid uint: {value}")))
    } else {
        U256::from_str_radix(value, 10).map_err(|_| Error::Abi(format!("invalid uint: {value}")))
    }
}

fn is_dynamic(param_type: &str) -> bool {
    matches!(param_type, "bytes" | "string")
}

/// Decode return data (or event payloads) against a parameter list.
pub fn decode_params(params: &[AbiParam], data: &[u8]) -> Result<Vec<String>> {
    if params.is_empty() || data.is_empty() {
        return Ok(Vec::new());
    }

    let mut results = Vec::with_capacity(params.len());

    for (i, param) in params.iter().enumerate() {
        let word = word_at(data, i * 32, &param.param_type)?;
        if is_dynamic(&param.param_type) {
            let offset = usize::try_from(U256::from_be_slice(word))
                .map_err(|_| Error::Abi(format!("bad offset for {}", param.param_type)))?;
            let len_word = word_at(data, offset, &param.param_type)?;
            let len = usize::try_from(U256::from_be_slice(len_word))
                .map_err(|_| Error::Abi(format!("bad length for {}", param.param_type)))?;
            // Corrupt offset or length words must surface as errors, not
            // arithmetic overflow.
            let payload = offset
                .checked_add(32)
                .and_then(|start| Some(start..start.checked_add(len)?))
                .and_then(|range| data.get(range))
                .ok_or_else(|| Error::Abi(format!("insufficient data for {}", param.param_type)))?;
            results.push(match param.param_type.as_str() {
                "string" => String::from_utf8_lossy(payload).into_owned(),
                _ => format!("0x{}", hex::encode(payload)),
            });
        } else {
            results.push(decode_word(&param.param_type, word)?);
        }
    }

    Ok(results)
}

/// Decode a single static 32-byte word. Unknown types fall back to their
/// raw hex representation.
pub fn decode_word(param_type: &str, word: &[u8; 32]) -> Result<String> {
    let decoded = match param_type {
        "address" => format!("0x{}", hex::encode(&word[12..])),
        "bool" => (word[31] != 0).to_string(),
        t if t.starts_with("uint") => U256::from_be_slice(word).to_string(),
        t if t.starts_with("int") => I256::from_be_bytes::<32>(*word).to_string(),
        t if t.starts_with("bytes") && t.len() > 5 => {
            let width: usize = t[5..].parse().unwrap_or(32);
            format!("0x{}", hex::encode(&word[..width.min(32)]))
        }
        // Dynamic types landing here arrive via indexed event topics,
        // where only their hash is available.
        _ => format!("0x{}", hex::encode(word)),
    };
    Ok(decoded)
}

fn word_at<'a>(data: &'a [u8], offset: usize, param_type: &str) -> Result<&'a [u8; 32]> {
    offset
        .checked_add(32)
        .and_then(|end| data.get(offset..end))
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| Error::Abi(format!("insufficient data for {param_type}")))
}
