//! S21 packet normalizer
//!
//! Turns the JSON payload published on the TX/RX topics into one
//! [`CommandRecord`] per command. A packet looks like:
//!
//! ```json
//! {"protocol": "S21", "dump": "0246313030...", "F1": "1001", "RH": 23}
//! ```

use crate::types::{CommandRecord, Direction, Result, Timestamp};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Protocol tag that marks a packet as S21 traffic
pub const S21_PROTOCOL: &str = "S21";

/// Commands shorter than this are not S21 commands
const MIN_COMMAND_LEN: usize = 2;

#[derive(Debug, Deserialize)]
struct S21Envelope {
    #[serde(default)]
    protocol: Option<Value>,
    #[serde(default)]
    dump: Option<Value>,
    #[serde(flatten)]
    commands: Map<String, Value>,
}

/// Parse an S21 packet into command records
///
/// # Returns
/// * `Ok(records)` - one record per command; empty for empty input or a
///   packet from a different protocol
/// * `Err(MonitorError::Json)` - the payload is not a JSON object
pub fn parse_s21_packet(
    data: &str,
    direction: Direction,
    timestamp: Timestamp,
) -> Result<Vec<CommandRecord>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let envelope: S21Envelope = serde_json::from_str(data)?;

    match envelope.protocol {
        Some(Value::String(ref protocol)) if protocol == S21_PROTOCOL => {}
        other => {
            log::trace!("Ignoring non-S21 packet (protocol: {:?})", other);
            return Ok(Vec::new());
        }
    }

    let dump = envelope.dump.as_ref().map(value_text).unwrap_or_default();

    let records = envelope
        .commands
        .iter()
        .filter(|(key, _)| key.chars().count() >= MIN_COMMAND_LEN)
        .map(|(key, value)| CommandRecord {
            command: key.clone(),
            payload: to_hex_string(value),
            raw_payload: if is_empty_value(value) {
                String::new()
            } else {
                value_text(value)
            },
            dump: dump.clone(),
            direction,
            timestamp,
        })
        .collect();

    Ok(records)
}

/// Hex-encode the text of a JSON value, two or more digits per character
///
/// Empty values (null, false, zero, empty string/array/object) encode to "".
pub fn to_hex_string(value: &Value) -> String {
    if is_empty_value(value) {
        return String::new();
    }
    value_text(value)
        .chars()
        .map(|c| format!("{:02X}", c as u32))
        .collect()
}

/// Text form of a JSON value as shown to the user
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
