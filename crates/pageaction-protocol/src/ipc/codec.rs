use serde_json::{Map, Value};
use thiserror::Error;

use crate::{CounterUpdate, Inbound, Namespace, Outbound};

/// Errors from decoding transport messages.
#[derive(Debug, Error)]
pub enum Error {
    /// The transport message was not a JSON object.
    #[error("expected object message payload, got {0}")]
    InvalidValueType(Value),
    /// A payload was structurally wrong.
    #[error("malformed payload: {0}")]
    Malformed(String),
    /// Deserialization via serde_json failed.
    #[error(transparent)]
    Decode(#[from] serde_json::Error),
    /// A URL field could not be parsed.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Split one transport message into the inbound messages it carries.
///
/// A message may carry a counter snapshot, a notification batch, both, or
/// neither (other traffic on the same channel). When both are present the
/// counter comes first. A non-array or empty batch is ignored.
///
/// # Errors
/// Returns an error when the message is not an object or its counter
/// snapshot is malformed.
pub fn decode_inbound(ns: &Namespace, value: &Value) -> Result<Vec<Inbound>, Error> {
    let Value::Object(fields) = value else {
        return Err(Error::InvalidValueType(value.clone()));
    };
    let mut out = Vec::new();
    if let Some(counter) = fields.get(&ns.counter_key())
        && !counter.is_null()
    {
        let url = fields.get("url").and_then(Value::as_str);
        out.push(Inbound::Counter(CounterUpdate::from_value(counter, url)?));
    }
    if let Some(Value::Array(items)) = fields.get(&ns.notifications_key())
        && !items.is_empty()
    {
        out.push(Inbound::Notifications(items.clone()));
    }
    Ok(out)
}

/// Encode an outbound message as a transport object.
pub fn encode_outbound(ns: &Namespace, msg: &Outbound) -> Value {
    let mut map = Map::new();
    match msg {
        Outbound::SendNotifications(tab) => {
            map.insert(ns.send_notifications_key(), Value::from(tab.0));
        }
    }
    Value::Object(map)
}
