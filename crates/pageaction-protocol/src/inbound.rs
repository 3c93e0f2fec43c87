//! Inbound transport payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::{MessageId, ipc::codec::Error};

/// A demultiplexed inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Absolute counter snapshot for one domain.
    Counter(CounterUpdate),
    /// Ordered batch of raw notification payloads. Items are parsed lazily by
    /// the ingestion pipeline so one bad item cannot reject the whole batch.
    Notifications(Vec<Value>),
}

/// Per-API counter snapshot for a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterUpdate {
    /// Domain the counters belong to.
    pub domain: String,
    /// API name to absolute count.
    pub counts: BTreeMap<String, u64>,
    /// Keys whose value was not a non-negative integer.
    pub skipped: Vec<String>,
}

impl CounterUpdate {
    /// Parse the counter object. The domain is taken from its `domain` field,
    /// or from the host of `fallback_url` when that field is absent.
    pub fn from_value(value: &Value, fallback_url: Option<&str>) -> Result<Self, Error> {
        let Value::Object(fields) = value else {
            return Err(Error::Malformed("counter payload is not an object".into()));
        };
        let domain = match fields.get("domain") {
            Some(Value::String(d)) => d.clone(),
            Some(other) => {
                return Err(Error::Malformed(format!(
                    "counter domain is not a string: {other}"
                )));
            }
            None => domain_from_url(fallback_url)?,
        };
        let mut counts = BTreeMap::new();
        let mut skipped = Vec::new();
        for (k, v) in fields.iter().filter(|(k, _)| k.as_str() != "domain") {
            match v.as_u64() {
                Some(n) => {
                    counts.insert(k.clone(), n);
                }
                None => skipped.push(k.clone()),
            }
        }
        Ok(Self {
            domain,
            counts,
            skipped,
        })
    }
}

/// Derive a domain key from the sibling `url` field of a counter message.
fn domain_from_url(url: Option<&str>) -> Result<String, Error> {
    let Some(raw) = url else {
        return Err(Error::Malformed("counter payload has no domain".into()));
    };
    let parsed = Url::parse(raw)?;
    Ok(parsed.host_str().unwrap_or_default().to_string())
}

/// One notification as delivered by the monitored tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNotification {
    /// Session-unique identifier.
    pub message_id: MessageId,
    /// Fingerprinting API name, e.g. `HTMLCanvasElement.toDataURL`.
    pub api: String,
    /// URL of the document that triggered the API, unparsed.
    pub url: String,
    /// Raw stack captured when the API was called.
    #[serde(default)]
    pub error_stack: String,
    /// Number of calls folded into this notification.
    #[serde(default)]
    pub count: Option<u64>,
    /// Any additional attributes the tab attached.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawNotification {
    /// Parse one batch item.
    pub fn from_value(value: Value) -> Result<Self, Error> {
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn counter_uses_domain_field_and_skips_non_numeric() {
        let v = json!({
            "domain": "example.com",
            "CanvasRenderingContext2D": 3,
            "junk": "x",
            "negative": -1,
            "fractional": 3.0
        });
        let c = CounterUpdate::from_value(&v, None).unwrap();
        assert_eq!(c.domain, "example.com");
        assert_eq!(c.counts.len(), 1);
        assert_eq!(c.counts["CanvasRenderingContext2D"], 3);
        assert_eq!(c.skipped, vec!["fractional", "junk", "negative"]);
    }

    #[test]
    fn counter_falls_back_to_url_host() {
        let v = json!({"fakedReadout": 2});
        let c = CounterUpdate::from_value(&v, Some("https://sub.example.org/page?q=1")).unwrap();
        assert_eq!(c.domain, "sub.example.org");
        assert_eq!(c.counts["fakedReadout"], 2);
    }

    #[test]
    fn counter_without_domain_is_malformed() {
        let v = json!({"fakedReadout": 2});
        assert!(CounterUpdate::from_value(&v, None).is_err());
        assert!(CounterUpdate::from_value(&v, Some("not a url")).is_err());
    }

    #[test]
    fn raw_notification_accepts_numeric_ids_and_keeps_extras() {
        let v = json!({
            "messageId": 17,
            "api": "HTMLCanvasElement.toDataURL",
            "url": "https://example.com/",
            "errorStack": "f@https://example.com/a.js:1:2",
            "dataURL": "data:,"
        });
        let n = RawNotification::from_value(v).unwrap();
        assert_eq!(n.message_id, MessageId::new("17"));
        assert_eq!(n.count, None);
        assert!(n.extra.contains_key("dataURL"));
    }

    #[test]
    fn raw_notification_missing_api_fails() {
        let v = json!({"messageId": "a", "url": "https://example.com/"});
        assert!(RawNotification::from_value(v).is_err());
    }
}
