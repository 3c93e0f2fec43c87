use pageaction_protocol::{MessageId, RawNotification};
use serde_json::{Map, Value};
use url::Url;

use crate::MalformedEvent;

/// A parsed fingerprinting notification. Immutable once filed.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationEvent {
    /// Session-unique identity.
    pub message_id: MessageId,
    /// Fingerprinting API name.
    pub api: String,
    /// Document URL that triggered the API.
    pub url: Url,
    /// Raw stack captured at the call site.
    pub error_stack: String,
    /// Number of calls folded into this notification.
    pub count: u64,
    /// Additional attributes delivered by the tab.
    pub extra: Map<String, Value>,
}

impl NotificationEvent {
    /// Materialize a raw payload, parsing its URL.
    pub fn from_raw(raw: RawNotification) -> Result<Self, MalformedEvent> {
        let url = Url::parse(&raw.url)?;
        Ok(Self {
            message_id: raw.message_id,
            api: raw.api,
            url,
            error_stack: raw.error_stack,
            count: raw.count.unwrap_or(1),
            extra: raw.extra,
        })
    }

    /// Domain key this event is filed under.
    pub fn domain(&self) -> String {
        domain_of(&self.url)
    }
}

/// Domain key for a URL: its host, or empty for host-less URLs.
pub fn domain_of(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn raw(url: &str) -> RawNotification {
        RawNotification::from_value(json!({
            "messageId": "m1",
            "api": "HTMLCanvasElement.toDataURL",
            "url": url,
        }))
        .unwrap()
    }

    #[test]
    fn parses_url_and_defaults_count() {
        let ev = NotificationEvent::from_raw(raw("https://www.example.com/a?b=1")).unwrap();
        assert_eq!(ev.domain(), "www.example.com");
        assert_eq!(ev.count, 1);
        assert_eq!(ev.error_stack, "");
    }

    #[test]
    fn bad_url_is_malformed() {
        let err = NotificationEvent::from_raw(raw("::not a url")).unwrap_err();
        assert!(err.reason.starts_with("bad url"));
    }

    #[test]
    fn hostless_urls_group_under_empty_domain() {
        let ev = NotificationEvent::from_raw(raw("file:///tmp/x.html")).unwrap();
        assert_eq!(ev.domain(), "");
    }
}
