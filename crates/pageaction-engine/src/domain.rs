use std::collections::{BTreeMap, HashSet};

use pageaction_protocol::MessageId;
use url::Url;

use crate::NotificationEvent;

/// Everything observed for one origin domain during a session.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainGroup {
    /// Stable domain key.
    domain: String,
    /// Filed notifications in arrival order.
    notifications: Vec<MessageId>,
    /// Distinct URLs in first-seen order.
    urls: Vec<Url>,
    /// Membership index for `urls`.
    seen_urls: HashSet<String>,
    /// API name to absolute count, as last reported by the tab.
    counters: BTreeMap<String, u64>,
}

impl DomainGroup {
    /// Create an empty group.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            notifications: Vec::new(),
            urls: Vec::new(),
            seen_urls: HashSet::new(),
            counters: BTreeMap::new(),
        }
    }

    /// Domain key.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Filed notification ids, oldest first.
    pub fn notifications(&self) -> &[MessageId] {
        &self.notifications
    }

    /// Distinct URLs, first-seen order.
    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    /// Counter snapshot.
    pub fn counters(&self) -> &BTreeMap<String, u64> {
        &self.counters
    }

    /// Current count for `api`, zero when never reported.
    pub fn counter(&self, api: &str) -> u64 {
        self.counters.get(api).copied().unwrap_or(0)
    }

    /// Sum of all counters.
    pub fn total_count(&self) -> u64 {
        self.counters.values().sum()
    }

    /// Overwrite the counter for `api`, returning the previous value.
    pub fn set_counter(&mut self, api: &str, count: u64) -> Option<u64> {
        self.counters.insert(api.to_string(), count)
    }

    /// Append an event and record its URL. Counters are not touched.
    ///
    /// Returns true when the URL had not been seen before.
    pub fn file_notification(&mut self, event: &NotificationEvent) -> bool {
        self.notifications.push(event.message_id.clone());
        if self.seen_urls.insert(event.url.as_str().to_string()) {
            self.urls.push(event.url.clone());
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use super::*;

    fn ev(id: &str, url: &str) -> NotificationEvent {
        NotificationEvent {
            message_id: MessageId::new(id),
            api: "api".into(),
            url: Url::parse(url).unwrap(),
            error_stack: String::new(),
            count: 1,
            extra: Map::new(),
        }
    }

    #[test]
    fn urls_are_distinct_and_keep_first_seen_order() {
        let mut g = DomainGroup::new("example.com");
        assert!(g.file_notification(&ev("1", "https://example.com/b")));
        assert!(g.file_notification(&ev("2", "https://example.com/a")));
        assert!(!g.file_notification(&ev("3", "https://example.com/b")));
        let urls: Vec<&str> = g.urls().iter().map(Url::as_str).collect();
        assert_eq!(urls, vec!["https://example.com/b", "https://example.com/a"]);
        assert_eq!(g.notifications().len(), 3);
        assert!(g.counters().is_empty());
    }

    #[test]
    fn counters_overwrite() {
        let mut g = DomainGroup::new("example.com");
        assert_eq!(g.set_counter("CanvasRenderingContext2D", 3), None);
        assert_eq!(g.set_counter("CanvasRenderingContext2D", 5), Some(3));
        g.set_counter("AudioBuffer", 2);
        assert_eq!(g.counter("CanvasRenderingContext2D"), 5);
        assert_eq!(g.counter("missing"), 0);
        assert_eq!(g.total_count(), 7);
    }
}
