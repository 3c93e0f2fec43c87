//! Plain-text rendering of the domain table and view messages.

use std::fmt::Write;

use pageaction_engine::{ActionEntry, Actions, Messages, Table};
use pageaction_protocol::ViewMsg;

/// Render the button row for `entries` with localized labels.
fn buttons(entries: &[ActionEntry], messages: &dyn Messages) -> String {
    entries
        .iter()
        .map(|e| format!("[{}]", messages.get(&e.name)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render every domain group, its counters, and its notifications.
pub fn table(table: &Table, actions: &Actions, messages: &dyn Messages) -> String {
    let mut out = String::new();
    let domain_row = buttons(&actions.domain.entries(), messages);
    let notification_row = buttons(&actions.notification.entries(), messages);
    for group in table.groups() {
        let name = if group.domain().is_empty() {
            "(no host)"
        } else {
            group.domain()
        };
        let _ = writeln!(out, "{name} ({} calls)  {domain_row}", group.total_count());
        for (api, count) in group.counters() {
            let _ = writeln!(out, "    {api}: {count}");
        }
        for event in table.notifications_of(group.domain()) {
            let _ = writeln!(
                out,
                "  #{} {} {}  {notification_row}",
                event.message_id, event.api, event.url
            );
        }
    }
    let _ = writeln!(out, "{}", buttons(&actions.global.entries(), messages));
    out
}

/// One line for a view message, or `None` for messages the terminal ignores.
pub fn view_line(msg: &ViewMsg) -> Option<String> {
    match msg {
        ViewMsg::Alert(text) => Some(format!("alert: {text}")),
        ViewMsg::Theme(sheet) => Some(format!("stylesheet: {sheet}")),
        ViewMsg::OpenOptions => Some("open options page".into()),
        ViewMsg::Close => Some("close".into()),
        ViewMsg::Log {
            level,
            target,
            message,
        } => Some(format!("log {level} {target}: {message}")),
        ViewMsg::DomainUpdated { .. } | ViewMsg::NotificationFiled { .. } => None,
    }
}
