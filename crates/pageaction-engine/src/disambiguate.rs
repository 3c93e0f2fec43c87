//! Resolve "whole domain or one URL?" into a single match target.
//!
//! The user first picks the bare domain or one observed URL. A URL is offered
//! as an anchored pattern (`^…$`) that matches exactly that URL; picking it
//! opens a second, editable prompt so the pattern can be widened or narrowed.

use std::collections::HashSet;

use tracing::debug;
use url::Url;

use crate::{Choice, Modal};

/// Characters escaped when turning a URL into a pattern.
const META: &[char] = &[
    '\\', '+', '*', '?', '[', '^', ']', '$', '(', ')', '{', '}', '=', '!', '|', '.',
];

/// Anchored pattern matching exactly `url`.
pub fn anchored_pattern(url: &str) -> String {
    let mut out = String::with_capacity(url.len() + 8);
    out.push('^');
    for c in url.chars() {
        if META.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('$');
    out
}

/// The choice list: the domain first, then one pattern per distinct URL.
pub fn build_choices(domain: &str, urls: &[Url]) -> Vec<Choice> {
    let mut seen = HashSet::new();
    let mut choices = vec![Choice::plain(domain)];
    for url in urls {
        if seen.insert(url.as_str()) {
            choices.push(Choice {
                text: url.to_string(),
                value: anchored_pattern(url.as_str()),
            });
        }
    }
    choices
}

/// Run the two-step prompt. `None` means the user cancelled at some step.
pub async fn resolve(
    modal: &dyn Modal,
    domain: &str,
    urls: &[Url],
    select_text: &str,
    input_text: &str,
) -> Option<String> {
    let choices = build_choices(domain, urls);
    let picked = modal.choice(select_text, &choices).await?;
    let resolved = if picked.starts_with('^') {
        modal.prompt(input_text, &picked).await?
    } else {
        picked
    };
    if resolved.trim().is_empty() {
        debug!(domain, "disambiguation_empty");
        return None;
    }
    Some(resolved)
}
