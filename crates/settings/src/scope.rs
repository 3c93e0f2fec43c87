//! Scope keys for URL-specific settings.

use tracing::warn;
use url::Url;

use crate::{Error, PatternCache, Result};

/// Where a scoped value applies.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    /// A host and all of its subdomains.
    Domain(String),
    /// An anchored regular expression matched against the full URL.
    Pattern(String),
}

impl Scope {
    /// Classify a scope string: `^…` is a pattern, anything else a domain.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with('^') {
            Self::Pattern(raw.to_string())
        } else {
            Self::Domain(raw.trim_end_matches('.').to_ascii_lowercase())
        }
    }

    /// Fail if a pattern scope does not compile.
    pub(crate) fn validate(&self, cache: &PatternCache) -> Result<()> {
        if let Self::Pattern(p) = self {
            cache
                .compile(p)
                .map_err(|message| Error::InvalidPattern {
                    pattern: p.clone(),
                    message,
                })?;
        }
        Ok(())
    }

    /// True when this scope applies to `url`.
    pub fn matches(&self, url: &Url, cache: &PatternCache) -> bool {
        match self {
            Self::Domain(domain) => {
                let Some(host) = url.host_str() else {
                    return false;
                };
                let host = host.to_ascii_lowercase();
                host == *domain
                    || host
                        .strip_suffix(domain.as_str())
                        .is_some_and(|rest| rest.ends_with('.'))
            }
            Self::Pattern(p) => match cache.is_match(p, url.as_str()) {
                Ok(matched) => matched,
                Err(e) => {
                    warn!(pattern = %p, error = %e, "scope_pattern_invalid");
                    false
                }
            },
        }
    }

    /// The scope text as written.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Domain(s) | Self::Pattern(s) => s,
        }
    }
}
