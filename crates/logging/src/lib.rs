#![warn(missing_docs)]

//! Logging setup shared by the page action binary and its tests.
//!
//! - [`LogArgs`]: command-line flags selecting a filter
//! - [`FilterSpec`]: the resolved filter directive and where it came from
//! - [`fmt`]: logfmt-style rendering of events
//! - [`forward`]: mirroring log events into the page action view

use std::{env, fmt as stdfmt};

use clap::Args;
use tracing_subscriber::EnvFilter;

pub mod fmt;
pub mod forward;

/// Crate targets whose logs the level flags apply to.
pub const OUR_CRATES: &[&str] = &[
    "pageaction",
    "pageaction_engine",
    "pageaction_protocol",
    "settings",
    "logging",
];

/// Level used when nothing else selects one.
const DEFAULT_LEVEL: &str = "info";

/// Logging controls for CLI apps.
#[derive(Debug, Clone, Default, Args)]
pub struct LogArgs {
    /// Set global log level to trace (our crates only)
    #[arg(long, conflicts_with_all = ["debug", "log_level", "log_filter"])]
    pub trace: bool,

    /// Set global log level to debug (our crates only)
    #[arg(long, conflicts_with_all = ["trace", "log_level", "log_filter"])]
    pub debug: bool,

    /// Set a single global log level for our crates (error|warn|info|debug|trace)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Set an explicit tracing filter directive (overrides other flags)
    /// e.g. "pageaction_engine=trace,settings=debug"
    #[arg(long)]
    pub log_filter: Option<String>,
}

impl LogArgs {
    /// Level selected by `--trace`, `--debug`, or `--log-level`, if any.
    fn level(&self) -> Option<String> {
        if self.trace {
            Some("trace".into())
        } else if self.debug {
            Some("debug".into())
        } else {
            self.log_level.as_deref().map(str::to_ascii_lowercase)
        }
    }
}

/// Where a filter directive came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecSource {
    /// `--log-filter`.
    Filter,
    /// A level flag.
    Flag,
    /// The `RUST_LOG` environment variable.
    Env,
    /// Nothing was given.
    Default,
}

/// A resolved filter directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    /// Directive string in `EnvFilter` syntax.
    pub directives: String,
    /// Which input won.
    pub source: SpecSource,
}

impl FilterSpec {
    /// Resolve with precedence `--log-filter`, level flags, `RUST_LOG`, then
    /// crate-scoped `info`.
    pub fn resolve(args: &LogArgs) -> Self {
        Self::resolve_with_env(args, env::var("RUST_LOG").ok())
    }

    /// Resolve against an explicit `RUST_LOG` value.
    pub fn resolve_with_env(args: &LogArgs, rust_log: Option<String>) -> Self {
        if let Some(filter) = &args.log_filter {
            return Self {
                directives: filter.clone(),
                source: SpecSource::Filter,
            };
        }
        if let Some(level) = args.level() {
            return Self {
                directives: crate_directives(&level),
                source: SpecSource::Flag,
            };
        }
        match rust_log.filter(|s| !s.trim().is_empty()) {
            Some(directives) => Self {
                directives,
                source: SpecSource::Env,
            },
            None => Self {
                directives: crate_directives(DEFAULT_LEVEL),
                source: SpecSource::Default,
            },
        }
    }

    /// Build the subscriber filter.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::new(&self.directives)
    }
}

impl stdfmt::Display for FilterSpec {
    fn fmt(&self, f: &mut stdfmt::Formatter<'_>) -> stdfmt::Result {
        f.write_str(&self.directives)
    }
}

/// One `crate=level` directive per crate in [`OUR_CRATES`].
pub fn crate_directives(level: &str) -> String {
    OUR_CRATES
        .iter()
        .map(|t| format!("{t}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}
