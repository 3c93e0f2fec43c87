//! Binary entrypoint for the `pageaction` replay tool.
//!
//! Replays recorded transport traffic through a page action session, prints
//! the resulting domain groups, and optionally runs actions on them with
//! terminal dialogs.
use std::{io, path::PathBuf, process, sync::Arc};

use clap::{Parser, Subcommand};
use logging::{
    FilterSpec, LogArgs,
    forward::{self, ForwardHandle},
};
use pageaction_engine::{
    DEFAULT_CHUNK_SIZE, DefaultMessages, Error as EngineError, IngestConfig, Messages, Services,
    Session, SessionConfig, ViewDispatcher,
};
use pageaction_protocol::{DEFAULT_NAMESPACE, Namespace, TabId, ipc::view_channel};
use serde_json::Value;
use settings::{Error as SettingsError, MemoryLists, MemorySettings};
use thiserror::Error;
use tokio::runtime;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*};

/// Plain-text rendering of table and view output.
mod render;
/// Recorded transport and invocation parsing.
mod replay;
/// Stdin-backed modal dialogs.
mod terminal;

use crate::{
    replay::{Invocation, ReplayTransport, ScriptError, read_script},
    terminal::TerminalModal,
};

#[derive(Parser, Debug)]
#[command(name = "pageaction", about = "Page action notification replay", version)]
/// Command-line interface for the `pageaction` binary.
struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,

    /// Logging controls
    #[command(flatten)]
    log: LogArgs,
}

#[derive(Subcommand, Debug)]
/// Top-level CLI subcommands.
enum Command {
    /// Replay a JSON-lines file of transport messages and print the result.
    Replay {
        /// One transport message per line
        messages: PathBuf,

        /// Initial settings file (JSON)
        #[arg(long, value_name = "PATH")]
        settings: Option<PathBuf>,

        /// Id of the simulated active tab
        #[arg(long, default_value_t = 1)]
        tab_id: i64,

        /// Transport key namespace
        #[arg(long, default_value = DEFAULT_NAMESPACE)]
        namespace: String,

        /// Items filed per ingestion tick
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,

        /// Run an action after ingestion: kind:target:action
        /// (kind is global, domain, or notification)
        #[arg(long = "invoke", value_name = "KIND:TARGET:ACTION")]
        invocations: Vec<Invocation>,

        /// Mirror log lines into the view output
        #[arg(long)]
        view_logs: bool,
    },
}

/// Reasons a replay run stops.
#[derive(Debug, Error)]
enum ReplayError {
    /// The async runtime could not be built.
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] io::Error),
    /// The message script could not be loaded.
    #[error("message script: {0}")]
    Script(#[from] ScriptError),
    /// The settings file could not be loaded.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// The session failed to start or to finish ingesting.
    #[error("session: {0}")]
    Session(#[from] EngineError),
    /// A requested action failed.
    #[error("{action}: {source}")]
    Action {
        /// Action name.
        action: String,
        /// Underlying failure.
        source: EngineError,
    },
}

/// Options for one replay run.
struct ReplayArgs {
    /// Script path.
    messages: PathBuf,
    /// Optional settings file.
    settings: Option<PathBuf>,
    /// Simulated tab.
    tab: TabId,
    /// Session parameters.
    session: SessionConfig,
    /// Actions to run after ingestion.
    invocations: Vec<Invocation>,
    /// Forward logs into the view.
    view_logs: bool,
}

fn main() {
    let cli = Cli::parse();

    let spec = FilterSpec::resolve(&cli.log);
    let (forward_layer, log_forward) = forward::layer();

    // Env filter, compact stderr output, and forwarding into the view once
    // one is attached.
    tracing_subscriber::registry()
        .with(spec.env_filter())
        .with(fmt::layer().without_time().with_writer(io::stderr))
        .with(forward_layer)
        .try_init()
        .ok();
    debug!(filter = %spec, source = ?spec.source, "logging_ready");

    let Command::Replay {
        messages,
        settings,
        tab_id,
        namespace,
        chunk_size,
        invocations,
        view_logs,
    } = cli.command;
    let args = ReplayArgs {
        messages,
        settings,
        tab: TabId(tab_id),
        session: SessionConfig {
            namespace: Namespace::new(namespace),
            ingest: IngestConfig {
                chunk_size,
                ..IngestConfig::default()
            },
        },
        invocations,
        view_logs,
    };

    if let Err(e) = run(args, &log_forward) {
        error!("{}", e);
        process::exit(1);
    }
}

/// Build the runtime and replay on it.
fn run(args: ReplayArgs, forward: &ForwardHandle) -> Result<(), ReplayError> {
    let rt = runtime::Builder::new_current_thread().enable_all().build()?;
    rt.block_on(run_replay(args, forward))
}

/// Drive one replay to completion.
async fn run_replay(args: ReplayArgs, forward: &ForwardHandle) -> Result<(), ReplayError> {
    let script = read_script(&args.messages)?;
    let settings = match &args.settings {
        Some(path) => MemorySettings::load_from_path(path)?,
        None => MemorySettings::with_values(Vec::<(String, Value)>::new()),
    };

    let (tx, mut rx) = view_channel();
    if args.view_logs {
        forward.attach(tx.clone());
    }
    let printer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Some(line) = render::view_line(&msg) {
                println!("{line}");
            }
        }
    });

    let messages: Arc<dyn Messages> = Arc::new(DefaultMessages);
    let services = Services {
        settings: Arc::new(settings),
        lists: Arc::new(MemoryLists::new()),
        modal: Arc::new(TerminalModal::new()),
        messages: messages.clone(),
        view: ViewDispatcher::new(tx),
    };
    let transport = Arc::new(ReplayTransport::new(args.tab, script));
    let result = replay_session(transport, services, &args, messages.as_ref()).await;

    forward.detach();
    let _ = printer.await;
    result
}

/// Start the session, wait for ingestion, render, then run invocations.
async fn replay_session(
    transport: Arc<ReplayTransport>,
    services: Services,
    args: &ReplayArgs,
    messages: &dyn Messages,
) -> Result<(), ReplayError> {
    let mut session = Session::start(transport, services, args.session.clone()).await?;
    let stats = session.join().await?;
    info!(
        ticks = stats.ticks,
        filed = stats.filed,
        ignored = stats.ignored,
        malformed = stats.malformed,
        duplicates = stats.duplicates,
        rejected = stats.rejected,
        "replay_done"
    );
    {
        let table = session.table();
        let table = table.read();
        print!("{}", render::table(&table, session.actions(), messages));
    }
    for inv in &args.invocations {
        session
            .invoke(&inv.action, inv.target.clone())
            .await
            .map_err(|source| ReplayError::Action {
                action: inv.action.clone(),
                source,
            })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;

    use super::*;

    #[test]
    fn errors_keep_their_source() {
        let e = ReplayError::from(ScriptError::Read {
            path: "traffic.jsonl".into(),
            message: "not found".into(),
        });
        assert_eq!(e.to_string(), "message script: cannot read traffic.jsonl: not found");

        let e = ReplayError::Action {
            action: "whitelist".into(),
            source: EngineError::ChannelClosed,
        };
        assert_eq!(e.to_string(), "whitelist: view channel closed");
        assert!(StdError::source(&e).is_some());
    }
}
