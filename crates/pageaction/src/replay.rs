//! Recorded transport traffic and scripted action invocations.

use std::{fs, mem, path::Path, str::FromStr};

use async_trait::async_trait;
use pageaction_engine::{ActionTarget, Result as EngineResult, Transport};
use pageaction_protocol::{MessageId, TabId};
use parking_lot::Mutex;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::debug;

/// A message script that could not be loaded.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The file could not be read.
    #[error("cannot read {path}: {message}")]
    Read {
        /// Script path.
        path: String,
        /// OS error text.
        message: String,
    },
    /// A line is not valid JSON.
    #[error("line {line}: {source}")]
    Json {
        /// 1-based line number.
        line: usize,
        /// Parser error.
        source: serde_json::Error,
    },
}

/// Parse a JSON-lines script. Blank lines and `#` comments are skipped.
pub fn parse_script(source: &str) -> Result<Vec<Value>, ScriptError> {
    source
        .lines()
        .enumerate()
        .filter(|(_, l)| {
            let l = l.trim();
            !l.is_empty() && !l.starts_with('#')
        })
        .map(|(i, l)| {
            serde_json::from_str(l).map_err(|source| ScriptError::Json {
                line: i + 1,
                source,
            })
        })
        .collect()
}

/// Read and parse a script file.
pub fn read_script(path: &Path) -> Result<Vec<Value>, ScriptError> {
    let source = fs::read_to_string(path).map_err(|e| ScriptError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse_script(&source)
}

/// Transport that plays back a recorded script from one tab.
///
/// All messages are delivered as soon as the listener attaches, after which
/// the tab hangs up.
pub struct ReplayTransport {
    /// The simulated active tab.
    tab: TabId,
    /// Messages not yet delivered.
    script: Mutex<Vec<Value>>,
}

impl ReplayTransport {
    /// Replay `script` as coming from `tab`.
    pub fn new(tab: TabId, script: Vec<Value>) -> Self {
        Self {
            tab,
            script: Mutex::new(script),
        }
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn active_tabs(&self) -> EngineResult<Vec<TabId>> {
        Ok(vec![self.tab])
    }

    fn listen(&self) -> UnboundedReceiver<Value> {
        let (tx, rx) = mpsc::unbounded_channel();
        let script = mem::take(&mut *self.script.lock());
        debug!(messages = script.len(), "replay_start");
        for message in script {
            let _ = tx.send(message);
        }
        rx
    }

    async fn send_message(&self, tab: TabId, message: Value) -> EngineResult<()> {
        println!("-> tab {tab}: {message}");
        Ok(())
    }
}

/// One `kind:target:action` invocation from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// What the action runs on.
    pub target: ActionTarget,
    /// Action name.
    pub action: String,
}

impl FromStr for Invocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, rest) = s
            .split_once(':')
            .ok_or_else(|| format!("expected kind:target:action, got {s:?}"))?;
        let (target, action) = rest
            .rsplit_once(':')
            .ok_or_else(|| format!("expected kind:target:action, got {s:?}"))?;
        if action.is_empty() {
            return Err(format!("missing action name in {s:?}"));
        }
        let target = match kind {
            "global" => ActionTarget::Global,
            "domain" => ActionTarget::Domain(target.to_string()),
            "notification" if !target.is_empty() => {
                ActionTarget::Notification(MessageId::new(target))
            }
            "notification" => return Err(format!("missing notification id in {s:?}")),
            other => return Err(format!("unknown action kind {other:?}")),
        };
        Ok(Self {
            target,
            action: action.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;

    use super::*;

    #[test]
    fn script_skips_blank_and_comment_lines() {
        let src = "# recorded\n{\"a\": 1}\n\n  {\"b\": [2]}\n";
        assert_eq!(
            parse_script(src).unwrap(),
            vec![json!({"a": 1}), json!({"b": [2]})]
        );
    }

    #[test]
    fn script_errors_carry_line_numbers() {
        let err = parse_script("{}\n# c\n{nope").unwrap_err();
        assert!(matches!(err, ScriptError::Json { line: 3, .. }));
    }

    #[test]
    fn reads_script_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{{\"canvasBlocker-notifications\": []}}").unwrap();
        assert_eq!(read_script(f.path()).unwrap().len(), 1);
        assert!(matches!(
            read_script(Path::new("/nonexistent/script.jsonl")),
            Err(ScriptError::Read { .. })
        ));
    }

    #[test]
    fn parses_invocations() {
        let inv: Invocation = "domain:example.com:whitelist".parse().unwrap();
        assert_eq!(inv.target, ActionTarget::Domain("example.com".into()));
        assert_eq!(inv.action, "whitelist");
        let inv: Invocation = "global::showOptions".parse().unwrap();
        assert_eq!(inv.target, ActionTarget::Global);
        let inv: Invocation = "notification:17:displayCallingStack".parse().unwrap();
        assert_eq!(inv.target, ActionTarget::Notification(MessageId::new("17")));
        assert!("domain:example.com".parse::<Invocation>().is_err());
        assert!("tab:1:close".parse::<Invocation>().is_err());
        assert!("notification::displayFullURL".parse::<Invocation>().is_err());
        assert!("global:x:".parse::<Invocation>().is_err());
    }
}
