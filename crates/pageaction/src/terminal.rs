//! Modal dialogs on the terminal.

use std::io::{self, Write};

use async_trait::async_trait;
use pageaction_engine::{Choice, Modal};
use tokio::{
    io::{AsyncBufReadExt, BufReader, Lines, Stdin, stdin},
    sync::Mutex,
};

/// Input that dismisses a dialog.
const CANCEL: &str = "-";

/// Reads dialog answers from stdin. End of input dismisses every dialog.
pub struct TerminalModal {
    /// Line reader over stdin.
    lines: Mutex<Lines<BufReader<Stdin>>>,
}

impl Default for TerminalModal {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalModal {
    /// Modal bound to the process stdin.
    pub fn new() -> Self {
        Self {
            lines: Mutex::new(BufReader::new(stdin()).lines()),
        }
    }

    /// Show the input marker and read one trimmed line.
    async fn read_line(&self) -> Option<String> {
        print!("> ");
        let _ = io::stdout().flush();
        let line = self.lines.lock().await.next_line().await.ok()??;
        Some(line.trim().to_string())
    }
}

/// Resolve a 1-based menu answer.
fn pick(options: &[Choice], answer: &str) -> Option<String> {
    let n: usize = answer.parse().ok()?;
    options.get(n.checked_sub(1)?).map(|c| c.value.clone())
}

#[async_trait]
impl Modal for TerminalModal {
    async fn choice(&self, text: &str, options: &[Choice]) -> Option<String> {
        println!("{text}");
        for (i, option) in options.iter().enumerate() {
            println!("  [{}] {}", i + 1, option.text);
        }
        println!("  [{CANCEL}] cancel");
        let answer = self.read_line().await?;
        pick(options, &answer)
    }

    async fn prompt(&self, text: &str, prefill: &str) -> Option<String> {
        println!("{text}");
        println!("  {prefill}");
        println!("  (empty keeps it, {CANCEL} cancels)");
        match self.read_line().await?.as_str() {
            CANCEL => None,
            "" => Some(prefill.to_string()),
            edited => Some(edited.to_string()),
        }
    }
}
