//! Test doubles for the host capabilities.
//!
//! Used by this crate's integration tests and by downstream crates that drive
//! a [`Session`](crate::Session) without a browser.

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use pageaction_protocol::{
    TabId, ViewMsg,
    ipc::{ViewRx, view_channel},
};
use parking_lot::Mutex;
use serde_json::Value;
use settings::{MemoryLists, MemorySettings};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{
    Choice, DefaultMessages, Error, Modal, Result, Services, Transport, view::ViewDispatcher,
};

/// In-process transport with a fixed tab list.
///
/// Messages delivered before [`Transport::listen`] is called are buffered and
/// flushed to the listener when it attaches.
#[derive(Default)]
pub struct MockTransport {
    /// Result of the active-tab query.
    tabs: Vec<TabId>,
    /// Number of `listen` calls.
    listens: AtomicUsize,
    /// Attached listener.
    listener: Mutex<Option<UnboundedSender<Value>>>,
    /// Messages delivered before a listener attached.
    backlog: Mutex<Vec<Value>>,
    /// Outbound messages in send order.
    sent: Mutex<Vec<(TabId, Value)>>,
    /// Fail every send.
    fail_sends: bool,
}

impl MockTransport {
    /// Transport reporting `tabs` as active.
    pub fn with_tabs(tabs: Vec<TabId>) -> Self {
        Self {
            tabs,
            ..Self::default()
        }
    }

    /// Transport whose sends always fail.
    pub fn failing_sends(tabs: Vec<TabId>) -> Self {
        Self {
            tabs,
            fail_sends: true,
            ..Self::default()
        }
    }

    /// Deliver one inbound message.
    pub fn deliver(&self, message: Value) {
        let listener = self.listener.lock();
        match listener.as_ref() {
            Some(tx) => {
                let _ = tx.send(message);
            }
            None => self.backlog.lock().push(message),
        }
    }

    /// Detach the listener. The pipeline drains and stops.
    pub fn hang_up(&self) {
        self.listener.lock().take();
    }

    /// How often `listen` was called.
    pub fn listen_calls(&self) -> usize {
        self.listens.load(Ordering::SeqCst)
    }

    /// Messages sent so far.
    pub fn sent(&self) -> Vec<(TabId, Value)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn active_tabs(&self) -> Result<Vec<TabId>> {
        Ok(self.tabs.clone())
    }

    fn listen(&self) -> UnboundedReceiver<Value> {
        self.listens.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        for message in self.backlog.lock().drain(..) {
            let _ = tx.send(message);
        }
        *self.listener.lock() = Some(tx);
        rx
    }

    async fn send_message(&self, tab: TabId, message: Value) -> Result<()> {
        if self.fail_sends {
            return Err(Error::Transport(format!("tab {tab} unreachable")));
        }
        self.sent.lock().push((tab, message));
        Ok(())
    }
}

/// One scripted answer to a modal dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalReply {
    /// Pick the option at this index of a choice dialog.
    Pick(usize),
    /// Submit a prompt unchanged.
    Accept,
    /// Submit this text to a prompt.
    Text(String),
    /// Dismiss the dialog.
    Cancel,
}

/// Modal that answers from a script, in order. An exhausted script cancels.
#[derive(Debug, Default)]
pub struct ScriptedModal {
    /// Remaining answers.
    replies: Mutex<VecDeque<ModalReply>>,
    /// Choice dialogs shown: text and options.
    choices: Mutex<Vec<(String, Vec<Choice>)>>,
    /// Prompts shown: text and prefill.
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedModal {
    /// Modal answering with `replies`.
    pub fn new(replies: Vec<ModalReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    /// Choice dialogs shown so far.
    pub fn choices(&self) -> Vec<(String, Vec<Choice>)> {
        self.choices.lock().clone()
    }

    /// Prompts shown so far.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().clone()
    }

    /// Next scripted reply.
    fn next(&self) -> ModalReply {
        self.replies.lock().pop_front().unwrap_or(ModalReply::Cancel)
    }
}

#[async_trait]
impl Modal for ScriptedModal {
    async fn choice(&self, text: &str, options: &[Choice]) -> Option<String> {
        self.choices
            .lock()
            .push((text.to_string(), options.to_vec()));
        match self.next() {
            ModalReply::Pick(i) => options.get(i).map(|c| c.value.clone()),
            _ => None,
        }
    }

    async fn prompt(&self, text: &str, prefill: &str) -> Option<String> {
        self.prompts
            .lock()
            .push((text.to_string(), prefill.to_string()));
        match self.next() {
            ModalReply::Accept => Some(prefill.to_string()),
            ModalReply::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Services over in-memory stores and the default catalog, plus the receiving
/// end of the view channel.
pub fn services(
    settings: &MemorySettings,
    lists: &MemoryLists,
    modal: Arc<dyn Modal>,
) -> (Services, ViewRx) {
    let (tx, rx) = view_channel();
    let services = Services {
        settings: Arc::new(settings.clone()),
        lists: Arc::new(lists.clone()),
        modal,
        messages: Arc::new(DefaultMessages),
        view: ViewDispatcher::new(tx),
    };
    (services, rx)
}

/// Receive until `pred` matches; returns everything received, the match last.
///
/// Panics if the channel closes first.
pub async fn recv_until<F>(rx: &mut ViewRx, mut pred: F) -> Vec<ViewMsg>
where
    F: FnMut(&ViewMsg) -> bool,
{
    let mut out = Vec::new();
    loop {
        match rx.recv().await {
            Some(msg) => {
                let done = pred(&msg);
                out.push(msg);
                if done {
                    return out;
                }
            }
            None => panic!("view channel closed while waiting; got {out:?}"),
        }
    }
}

/// Everything currently queued on the view channel.
pub fn drain(rx: &mut ViewRx) -> Vec<ViewMsg> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}
