//! Mirror tracing events into the page action view.
//!
//! [`layer`] returns a [`ForwardLayer`] for the subscriber and a
//! [`ForwardHandle`] that attaches and detaches the view. While no view is
//! attached the layer does nothing. Events below the handle's level are not
//! forwarded, so a verbose stderr filter does not flood the view.

use std::sync::Arc;

use pageaction_protocol::{ViewMsg, ipc::ViewTx};
use parking_lot::Mutex;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::fmt;

/// Attached view and level threshold.
struct Sink {
    /// View channel, when attached.
    tx: Option<ViewTx>,
    /// Least severe level forwarded.
    level: Level,
}

/// Attaches and detaches the view a [`ForwardLayer`] writes to.
#[derive(Clone)]
pub struct ForwardHandle {
    /// Shared with the layer.
    sink: Arc<Mutex<Sink>>,
}

impl ForwardHandle {
    /// Start forwarding into `tx`.
    pub fn attach(&self, tx: ViewTx) {
        self.sink.lock().tx = Some(tx);
    }

    /// Stop forwarding and release the channel.
    pub fn detach(&self) {
        self.sink.lock().tx = None;
    }

    /// Whether a view is attached.
    pub fn is_attached(&self) -> bool {
        self.sink.lock().tx.is_some()
    }

    /// Forward events at `level` or more severe.
    pub fn set_level(&self, level: Level) {
        self.sink.lock().level = level;
    }
}

/// Tracing layer that forwards events to the attached view.
pub struct ForwardLayer {
    /// Shared with the handle.
    sink: Arc<Mutex<Sink>>,
}

impl<S> Layer<S> for ForwardLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let tx = {
            let sink = self.sink.lock();
            match &sink.tx {
                Some(tx) if *event.metadata().level() <= sink.level => tx.clone(),
                _ => return,
            }
        };
        let r = fmt::render_event(event);
        let sent = tx.send(ViewMsg::Log {
            level: r.level,
            target: r.target,
            message: r.message,
        });
        if sent.is_err() {
            self.sink.lock().tx = None;
        }
    }
}

/// A detached layer and its handle. The default level is `INFO`.
pub fn layer() -> (ForwardLayer, ForwardHandle) {
    let sink = Arc::new(Mutex::new(Sink {
        tx: None,
        level: Level::INFO,
    }));
    (
        ForwardLayer { sink: sink.clone() },
        ForwardHandle { sink },
    )
}
