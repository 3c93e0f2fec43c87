//! Integration tests for the view log forwarding layer.

use logging::forward;
use pageaction_protocol::{ViewMsg, ipc::view_channel};
use tracing::{Level, debug, info, warn};
use tracing_subscriber::prelude::*;

#[test]
fn forwards_only_while_attached() {
    let (layer, handle) = forward::layer();
    let (tx, mut rx) = view_channel();
    let subscriber = tracing_subscriber::registry().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        info!(target: "test_forward", "before attach");
        assert!(rx.try_recv().is_err());

        handle.attach(tx);
        info!(target: "test_forward", domain = "example.com", tab = 7, "request notifications");
        match rx.try_recv() {
            Ok(ViewMsg::Log {
                level,
                target,
                message,
            }) => {
                assert_eq!(level, "INFO");
                assert_eq!(target, "test_forward");
                assert_eq!(message, "request notifications domain=example.com tab=7");
            }
            other => panic!("expected forwarded log, got: {:?}", other),
        }

        handle.detach();
        assert!(!handle.is_attached());
        info!(target: "test_forward", "after detach");
        assert!(rx.try_recv().is_err());
    });
}

#[test]
fn respects_level_threshold() {
    let (layer, handle) = forward::layer();
    let (tx, mut rx) = view_channel();
    handle.attach(tx);
    handle.set_level(Level::WARN);
    let subscriber = tracing_subscriber::registry().with(layer);

    tracing::subscriber::with_default(subscriber, || {
        debug!("noise");
        info!("still noise");
        warn!(reason = "bad url", "notification_skipped");
    });
    let got: Vec<ViewMsg> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert_eq!(got.len(), 1);
    assert!(matches!(
        &got[0],
        ViewMsg::Log { level, message, .. }
            if level == "WARN" && message == "notification_skipped reason=\"bad url\""
    ));
}

#[test]
fn closed_view_detaches() {
    let (layer, handle) = forward::layer();
    let (tx, rx) = view_channel();
    handle.attach(tx);
    drop(rx);
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, || info!("into the void"));
    assert!(!handle.is_attached());
}
