use std::{sync::Arc, time::Duration};

use pageaction_engine::{
    ActionTarget, Error, Session, SessionConfig, StartupError,
    disambiguate::anchored_pattern,
    test_support::{self, MockTransport, ModalReply, ScriptedModal, drain, recv_until},
};
use pageaction_protocol::{MessageId, TabId, ViewMsg, ipc::ViewRx};
use serde_json::{Value, json};
use settings::{MemoryLists, MemorySettings, SESSION_WHITELIST, SettingsStore, keys};
use tokio::time;

fn notification(id: usize, api: &str, url: &str) -> Value {
    json!({
        "messageId": id,
        "api": api,
        "url": url,
        "errorStack": format!("probe@{url}:1:{id}"),
    })
}

fn batch(items: Vec<Value>) -> Value {
    json!({ "canvasBlocker-notifications": items })
}

fn counter(domain: &str, api: &str, count: u64) -> Value {
    let mut counts = json!({ "domain": domain });
    counts[api] = json!(count);
    json!({ "canvasBlocker-notificationCounter": counts })
}

fn empty_settings() -> MemorySettings {
    MemorySettings::with_values(Vec::<(String, Value)>::new())
}

async fn start(
    tabs: Vec<TabId>,
    settings: &MemorySettings,
    lists: &MemoryLists,
    modal: Arc<ScriptedModal>,
) -> (Arc<MockTransport>, Result<Session, Error>, ViewRx) {
    let transport = Arc::new(MockTransport::with_tabs(tabs));
    let (services, rx) = test_support::services(settings, lists, modal);
    let session = Session::start(transport.clone(), services, SessionConfig::default()).await;
    (transport, session, rx)
}

async fn wait_filed(rx: &mut ViewRx, id: &str) -> Vec<ViewMsg> {
    recv_until(rx, |m| {
        matches!(m, ViewMsg::NotificationFiled { message_id, .. } if message_id.as_str() == id)
    })
    .await
}

#[tokio::test(start_paused = true)]
async fn zero_tabs_fails_before_listening() {
    let settings = empty_settings();
    let (transport, session, mut rx) = start(
        Vec::new(),
        &settings,
        &MemoryLists::new(),
        Arc::new(ScriptedModal::default()),
    )
    .await;
    match session {
        Err(Error::Startup(StartupError::NoTabsFound)) => {}
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("session started without a tab"),
    }
    assert_eq!(transport.listen_calls(), 0);
    assert!(transport.sent().is_empty());
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn too_many_tabs_is_fatal() {
    let settings = empty_settings();
    let (transport, session, _rx) = start(
        vec![TabId(1), TabId(2)],
        &settings,
        &MemoryLists::new(),
        Arc::new(ScriptedModal::default()),
    )
    .await;
    assert!(matches!(
        session,
        Err(Error::Startup(StartupError::TooManyTabsFound(ref tabs))) if tabs.len() == 2
    ));
    assert_eq!(transport.listen_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn startup_waits_for_settings() {
    let settings = MemorySettings::new();
    let transport = Arc::new(MockTransport::with_tabs(vec![TabId(3)]));
    let (services, _rx) = test_support::services(
        &settings,
        &MemoryLists::new(),
        Arc::new(ScriptedModal::default()),
    );
    let handle = tokio::spawn(Session::start(
        transport.clone(),
        services,
        SessionConfig::default(),
    ));
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    assert!(!handle.is_finished());
    assert_eq!(transport.listen_calls(), 0);
    settings.mark_loaded();
    let mut session = handle.await.unwrap().unwrap();
    assert_eq!(session.tab(), TabId(3));
    assert_eq!(transport.listen_calls(), 1);
    session.close();
    session.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_request_aborts_startup() {
    let transport = Arc::new(MockTransport::failing_sends(vec![TabId(3)]));
    let (services, _rx) = test_support::services(
        &empty_settings(),
        &MemoryLists::new(),
        Arc::new(ScriptedModal::default()),
    );
    let result = Session::start(transport, services, SessionConfig::default()).await;
    assert!(matches!(result, Err(Error::Transport(_))));
}

#[tokio::test(start_paused = true)]
async fn ingests_batches_in_chunks_and_overwrites_counters() {
    let settings = empty_settings();
    let (transport, session, mut rx) = start(
        vec![TabId(7)],
        &settings,
        &MemoryLists::new(),
        Arc::new(ScriptedModal::default()),
    )
    .await;
    let mut session = session.unwrap();
    assert_eq!(
        transport.sent(),
        vec![(TabId(7), json!({ "canvasBlocker-sendNotifications": 7 }))]
    );
    assert_eq!(
        drain(&mut rx).first(),
        Some(&ViewMsg::Theme("pageAction-default.css".into()))
    );

    transport.deliver(counter("example.com", "toDataURL", 3));
    transport.deliver(batch(
        (0..45)
            .map(|i| notification(i, "toDataURL", &format!("https://example.com/p{}", i % 4)))
            .collect(),
    ));
    transport.deliver(counter("example.com", "toDataURL", 5));
    transport.hang_up();

    let table = session.table();
    let stats = session.join().await.unwrap();
    assert_eq!(stats.ticks, 3);
    assert_eq!(stats.filed, 45);
    assert_eq!(stats.counter_updates, 2);

    let table = table.read();
    let group = table.group("example.com").unwrap();
    assert_eq!(group.counter("toDataURL"), 5);
    assert_eq!(group.urls().len(), 4);
    let ids: Vec<String> = group
        .notifications()
        .iter()
        .map(|m| m.as_str().to_string())
        .collect();
    assert_eq!(ids, (0..45).map(|i| i.to_string()).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn ignored_apis_are_dropped() {
    let settings = MemorySettings::with_values([(
        keys::IGNORED_APIS,
        json!({ "getImageData": true, "toBlob": false }),
    )]);
    let (transport, session, _rx) = start(
        vec![TabId(1)],
        &settings,
        &MemoryLists::new(),
        Arc::new(ScriptedModal::default()),
    )
    .await;
    let mut session = session.unwrap();
    transport.deliver(batch(vec![
        notification(1, "getImageData", "https://a.com/"),
        notification(2, "toBlob", "https://a.com/"),
        notification(3, "getImageData", "https://b.com/"),
        notification(4, "toDataURL", "https://b.com/"),
    ]));
    transport.hang_up();
    let table = session.table();
    let stats = session.join().await.unwrap();
    assert_eq!((stats.filed, stats.ignored), (2, 2));
    let table = table.read();
    assert_eq!(table.group("a.com").unwrap().notifications().len(), 1);
    assert_eq!(
        table.group("b.com").unwrap().notifications(),
        &[MessageId::new("4")]
    );
}

#[tokio::test(start_paused = true)]
async fn redelivered_ids_are_filed_once() {
    let settings = empty_settings();
    let (transport, session, _rx) = start(
        vec![TabId(1)],
        &settings,
        &MemoryLists::new(),
        Arc::new(ScriptedModal::default()),
    )
    .await;
    let mut session = session.unwrap();
    transport.deliver(batch(vec![notification(1, "toDataURL", "https://a.com/")]));
    transport.deliver(batch(vec![notification(1, "toDataURL", "https://a.com/")]));
    transport.hang_up();
    let stats = session.join().await.unwrap();
    assert_eq!((stats.filed, stats.duplicates), (1, 1));
}

#[tokio::test(start_paused = true)]
async fn domain_action_persists_edited_pattern() {
    let settings = empty_settings();
    let modal = Arc::new(ScriptedModal::new(vec![
        ModalReply::Pick(2),
        ModalReply::Accept,
    ]));
    let (transport, session, mut rx) =
        start(vec![TabId(1)], &settings, &MemoryLists::new(), modal.clone()).await;
    let mut session = session.unwrap();
    transport.deliver(batch(vec![
        notification(1, "toDataURL", "https://shop.example.com/"),
        notification(2, "toDataURL", "https://shop.example.com/cart?id=4"),
    ]));
    wait_filed(&mut rx, "2").await;

    session
        .invoke("whitelist", ActionTarget::Domain("shop.example.com".into()))
        .await
        .unwrap();
    let choices = modal.choices();
    assert_eq!(choices.len(), 1);
    assert_eq!(choices[0].0, "Select what to whitelist:");
    assert_eq!(choices[0].1.len(), 3);
    let pattern = anchored_pattern("https://shop.example.com/cart?id=4");
    assert_eq!(
        settings.get_scoped(keys::BLOCK_MODE, &pattern),
        Some(json!("allow"))
    );
    assert_eq!(drain(&mut rx), vec![ViewMsg::Close]);
    session.close();
    session.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn cancelled_choice_never_prompts() {
    let settings = empty_settings();
    let lists = MemoryLists::new();
    let modal = Arc::new(ScriptedModal::new(vec![ModalReply::Cancel]));
    let (transport, session, mut rx) = start(vec![TabId(1)], &settings, &lists, modal.clone()).await;
    let mut session = session.unwrap();
    transport.deliver(batch(vec![notification(1, "toDataURL", "https://a.com/x")]));
    wait_filed(&mut rx, "1").await;

    session
        .invoke(
            "whitelistTemporarily",
            ActionTarget::Domain("a.com".into()),
        )
        .await
        .unwrap();
    assert!(modal.prompts().is_empty());
    assert!(lists.entries(SESSION_WHITELIST).is_empty());
    assert!(settings.scopes_for(keys::BLOCK_MODE).is_empty());
    assert_eq!(drain(&mut rx), vec![ViewMsg::Close]);
    session.close();
    session.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn notification_actions_and_unknown_targets() {
    let settings = empty_settings();
    let (transport, session, mut rx) = start(
        vec![TabId(1)],
        &settings,
        &MemoryLists::new(),
        Arc::new(ScriptedModal::default()),
    )
    .await;
    let mut session = session.unwrap();
    transport.deliver(batch(vec![notification(
        9,
        "toDataURL",
        "https://a.com/deep/path?q=1",
    )]));
    wait_filed(&mut rx, "9").await;

    let target = ActionTarget::Notification(MessageId::new("9"));
    session.invoke("displayFullURL", target.clone()).await.unwrap();
    session.invoke("displayCallingStack", target).await.unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![
            ViewMsg::Alert("https://a.com/deep/path?q=1".into()),
            ViewMsg::Alert("probe @ https://a.com/deep/path?q=1 line 1, column 9".into()),
        ]
    );

    assert!(matches!(
        session
            .invoke("displayFullURL", ActionTarget::Notification(MessageId::new("nope")))
            .await,
        Err(Error::UnknownNotification(_))
    ));
    assert!(matches!(
        session
            .invoke("ignorelist", ActionTarget::Domain("b.com".into()))
            .await,
        Err(Error::UnknownDomain(_))
    ));
    assert!(matches!(
        session.invoke("explode", ActionTarget::Global).await,
        Err(Error::UnknownAction { scope: "global", .. })
    ));
    session.close();
    session.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn theme_changes_are_pushed() {
    let settings = MemorySettings::with_values([(keys::THEME, json!("dark"))]);
    let (_transport, session, mut rx) = start(
        vec![TabId(1)],
        &settings,
        &MemoryLists::new(),
        Arc::new(ScriptedModal::default()),
    )
    .await;
    let mut session = session.unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![ViewMsg::Theme("pageAction-dark.css".into())]
    );

    settings
        .set(keys::THEME, json!("light"), None)
        .await
        .unwrap();
    let seen = recv_until(&mut rx, |m| matches!(m, ViewMsg::Theme(_))).await;
    assert_eq!(
        seen.last(),
        Some(&ViewMsg::Theme("pageAction-light.css".into()))
    );
    session.close();
    session.join().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn dropped_session_stops_watching_theme() {
    let settings = MemorySettings::with_values([(keys::THEME, json!("dark"))]);
    let (transport, session, mut rx) = start(
        vec![TabId(1)],
        &settings,
        &MemoryLists::new(),
        Arc::new(ScriptedModal::default()),
    )
    .await;
    let session = session.unwrap();
    assert_eq!(
        drain(&mut rx),
        vec![ViewMsg::Theme("pageAction-dark.css".into())]
    );

    drop(session);
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }
    settings
        .set(keys::THEME, json!("light"), None)
        .await
        .unwrap();
    transport.deliver(batch(vec![notification(1, "Canvas", "https://a.com/")]));
    time::sleep(Duration::from_millis(20)).await;
    assert!(drain(&mut rx).is_empty());
}
