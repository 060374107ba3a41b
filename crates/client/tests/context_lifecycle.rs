//! Mounting the messaging core over the scripted connector.

use std::sync::Arc;
use std::time::Duration;

use randomtalk_client::context::request_chat_session;
use randomtalk_client::messaging::ConnectionState;
use randomtalk_client::testing::MockConnector;
use randomtalk_client::websocket::{
    ChannelObserver, ClientConfig, CloseEvent, Frame, TransportClient, TransportEvent,
};
use randomtalk_client::AppContext;
use randomtalk_shared::{CreateChatSessionPayload, Notification};
use serde_json::json;

fn transport(connector: Arc<MockConnector>) -> TransportClient {
    let config = ClientConfig::new("ws://localhost:51000")
        .expect("valid")
        .with_max_retries(2)
        .with_reconnect_delay(Duration::from_millis(250));
    TransportClient::with_connector(config, connector)
}

#[tokio::test(start_paused = true)]
async fn session_request_survives_a_reconnect() {
    let (connector, mut peers) = MockConnector::new();
    connector.accept_next();
    connector.accept_next();
    let (observer, mut events) = ChannelObserver::channel();
    let context =
        AppContext::mount_with_transport(transport(connector.clone()), Vec::new(), Arc::new(observer));

    assert_eq!(events.recv().await, Some(TransportEvent::Opened));
    peers.recv().await.expect("first peer").drop_connection();
    assert!(matches!(events.recv().await, Some(TransportEvent::Closed(e)) if e.code == 1006));
    assert_eq!(events.recv().await, Some(TransportEvent::Opened));
    let mut peer = peers.recv().await.expect("second peer");

    let payload = CreateChatSessionPayload::new("ada", "maths, looms", 36, "female");
    request_chat_session(context.dispatcher().as_ref(), payload)
        .await
        .expect("requested");

    let Some(Frame::Text(text)) = peer.recv().await else {
        panic!("expected a text frame");
    };
    let value: serde_json::Value = serde_json::from_str(&text).expect("json");
    assert_eq!(value["data"]["type"], "randomtalk.chat.create_chat_session");
    assert_eq!(
        value["data"]["payload"]["user_match_preference_interests"],
        json!(["maths", "looms"])
    );

    peer.send_text(r#"{"session":"open"}"#);
    assert!(matches!(events.recv().await, Some(TransportEvent::Notification(_))));
    assert_eq!(
        context.latest_notification(),
        Some(Notification::Structured(json!({"session": "open"})))
    );

    context.unmount();
    assert_eq!(peer.recv().await, Some(Frame::Close(Some(CloseEvent::normal()))));
}

#[tokio::test(start_paused = true)]
async fn dropped_context_stops_reconnecting() {
    let (connector, mut peers) = MockConnector::new();
    connector.accept_next();
    let (observer, mut events) = ChannelObserver::channel();
    let context =
        AppContext::mount_with_transport(transport(connector.clone()), Vec::new(), Arc::new(observer));
    let client = context.transport().clone();

    assert_eq!(events.recv().await, Some(TransportEvent::Opened));
    let _peer = peers.recv().await.expect("peer");

    drop(context);
    assert!(matches!(events.recv().await, Some(TransportEvent::Closed(e)) if e.code == 1000));

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(connector.attempt_count(), 1);
    assert_eq!(client.state(), ConnectionState::Closed);
}
