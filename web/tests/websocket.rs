use chrono::Utc;
use events::{DomainEvent, Message, SenderRole};
use futures::{SinkExt, StreamExt};
use service::config::Config;
use service::AppState;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server(config: Config) -> (AppState, SocketAddr) {
    let state = AppState::new(config);
    let app = web::router::define_routes(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (state, addr)
}

async fn connect(addr: SocketAddr, conversation_id: &str, user_id: &str) -> Client {
    let url = format!("ws://{addr}/ws/chat/{conversation_id}?userId={user_id}");
    let (client, _response) = connect_async(url).await.unwrap();
    client
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        sleep(Duration::from_millis(10)).await;
    }
}

async fn next_text(client: &mut Client) -> String {
    loop {
        let frame = timeout(Duration::from_secs(2), client.next())
            .await
            .expect("frame within timeout")
            .expect("stream still open")
            .expect("valid frame");
        if frame.is_text() {
            return frame.to_text().unwrap().to_string();
        }
    }
}

fn message(conversation_id: &str, sender: SenderRole, content: &str) -> Message {
    Message {
        id: format!("msg-{content}"),
        conversation_id: conversation_id.to_string(),
        sender,
        content: content.to_string(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn published_message_reaches_only_its_conversation() {
    let (state, addr) = start_server(Config::default()).await;

    let mut a = connect(addr, "conv-1", "alice").await;
    let mut b = connect(addr, "conv-1", "bob").await;
    let mut z = connect(addr, "conv-2", "zoe").await;

    wait_until(|| {
        state.hub_ref().subscriber_count("conv-1") == 2
            && state.hub_ref().subscriber_count("conv-2") == 1
    })
    .await;

    state
        .event_publisher
        .publish(DomainEvent::MessageCreated {
            conversation_id: "conv-1".to_string(),
            message: message("conv-1", SenderRole::Ai, "hi"),
        })
        .await;

    for client in [&mut a, &mut b] {
        let received: Message = serde_json::from_str(&next_text(client).await).unwrap();
        assert_eq!(received.sender, SenderRole::Ai);
        assert_eq!(received.content, "hi");
    }

    assert!(
        timeout(Duration::from_millis(200), z.next()).await.is_err(),
        "conv-2 subscriber must not receive conv-1 messages"
    );
}

#[tokio::test]
async fn messages_arrive_in_publish_order() {
    let (state, addr) = start_server(Config::default()).await;
    let mut client = connect(addr, "conv-1", "alice").await;
    wait_until(|| state.hub_ref().subscriber_count("conv-1") == 1).await;

    state
        .hub_ref()
        .publish("conv-1", &message("conv-1", SenderRole::User, "m1"));
    state
        .hub_ref()
        .publish("conv-1", &message("conv-1", SenderRole::Ai, "m2"));

    // Both payloads may be coalesced into one newline-separated frame
    let mut contents = Vec::new();
    while contents.len() < 2 {
        for line in next_text(&mut client).await.lines() {
            let received: Message = serde_json::from_str(line).unwrap();
            contents.push(received.content);
        }
    }

    assert_eq!(contents, vec!["m1".to_string(), "m2".to_string()]);
}

#[tokio::test]
async fn client_disconnect_unregisters_the_connection() {
    let (state, addr) = start_server(Config::default()).await;
    let mut leaving = connect(addr, "conv-1", "alice").await;
    let _staying = connect(addr, "conv-1", "bob").await;
    wait_until(|| state.hub_ref().subscriber_count("conv-1") == 2).await;

    leaving.close(None).await.unwrap();

    wait_until(|| state.hub_ref().subscriber_count("conv-1") == 1).await;
}

#[tokio::test]
async fn malformed_inbound_frames_keep_the_connection_open() {
    let (state, addr) = start_server(Config::default()).await;
    let mut client = connect(addr, "conv-1", "alice").await;
    wait_until(|| state.hub_ref().subscriber_count("conv-1") == 1).await;

    client
        .send(tungstenite::Message::Text("definitely not json".to_string().into()))
        .await
        .unwrap();
    client
        .send(tungstenite::Message::Text(r#"{"content":"hello"}"#.to_string().into()))
        .await
        .unwrap();

    state
        .hub_ref()
        .publish("conv-1", &message("conv-1", SenderRole::Ai, "still here"));

    let received: Message = serde_json::from_str(&next_text(&mut client).await).unwrap();
    assert_eq!(received.content, "still here");
    assert_eq!(state.hub_ref().subscriber_count("conv-1"), 1);
}

#[tokio::test]
async fn last_disconnect_removes_the_conversation() {
    let (state, addr) = start_server(Config::default()).await;
    let client = connect(addr, "conv-1", "alice").await;
    wait_until(|| state.hub_ref().conversation_count() == 1).await;

    drop(client);

    wait_until(|| state.hub_ref().conversation_count() == 0).await;
}
