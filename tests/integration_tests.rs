//! Integration tests driving the relay server over real WebSocket
//! connections.
//!
//! Each test starts a fresh server on an ephemeral port with its own user
//! directory, so tests are independent and can run in parallel.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use server::auth::MemoryUserDirectory;
use server::network::GameServer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const QUIET_TIMEOUT: Duration = Duration::from_millis(300);

async fn start_server() -> SocketAddr {
    // Low bcrypt cost keeps login fast in tests.
    let gateway = Arc::new(MemoryUserDirectory::with_cost(4));
    let server = GameServer::bind("127.0.0.1:0", gateway)
        .await
        .expect("failed to bind test server");
    let addr = server.local_addr().expect("no local addr");
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

async fn connect(addr: SocketAddr) -> WsClient {
    let (stream, _) = connect_async(format!("ws://{}", addr))
        .await
        .expect("failed to connect");
    stream
}

async fn send(client: &mut WsClient, event: Value) {
    client
        .send(Message::Text(event.to_string()))
        .await
        .expect("failed to send event");
}

/// Next text frame as JSON; panics if nothing arrives in time.
async fn recv(client: &mut WsClient) -> Value {
    loop {
        let msg = timeout(RECV_TIMEOUT, client.next())
            .await
            .expect("timed out waiting for event")
            .expect("stream ended unexpectedly")
            .expect("transport error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("server sent invalid json");
        }
    }
}

/// Asserts no game event arrives within the quiet window.
async fn expect_quiet(client: &mut WsClient) {
    match timeout(QUIET_TIMEOUT, client.next()).await {
        Err(_) => {}
        Ok(Some(Ok(Message::Text(text)))) => panic!("unexpected event: {}", text),
        Ok(_) => {}
    }
}

fn login_event(email: &str, password: &str) -> Value {
    json!({
        "event": "login",
        "data": {"email": email, "password": password, "name": "Tester"}
    })
}

/// Logs in and creates a player; returns the `currentPlayers` snapshot.
async fn admit(client: &mut WsClient, email: &str) -> Value {
    send(client, login_event(email, "secret")).await;
    let joined = recv(client).await;
    assert_eq!(joined["event"], "join-game");

    send(client, json!({"event": "create-player"})).await;
    let snapshot = recv(client).await;
    assert_eq!(snapshot["event"], "currentPlayers");
    snapshot
}

mod login_tests {
    use super::*;

    #[tokio::test]
    async fn new_email_is_provisioned_and_admitted() {
        let addr = start_server().await;
        let mut client = connect(addr).await;

        let snapshot = admit(&mut client, "fresh@example.com").await;
        let players = snapshot["data"].as_object().unwrap();
        assert_eq!(players.len(), 1);

        let me = players.values().next().unwrap();
        assert_eq!(me["playerLife"], 100);
        let x = me["x"].as_i64().unwrap();
        let y = me["y"].as_i64().unwrap();
        assert!((50..450).contains(&x), "spawn x {} out of bounds", x);
        assert!((50..550).contains(&y), "spawn y {} out of bounds", y);
    }

    #[tokio::test]
    async fn wrong_password_gets_error_and_no_world_entry() {
        let addr = start_server().await;

        let mut owner = connect(addr).await;
        admit(&mut owner, "taken@example.com").await;

        let mut intruder = connect(addr).await;
        send(&mut intruder, login_event("taken@example.com", "wrong")).await;
        let event = recv(&mut intruder).await;
        assert_eq!(event["event"], "msg-error");
        assert!(event["data"].as_str().unwrap().contains("password"));

        // Not admitted: create-player is ignored.
        send(&mut intruder, json!({"event": "create-player"})).await;
        expect_quiet(&mut intruder).await;

        // A later joiner only ever sees the owner.
        let mut witness = connect(addr).await;
        let snapshot = admit(&mut witness, "witness@example.com").await;
        assert_eq!(snapshot["data"].as_object().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rejected_connection_may_retry_login() {
        let addr = start_server().await;

        let mut owner = connect(addr).await;
        admit(&mut owner, "retry@example.com").await;
        owner.close(None).await.unwrap();

        let mut client = connect(addr).await;
        send(&mut client, login_event("retry@example.com", "wrong")).await;
        assert_eq!(recv(&mut client).await["event"], "msg-error");

        send(&mut client, login_event("retry@example.com", "secret")).await;
        assert_eq!(recv(&mut client).await["event"], "join-game");
    }
}

mod gameplay_tests {
    use super::*;

    #[tokio::test]
    async fn joining_player_is_announced_to_existing_ones() {
        let addr = start_server().await;

        let mut a = connect(addr).await;
        let snapshot_a = admit(&mut a, "a@example.com").await;
        let a_id = snapshot_a["data"]
            .as_object()
            .unwrap()
            .keys()
            .next()
            .unwrap()
            .clone();

        let mut b = connect(addr).await;
        let snapshot_b = admit(&mut b, "b@example.com").await;
        assert_eq!(snapshot_b["data"].as_object().unwrap().len(), 2);
        assert!(snapshot_b["data"].get(&a_id).is_some());

        let notice = recv(&mut a).await;
        assert_eq!(notice["event"], "newPlayer");
        assert_ne!(notice["data"]["playerId"], Value::from(a_id));
        assert_eq!(notice["data"]["playerLife"], 100);
    }

    #[tokio::test]
    async fn movement_is_relayed_to_others_only() {
        let addr = start_server().await;

        let mut a = connect(addr).await;
        admit(&mut a, "a@example.com").await;
        let mut b = connect(addr).await;
        admit(&mut b, "b@example.com").await;
        recv(&mut a).await; // b's newPlayer

        send(
            &mut a,
            json!({"event": "playerMovement", "data": {"x": 200, "y": 210, "flipX": true}}),
        )
        .await;

        let moved = recv(&mut b).await;
        assert_eq!(moved["event"], "playerMoved");
        assert_eq!(moved["data"]["x"], 200);
        assert_eq!(moved["data"]["y"], 210);
        assert_eq!(moved["data"]["flipX"], true);

        expect_quiet(&mut a).await;
    }

    #[tokio::test]
    async fn attack_updates_life_and_kill_goes_to_victim_only() {
        let addr = start_server().await;

        let mut a = connect(addr).await;
        admit(&mut a, "a@example.com").await;
        let mut b = connect(addr).await;
        admit(&mut b, "b@example.com").await;

        let notice = recv(&mut a).await;
        let b_id = notice["data"]["playerId"].as_str().unwrap().to_string();

        // Non-lethal hit: both sides see the new life.
        send(
            &mut a,
            json!({"event": "playerAttack", "data": {"playerId": b_id, "atkDamage": 30}}),
        )
        .await;
        for client in [&mut a, &mut b] {
            let hit = recv(client).await;
            assert_eq!(hit["event"], "playerAttack");
            assert_eq!(hit["data"]["newLife"], 70);
        }

        // Lethal hit: life 0 is never observed; the victim respawns at 100
        // and receives the only kill notice.
        send(
            &mut a,
            json!({"event": "playerAttack", "data": {"playerId": b_id, "atkDamage": 70}}),
        )
        .await;
        let hit_a = recv(&mut a).await;
        assert_eq!(hit_a["data"]["newLife"], 100);
        expect_quiet(&mut a).await;

        let hit_b = recv(&mut b).await;
        assert_eq!(hit_b["data"]["newLife"], 100);
        assert_eq!(recv(&mut b).await["event"], "kill");
    }

    #[tokio::test]
    async fn legacy_attack_spelling_still_lands() {
        let addr = start_server().await;

        let mut a = connect(addr).await;
        admit(&mut a, "a@example.com").await;
        let mut b = connect(addr).await;
        admit(&mut b, "b@example.com").await;
        let b_id = recv(&mut a).await["data"]["playerId"]
            .as_str()
            .unwrap()
            .to_string();

        send(
            &mut a,
            json!({"event": "playerAtack", "data": {"playerId": b_id, "atkDamage": 10}}),
        )
        .await;
        assert_eq!(recv(&mut b).await["data"]["newLife"], 90);
    }

    #[tokio::test]
    async fn disconnect_removes_player_everywhere() {
        let addr = start_server().await;

        let mut a = connect(addr).await;
        let snapshot_a = admit(&mut a, "a@example.com").await;
        let a_id = snapshot_a["data"]
            .as_object()
            .unwrap()
            .keys()
            .next()
            .unwrap()
            .clone();

        let mut b = connect(addr).await;
        admit(&mut b, "b@example.com").await;
        recv(&mut a).await;

        a.close(None).await.unwrap();

        let notice = recv(&mut b).await;
        assert_eq!(notice["event"], "disconnect");
        assert_eq!(notice["data"], Value::from(a_id.clone()));

        // A fresh snapshot no longer includes the departed player.
        let mut c = connect(addr).await;
        let snapshot_c = admit(&mut c, "c@example.com").await;
        let players = snapshot_c["data"].as_object().unwrap();
        assert_eq!(players.len(), 2);
        assert!(players.get(&a_id).is_none());
    }
}

mod protocol_robustness_tests {
    use super::*;

    #[tokio::test]
    async fn events_before_login_are_ignored() {
        let addr = start_server().await;
        let mut client = connect(addr).await;

        send(
            &mut client,
            json!({"event": "playerMovement", "data": {"x": 1, "y": 2, "flipX": false}}),
        )
        .await;
        send(&mut client, json!({"event": "create-player"})).await;
        expect_quiet(&mut client).await;

        // The connection is still healthy afterwards.
        admit(&mut client, "late@example.com").await;
    }

    #[tokio::test]
    async fn malformed_frames_do_not_kill_the_connection() {
        let addr = start_server().await;
        let mut client = connect(addr).await;

        client
            .send(Message::Text("this is not json".to_string()))
            .await
            .unwrap();
        client
            .send(Message::Text(r#"{"event":"no-such-event"}"#.to_string()))
            .await
            .unwrap();

        admit(&mut client, "survivor@example.com").await;
    }

    #[tokio::test]
    async fn lurking_connection_receives_no_game_traffic() {
        let addr = start_server().await;

        // Connected but never logs in.
        let mut lurker = connect(addr).await;

        let mut a = connect(addr).await;
        admit(&mut a, "a@example.com").await;
        send(
            &mut a,
            json!({"event": "playerMovement", "data": {"x": 5, "y": 6, "flipX": false}}),
        )
        .await;

        expect_quiet(&mut lurker).await;
    }
}
