//! End-to-end session against a scripted local game server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use pocket_duel::network::{SessionError, SessionState};
use pocket_duel::{ClientConfig, Session, SessionEvent, SessionIdentity};

const STEP: Duration = Duration::from_secs(5);

fn state_update(turn: u32, active: &str, my_hp: u32) -> Value {
    json!({
        "type": "state_update",
        "state": {
            "turn": turn,
            "active_player": active,
            "your_info": {
                "name": "client_flow",
                "hand_size": 5,
                "deck_size": 14,
                "active_pokemon": {"name": "Sprout", "hp": my_hp, "max_hp": 70, "energies": ["GRASS"]},
                "bench": []
            },
            "opponent_info": {
                "hand_size": 4,
                "deck_size": 14,
                "active_pokemon": null,
                "bench": []
            }
        }
    })
}

/// Accept one client, play a short script, return the request path and
/// every text frame the client sent.
async fn scripted_server(listener: TcpListener) -> (String, Vec<Value>) {
    let (stream, _) = listener.accept().await.unwrap();
    let mut path = String::new();
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        path = req.uri().path().to_string();
        Ok(resp)
    };
    let mut ws = accept_hdr_async(stream, callback).await.unwrap();
    let mut received = Vec::new();

    async fn next_text<S>(ws: &mut tokio_tungstenite::WebSocketStream<S>) -> Value
    where
        S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        loop {
            match timeout(STEP, ws.next()).await.unwrap() {
                Some(Ok(Message::Text(text))) => return serde_json::from_str(&text).unwrap(),
                Some(Ok(_)) => continue,
                other => panic!("client went away: {:?}", other),
            }
        }
    }

    received.push(next_text(&mut ws).await);

    let script = [
        json!({"type": "waiting", "message": "Waiting for opponent..."}),
        json!({"type": "game_start", "game_id": "g-flow", "timestamp": "2026-10-17T12:00:00"}),
        state_update(1, "client_flow", 70),
        state_update(1, "client_rival", 50),
        state_update(2, "client_flow", 30),
        json!({"type": "action_request", "data": {"selections": {"0": "Attack", "1": "End turn"}}}),
    ];
    for (i, frame) in script.into_iter().enumerate() {
        // The second snapshot goes out as a binary frame.
        let message = if i == 3 {
            Message::Binary(frame.to_string().into_bytes())
        } else {
            Message::Text(frame.to_string())
        };
        ws.send(message).await.unwrap();
    }

    received.push(next_text(&mut ws).await);

    ws.close(None).await.unwrap();
    while let Ok(Some(Ok(_))) = timeout(STEP, ws.next()).await {}

    (path, received)
}

#[tokio::test]
async fn test_full_session_flow() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(scripted_server(listener));

    let config = ClientConfig {
        server_url: format!("ws://{}", addr),
        ..Default::default()
    };
    let identity = SessionIdentity::parse("client_flow").unwrap();

    let (mut session, mut events) = Session::connect(&config, &identity).await.unwrap();
    let mut notices = session.subscribe();
    let mut snapshots = session.watch_state();
    session.request_match().unwrap();

    let mut turns_seen = Vec::new();
    let mut hp_seen = Vec::new();
    loop {
        let event = timeout(STEP, events.recv())
            .await
            .expect("session stalled")
            .expect("event stream ended before Closed");
        let state = session.handle(event);

        if snapshots.has_changed().unwrap_or(false) {
            if let Some(snapshot) = snapshots.borrow_and_update().clone() {
                turns_seen.push((snapshot.turn_number, snapshot.active_player.clone()));
                hp_seen.push(snapshot.self_view.active_creature.as_ref().unwrap().current_health);
            }
        }

        if session.pending().is_some() {
            assert!(session.state().unwrap().is_turn_of("client_flow"));
            session.respond(1).unwrap();
            assert!(matches!(session.respond(1), Err(SessionError::StaleAction(_))));
        }

        if state == SessionState::Closed {
            break;
        }
    }

    let (path, received) = timeout(STEP, server).await.unwrap().unwrap();
    assert_eq!(path, "/ws/client_flow");
    assert_eq!(
        received,
        vec![
            json!({"type": "match_request"}),
            json!({"type": "action_response", "data": {"selected_index": 1}}),
        ]
    );

    assert_eq!(
        turns_seen,
        vec![
            (1, "client_flow".to_string()),
            (1, "client_rival".to_string()),
            (2, "client_flow".to_string()),
        ]
    );
    assert_eq!(hp_seen, vec![70, 50, 30]);

    assert!(session.state().is_none());
    assert!(session.pending().is_none());

    let mut kinds = Vec::new();
    while let Ok(event) = notices.try_recv() {
        kinds.push(event);
    }
    assert_eq!(kinds.first(), Some(&SessionEvent::Connected));
    assert!(!kinds.iter().any(|e| matches!(e, SessionEvent::FrameDiscarded(_))));
    assert!(kinds.contains(&SessionEvent::Waiting("Waiting for opponent...".to_string())));
    assert!(kinds.contains(&SessionEvent::MatchStarted {
        game_id: Some("g-flow".to_string())
    }));
    assert!(matches!(kinds.last(), Some(SessionEvent::Closed(_))));
}

#[tokio::test]
async fn test_connect_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig {
        server_url: format!("ws://{}", addr),
        ..Default::default()
    };
    let identity = SessionIdentity::generate();

    let result = Session::connect(&config, &identity).await;
    assert!(matches!(result, Err(SessionError::Transport(_))));
}
