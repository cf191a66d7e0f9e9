use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::timeout;

use shared_canvas_server::connection::{ConnectionCommand, ConnectionEvent};
use shared_canvas_server::server::{list_sessions, lookup_session, resolve_session, spawn_server};
use shared_canvas_server::session::{
    describe_session, spawn_session, SessionCommand, SessionDescription, SessionTx,
};
use system::{
    ClientMessage, ConnectionId, Palette, ParticipantId, Point, SessionData, Stroke, Tool,
};

struct Client {
    connection_id: ConnectionId,
    participant_id: ParticipantId,
    color: String,
    name: String,
    rx: mpsc::UnboundedReceiver<ConnectionEvent>,
}

impl Client {
    async fn join(session: &SessionTx) -> Client {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connection_id = ConnectionId::new_v4();
        session
            .send(SessionCommand::Connection(ConnectionCommand::Connect {
                connection_id,
                tx,
            }))
            .expect("session is running");

        let participant_id = match recv(&mut rx).await {
            ConnectionEvent::Admitted { participant_id } => participant_id,
            other => panic!("expected admission, got {:?}", other),
        };
        let mut client = Client {
            connection_id,
            participant_id,
            color: String::new(),
            name: String::new(),
            rx,
        };

        let init = client.next().await;
        assert_eq!(init["type"], "init");
        assert_eq!(init["clientId"], client.participant_id.as_str());
        client.color = init["color"].as_str().expect("color").to_owned();
        client.name = init["name"].as_str().expect("name").to_owned();

        assert_eq!(client.next().await["type"], "fullUpdate");
        assert_eq!(client.next().await["type"], "users");
        client
    }

    fn send(&self, session: &SessionTx, message: ClientMessage) {
        session
            .send(SessionCommand::Connection(ConnectionCommand::Inbound {
                connection_id: self.connection_id,
                message,
            }))
            .expect("session is running");
    }

    fn leave(&self, session: &SessionTx) {
        session
            .send(SessionCommand::Connection(ConnectionCommand::Disconnect {
                connection_id: self.connection_id,
            }))
            .expect("session is running");
    }

    async fn next(&mut self) -> Value {
        match recv(&mut self.rx).await {
            ConnectionEvent::Text(text) => serde_json::from_str(&text).expect("valid json"),
            other => panic!("expected text, got {:?}", other),
        }
    }

    fn assert_idle(&mut self) {
        match self.rx.try_recv() {
            Err(TryRecvError::Empty) => {}
            other => panic!("unexpected event {:?}", other),
        }
    }

    fn drain(&mut self) {
        while self.rx.try_recv().is_ok() {}
    }
}

async fn recv(rx: &mut mpsc::UnboundedReceiver<ConnectionEvent>) -> ConnectionEvent {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("channel closed")
}

/// Round trip through the session task; everything sent before it has been
/// handled once this returns.
async fn settle(session: &SessionTx) -> SessionDescription {
    describe_session(session).await.expect("session is running")
}

fn session() -> SessionTx {
    spawn_session("test".to_owned(), Palette::default())
}

fn sample_stroke(id: &str) -> Stroke {
    Stroke::new(
        vec![Point { x: 0.0, y: 0.0 }, Point { x: 10.0, y: 10.0 }],
        "#000",
        4.0,
        Tool::Brush,
        id,
    )
}

#[tokio::test]
async fn admission_syncs_state_and_announces_roster() {
    let session = session();
    let mut p1 = Client::join(&session).await;
    p1.send(&session, ClientMessage::Draw {
        stroke: sample_stroke("s1"),
    });
    settle(&session).await;
    p1.drain();

    let (tx, mut rx) = mpsc::unbounded_channel();
    session
        .send(SessionCommand::Connection(ConnectionCommand::Connect {
            connection_id: ConnectionId::new_v4(),
            tx,
        }))
        .expect("");
    assert!(matches!(recv(&mut rx).await, ConnectionEvent::Admitted { .. }));
    let texts = {
        let mut texts = Vec::new();
        for _ in 0..3 {
            match recv(&mut rx).await {
                ConnectionEvent::Text(text) => {
                    texts.push(serde_json::from_str::<Value>(&text).expect(""))
                }
                other => panic!("unexpected {:?}", other),
            }
        }
        texts
    };
    assert_eq!(texts[0]["type"], "init");
    assert_eq!(texts[0]["room"], "test");
    assert_eq!(texts[1]["type"], "fullUpdate");
    assert_eq!(texts[1]["strokes"][0]["strokeId"], "s1");
    assert_eq!(texts[2]["type"], "users");
    assert_eq!(texts[2]["users"].as_array().map(Vec::len), Some(2));

    let roster = p1.next().await;
    assert_eq!(roster["type"], "users");
    assert_eq!(roster["users"][0]["id"], p1.participant_id.as_str());
}

#[tokio::test]
async fn participants_get_palette_colors_in_turn() {
    let session = spawn_session(
        "colors".to_owned(),
        Palette::new(vec!["red".into(), "blue".into()]).expect(""),
    );
    let a = Client::join(&session).await;
    let b = Client::join(&session).await;
    let c = Client::join(&session).await;
    assert_eq!(
        vec![a.color, b.color, c.color],
        vec!["red", "blue", "red"]
    );
}

#[tokio::test]
async fn draw_is_committed_and_echoed_to_everyone() {
    let session = session();
    let mut p1 = Client::join(&session).await;
    let mut p2 = Client::join(&session).await;
    p1.drain();

    p1.send(&session, ClientMessage::Draw {
        stroke: sample_stroke("s1"),
    });
    let desc = settle(&session).await;

    let committed = desc.strokes.last().expect("stroke committed");
    assert_eq!(committed.stroke_id, "s1");
    assert_eq!(committed.author_id.as_ref(), Some(&p1.participant_id));

    for client in [&mut p1, &mut p2].iter_mut() {
        let msg = client.next().await;
        assert_eq!(msg["type"], "draw");
        assert_eq!(msg["stroke"]["strokeId"], "s1");
        assert_eq!(msg["stroke"]["userId"], p1_id(&desc));
        assert_eq!(
            msg["stroke"]["points"],
            json!([{"x": 0.0, "y": 0.0}, {"x": 10.0, "y": 10.0}])
        );
        client.assert_idle();
    }
}

fn p1_id(desc: &SessionDescription) -> &str {
    desc.users[0].id.as_str()
}

#[tokio::test]
async fn client_supplied_author_is_overwritten() {
    let session = session();
    let mut p1 = Client::join(&session).await;
    p1.send(&session, ClientMessage::Draw {
        stroke: sample_stroke("s1").authored_by("spoofed".into()),
    });
    let desc = settle(&session).await;
    assert_eq!(desc.strokes[0].author_id.as_ref(), Some(&p1.participant_id));
    assert_eq!(p1.next().await["stroke"]["userId"], p1.participant_id.as_str());
}

#[tokio::test]
async fn cursor_skips_the_sender() {
    let session = session();
    let mut p1 = Client::join(&session).await;
    let mut p2 = Client::join(&session).await;
    p1.drain();

    p1.send(&session, ClientMessage::Cursor { x: 5.0, y: 6.5 });
    settle(&session).await;

    let msg = p2.next().await;
    assert_eq!(
        msg,
        json!({
            "type": "cursor",
            "userId": p1.participant_id.as_str(),
            "x": 5.0,
            "y": 6.5,
            "color": p1.color,
            "name": p1.name,
        })
    );
    p1.assert_idle();
    assert!(settle(&session).await.strokes.is_empty());
}

#[tokio::test]
async fn chat_echoes_to_sender_as_you() {
    let session = session();
    let mut p1 = Client::join(&session).await;
    let mut p2 = Client::join(&session).await;
    let mut p3 = Client::join(&session).await;
    p1.drain();
    p2.drain();

    p1.send(&session, ClientMessage::Chat { text: "hi".into() });
    settle(&session).await;

    for other in [&mut p2, &mut p3].iter_mut() {
        assert_eq!(
            other.next().await,
            json!({"type": "chat", "from": p1.name, "text": "hi"})
        );
        other.assert_idle();
    }
    assert_eq!(
        p1.next().await,
        json!({"type": "chat", "from": "You", "text": "hi"})
    );
    p1.assert_idle();
}

#[tokio::test]
async fn rename_rebroadcasts_roster() {
    let session = session();
    let mut p1 = Client::join(&session).await;
    let mut p2 = Client::join(&session).await;
    p1.drain();

    p1.send(&session, ClientMessage::SetName {
        name: "Alice".into(),
    });
    settle(&session).await;

    let expected = json!({
        "id": p1.participant_id.as_str(),
        "name": "Alice",
        "color": p1.color,
    });
    for client in [&mut p1, &mut p2].iter_mut() {
        let msg = client.next().await;
        assert_eq!(msg["type"], "users");
        assert!(msg["users"]
            .as_array()
            .expect("users")
            .contains(&expected));
    }
}

#[tokio::test]
async fn empty_rename_keeps_name_but_still_resyncs_roster() {
    let session = session();
    let mut p1 = Client::join(&session).await;
    p1.send(&session, ClientMessage::SetName {
        name: String::new(),
    });
    let desc = settle(&session).await;
    assert_eq!(desc.users[0].name, p1.name);
    assert_eq!(p1.next().await["users"][0]["name"], p1.name.as_str());
}

#[tokio::test]
async fn clear_resets_history_for_everyone() {
    let session = session();
    let mut p1 = Client::join(&session).await;
    let mut p2 = Client::join(&session).await;
    p1.send(&session, ClientMessage::Draw {
        stroke: sample_stroke("a"),
    });
    p1.send(&session, ClientMessage::Draw {
        stroke: sample_stroke("b"),
    });
    p2.send(&session, ClientMessage::Undo);
    settle(&session).await;
    p1.drain();
    p2.drain();

    p1.send(&session, ClientMessage::Clear);
    let desc = settle(&session).await;
    assert!(desc.strokes.is_empty());
    assert_eq!(desc.undone, 0);

    for client in [&mut p1, &mut p2].iter_mut() {
        assert_eq!(
            client.next().await,
            json!({"type": "fullUpdate", "strokes": []})
        );
    }
}

#[tokio::test]
async fn undo_is_shared_across_participants() {
    let session = session();
    let mut p1 = Client::join(&session).await;
    let mut p2 = Client::join(&session).await;
    p1.send(&session, ClientMessage::Draw {
        stroke: sample_stroke("mine"),
    });
    settle(&session).await;
    p1.drain();
    p2.drain();

    // p2 can take back p1's stroke
    p2.send(&session, ClientMessage::Undo);
    let desc = settle(&session).await;
    assert!(desc.strokes.is_empty());
    assert_eq!(desc.undone, 1);
    for client in [&mut p1, &mut p2].iter_mut() {
        assert_eq!(client.next().await["strokes"], json!([]));
    }

    p1.send(&session, ClientMessage::Redo);
    let desc = settle(&session).await;
    assert_eq!(desc.strokes.len(), 1);
    for client in [&mut p1, &mut p2].iter_mut() {
        assert_eq!(client.next().await["strokes"][0]["strokeId"], "mine");
    }
}

#[tokio::test]
async fn undo_on_empty_history_changes_nothing() {
    let session = session();
    let mut p1 = Client::join(&session).await;
    p1.send(&session, ClientMessage::Undo);
    let desc = settle(&session).await;
    assert!(desc.strokes.is_empty());
    assert_eq!(desc.undone, 0);
    assert_eq!(
        p1.next().await,
        json!({"type": "fullUpdate", "strokes": []})
    );
    p1.assert_idle();
}

#[tokio::test]
async fn load_session_replaces_strokes() {
    let session = session();
    let mut p1 = Client::join(&session).await;
    let mut p2 = Client::join(&session).await;
    p1.send(&session, ClientMessage::Draw {
        stroke: sample_stroke("old"),
    });
    p1.send(&session, ClientMessage::Undo);
    settle(&session).await;
    p1.drain();
    p2.drain();

    let imported = vec![sample_stroke("x"), sample_stroke("y")];
    p2.send(&session, ClientMessage::LoadSession {
        data: SessionData {
            strokes: imported.clone(),
        },
    });
    let desc = settle(&session).await;
    assert_eq!(desc.strokes, imported);
    assert_eq!(desc.undone, 0);

    for client in [&mut p1, &mut p2].iter_mut() {
        let msg = client.next().await;
        assert_eq!(msg["type"], "fullUpdate");
        assert_eq!(msg["strokes"][1]["strokeId"], "y");
    }
}

#[tokio::test]
async fn leaving_is_announced_exactly_once() {
    let session = session();
    let mut p1 = Client::join(&session).await;
    let p2 = Client::join(&session).await;
    settle(&session).await;
    p1.drain();

    p2.leave(&session);
    p2.leave(&session);
    let desc = settle(&session).await;
    assert_eq!(desc.users.len(), 1);

    let roster = p1.next().await;
    assert_eq!(
        roster,
        json!({
            "type": "users",
            "users": [{"id": p1.participant_id.as_str(), "name": p1.name, "color": p1.color}],
        })
    );
    p1.assert_idle();
}

#[tokio::test]
async fn messages_after_leaving_are_ignored() {
    let session = session();
    let mut p1 = Client::join(&session).await;
    let p2 = Client::join(&session).await;
    p2.leave(&session);
    p2.send(&session, ClientMessage::Draw {
        stroke: sample_stroke("ghost"),
    });
    let desc = settle(&session).await;
    assert!(desc.strokes.is_empty());
    p1.drain();
    p1.assert_idle();
}

#[tokio::test]
async fn closed_connections_do_not_block_others() {
    let session = session();
    let mut p1 = Client::join(&session).await;
    let p2 = Client::join(&session).await;
    p1.drain();
    drop(p2);

    p1.send(&session, ClientMessage::Draw {
        stroke: sample_stroke("s1"),
    });
    let desc = settle(&session).await;
    assert_eq!(desc.strokes.len(), 1);
    assert_eq!(desc.users.len(), 2);
    assert_eq!(p1.next().await["type"], "draw");
}

#[tokio::test]
async fn slow_reader_still_receives_every_draw() {
    let session = session();
    let p1 = Client::join(&session).await;
    let mut p2 = Client::join(&session).await;

    // p2 reads nothing while p1 floods the session
    for i in 0..100 {
        p1.send(&session, ClientMessage::Draw {
            stroke: sample_stroke(&format!("s{}", i)),
        });
    }
    let desc = settle(&session).await;
    assert_eq!(desc.strokes.len(), 100);

    for i in 0..100 {
        let msg = p2.next().await;
        assert_eq!(msg["type"], "draw");
        assert_eq!(msg["stroke"]["strokeId"], format!("s{}", i));
    }
    p2.assert_idle();
}

#[tokio::test]
async fn sessions_are_isolated_by_name() {
    let srv_tx = spawn_server(Palette::default());
    let first = resolve_session(&srv_tx, "first").await.expect("");
    let second = resolve_session(&srv_tx, "second").await.expect("");

    let mut p1 = Client::join(&first).await;
    p1.send(&first, ClientMessage::Draw {
        stroke: sample_stroke("s1"),
    });
    settle(&first).await;
    assert_eq!(p1.next().await["type"], "draw");

    let other = settle(&second).await;
    assert!(other.strokes.is_empty());
    assert!(other.users.is_empty());
    assert_eq!(settle(&first).await.strokes.len(), 1);

    let names = list_sessions(&srv_tx)
        .await
        .expect("")
        .into_iter()
        .map(|(name, _)| name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["first", "second"]);
    assert!(lookup_session(&srv_tx, "third").await.expect("").is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_resolution_creates_one_session() {
    let srv_tx = spawn_server(Palette::default());
    let handles = (0..16)
        .map(|_| {
            let srv_tx = srv_tx.clone();
            tokio::spawn(async move { resolve_session(&srv_tx, "shared").await })
        })
        .collect::<Vec<_>>();

    let mut resolved = Vec::new();
    for handle in handles {
        resolved.push(handle.await.expect("task").expect("registry"));
    }
    assert!(resolved.iter().all(|tx| tx.same_channel(&resolved[0])));
    assert_eq!(list_sessions(&srv_tx).await.expect("").len(), 1);
}
