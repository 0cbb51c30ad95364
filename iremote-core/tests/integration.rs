//! Integration tests: full session lifecycle against a scripted fake
//! controller over a real TCP connection on localhost.

use std::time::Duration;

use futures::StreamExt;
use iremote_core::{
    ChangedItem, ClientStatus, ControllerNotice, FrameCodec, IRemoteError, Session, SessionConfig,
    SessionEvent,
};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;

// ── Fake controller ──────────────────────────────────────────────

/// What the fake controller knows and how it behaves.
#[derive(Clone)]
struct Script {
    status: u8,
    sockets: Vec<(&'static str, bool)>,
    lights: Vec<(&'static str, bool)>,
    /// One room with a single curve step, and one timer.
    with_room_and_timer: bool,
    /// Poll replies, one batch per `POLL`.
    polls: Vec<Vec<&'static str>>,
    /// Close the socket instead of answering this token.
    hang_up_on: Option<&'static str>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            status: 0,
            sockets: vec![("Hall", false), ("Garage", false), ("Garden", true)],
            lights: vec![("Kitchen", true), ("Porch", false)],
            with_room_and_timer: false,
            polls: Vec::new(),
            hang_up_on: None,
        }
    }
}

fn count(n: usize) -> Vec<u8> {
    (n as u16).to_be_bytes().to_vec()
}

fn named(name: &str, record: &[u8]) -> Vec<u8> {
    let mut out = vec![name.len() as u8];
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(record);
    out
}

fn frame(message: &str) -> Vec<u8> {
    FrameCodec::frame(message).to_vec()
}

impl Script {
    fn reply(&self, token: &str, polls: &mut impl Iterator<Item = Vec<&'static str>>) -> Vec<u8> {
        let (cmd, arg) = match token.split_once(':') {
            Some((cmd, arg)) => (cmd, Some(arg)),
            None => (token, None),
        };
        let index = |arg: &str| arg.parse::<usize>().unwrap();
        let rooms = usize::from(self.with_room_and_timer);

        match (cmd, arg) {
            ("STOPTAB", None) => count(self.sockets.len()),
            ("STOPTAB", Some(i)) => {
                let (name, on) = self.sockets[index(i)];
                named(name, &[u8::from(on)])
            }
            ("LAMPTAB", None) => count(self.lights.len()),
            ("LAMPTAB", Some(i)) => {
                let (name, on) = self.lights[index(i)];
                named(name, &[u8::from(on)])
            }
            ("RUIMTETAB", None) => count(rooms),
            ("RUIMTETAB", Some(_)) => named(
                "Living",
                &[
                    15, // correction 0.0
                    0, 41, // measured 20.5
                    0, 42, // day 21.0
                    0, 34, // night 17.0
                    1,  // day mode
                    1, 0, // enabled, idle
                    0, 48, // airco 24.0
                    1,  // airco on temperature
                    0, 0, // airco off
                    0, 1, // one curve step
                    0,  // indoor
                ],
            ),
            // Monday 06:30, 20.0
            ("VERLOOPTAB", Some(_)) => vec![1, 6, 30, 0, 40],
            ("TIMERTAB", None) => count(rooms),
            // Instruction 4, Tuesday 07:15, on
            ("TIMERTAB", Some(_)) => vec![0, 4, 2, 7, 15, 1],
            ("BUILDPROGTEXT", Some(_)) => {
                let mut out = count("Porch light".len());
                out.extend_from_slice(b"Porch light");
                out
            }
            ("MASTERVERSIE", None) => vec![7],
            ("POLL", None) => {
                let batch = polls.next().unwrap_or_default();
                let mut out = count(batch.len());
                for message in batch {
                    out.extend(frame(message));
                }
                out
            }
            (cmd, None) if cmd.ends_with("TAB") => count(0),
            // Fire-and-forget.
            _ => Vec::new(),
        }
    }
}

/// Bind on an ephemeral port and serve one client with `script`.
/// Resolves to every token the client sent.
async fn spawn_controller(script: Script) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        write.write_all(&[script.status]).await.unwrap();

        let mut frames = FramedRead::new(read, FrameCodec);
        let mut polls = script.polls.clone().into_iter();
        let mut seen = Vec::new();
        while let Some(Ok(token)) = frames.next().await {
            seen.push(token.clone());
            if script.hang_up_on == Some(token.as_str()) {
                break;
            }
            let reply = script.reply(&token, &mut polls);
            if !reply.is_empty() && write.write_all(&reply).await.is_err() {
                break;
            }
        }
        seen
    });
    (port, handle)
}

// ── Helpers ──────────────────────────────────────────────────────

fn session() -> Session {
    Session::new(SessionConfig {
        read_timeout_ms: 2000,
        ..SessionConfig::default()
    })
}

fn drain(events: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn statuses(events: &[SessionEvent]) -> Vec<ClientStatus> {
    events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Status(status) => Some(*status),
            _ => None,
        })
        .collect()
}

async fn finish(session: Session, server: JoinHandle<Vec<String>>) -> Vec<String> {
    session.dispose().await;
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("controller did not finish")
        .unwrap()
}

// ── Connect and download ─────────────────────────────────────────

#[tokio::test]
async fn test_connect_downloads_snapshot() {
    let (port, server) = spawn_controller(Script {
        with_room_and_timer: true,
        ..Script::default()
    })
    .await;
    let session = session();
    let mut events = session.subscribe();

    session.connect("127.0.0.1", port).await.unwrap();
    assert!(session.is_connected());

    let mut expected = vec![ClientStatus::Connecting, ClientStatus::Downloading(0)];
    expected.extend(
        [9, 18, 27, 36, 45, 55, 64, 73, 82, 91, 100].map(ClientStatus::Downloading),
    );
    expected.push(ClientStatus::Ready);
    assert_eq!(statuses(&drain(&mut events)), expected);

    assert_eq!(session.socket_count(), 3);
    assert_eq!(session.light_count(), 2);
    assert_eq!(session.dimmer_count(), 0);
    assert_eq!(session.socket(2).unwrap().name, "Garden");
    assert!(session.socket(2).unwrap().state);
    assert!(session.socket(3).is_none());

    let room = session.room(0).unwrap();
    assert_eq!(room.name, "Living");
    assert_eq!(room.measured_temp, 20.5);
    assert_eq!(room.curve_steps.len(), 1);
    let step = session.curve_step(0, 0).unwrap();
    assert_eq!((step.day, step.hour, step.minute), (1, 6, 30));
    assert_eq!(step.temperature, 20.0);

    let timer = session.timer(0).unwrap();
    assert_eq!(timer.instruction, 4);
    assert_eq!(timer.instruction_text, "Porch light");
    assert!(!session.audio_init_ok());

    let seen = finish(session, server).await;
    assert_eq!(seen[0], "CLIENTNAME:iremote-rs");
    assert_eq!(&seen[1..3], ["STOPTAB", "STOPTAB:0"]);
    // Curve steps are fetched right after their room.
    let room_at = seen.iter().position(|t| t == "RUIMTETAB:0").unwrap();
    assert_eq!(seen[room_at + 1], "VERLOOPTAB:0:0");
    assert!(seen.contains(&"BUILDPROGTEXT:4".to_string()));
}

#[tokio::test]
async fn test_handshake_rejections() {
    for status in [1u8, 2, 9] {
        let (port, server) = spawn_controller(Script {
            status,
            ..Script::default()
        })
        .await;
        let session = session();
        let mut events = session.subscribe();

        let err = session.connect("127.0.0.1", port).await.unwrap_err();
        match (status, &err) {
            (1, IRemoteError::TooManyConnections)
            | (2, IRemoteError::AccessDenied)
            | (9, IRemoteError::InternalError(_)) => {}
            _ => panic!("status {status}: unexpected {err:?}"),
        }
        assert!(err.is_handshake_rejection());
        assert!(!session.is_connected());
        assert_eq!(
            statuses(&drain(&mut events)),
            vec![ClientStatus::Connecting, ClientStatus::Disconnected]
        );
        assert_eq!(session.socket_count(), 0);

        // No download was attempted.
        assert!(finish(session, server).await.is_empty());
    }
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let session = session();
    let err = session.connect("127.0.0.1", port).await.unwrap_err();
    assert!(matches!(err, IRemoteError::ConnectionFailed { .. }));
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_hang_up_during_download() {
    let (port, server) = spawn_controller(Script {
        hang_up_on: Some("LAMPTAB:1"),
        ..Script::default()
    })
    .await;
    let session = session();
    let mut events = session.subscribe();

    let err = session.connect("127.0.0.1", port).await.unwrap_err();
    assert!(matches!(err, IRemoteError::Communication(_)));
    assert!(!session.is_connected());
    assert_eq!(
        statuses(&drain(&mut events)).last(),
        Some(&ClientStatus::Disconnected)
    );
    // The sockets arrived before the hang-up but must not outlive it.
    assert_eq!(session.socket_count(), 0);
    assert!(session.sockets().is_empty());
    assert!(!session.poll().await.unwrap());

    let seen = finish(session, server).await;
    assert_eq!(seen.last().map(String::as_str), Some("LAMPTAB:1"));
}

#[tokio::test]
async fn test_disconnect_empties_mirror() {
    let (port, server) = spawn_controller(Script {
        with_room_and_timer: true,
        ..Script::default()
    })
    .await;
    let session = session();
    session.connect("127.0.0.1", port).await.unwrap();
    assert_eq!(session.socket_count(), 3);
    assert_eq!(session.room_count(), 1);
    let mut events = session.subscribe();

    session.disconnect().await;
    assert_eq!(
        statuses(&drain(&mut events)),
        vec![ClientStatus::Disconnected]
    );
    assert!(!session.is_connected());
    assert_eq!(session.socket_count(), 0);
    assert_eq!(session.light_count(), 0);
    assert_eq!(session.room_count(), 0);
    assert_eq!(session.timer_count(), 0);
    assert!(session.curve_step(0, 0).is_none());

    finish(session, server).await;
}

// ── Polling ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_poll_applies_changes_in_order() {
    let (port, server) = spawn_controller(Script {
        polls: vec![vec!["SCHANGED:1:1", "LCHANGED:0:0", "CLKCHANGED:12:5"]],
        ..Script::default()
    })
    .await;
    let session = session();
    session.connect("127.0.0.1", port).await.unwrap();
    let mut events = session.subscribe();

    assert!(session.poll().await.unwrap());
    let events = drain(&mut events);
    assert_eq!(events.len(), 3);

    match &events[0] {
        SessionEvent::Changed(change) => {
            assert!(matches!(&change.item, ChangedItem::Socket(s) if s.index == 1 && s.state));
            assert_eq!(change.fields.fields(), ["State"]);
        }
        other => panic!("expected a socket change, got {other:?}"),
    }
    match &events[1] {
        SessionEvent::Changed(change) => {
            assert!(matches!(&change.item, ChangedItem::Light(l) if l.index == 0 && !l.state));
        }
        other => panic!("expected a light change, got {other:?}"),
    }
    assert_eq!(
        events[2],
        SessionEvent::Notice(ControllerNotice::ClockChanged {
            hour: 12,
            minute: 5
        })
    );

    assert!(session.socket(1).unwrap().state);
    assert!(!session.light(0).unwrap().state);
    assert_eq!(session.clock(), Some((12, 5)));

    finish(session, server).await;
}

#[tokio::test]
async fn test_repeated_message_changes_once() {
    let (port, server) = spawn_controller(Script {
        polls: vec![vec!["SCHANGED:2:0"], vec!["SCHANGED:2:0"], vec![]],
        ..Script::default()
    })
    .await;
    let session = session();
    session.connect("127.0.0.1", port).await.unwrap();
    let mut events = session.subscribe();

    assert!(session.poll().await.unwrap());
    assert_eq!(drain(&mut events).len(), 1);

    assert!(session.poll().await.unwrap());
    assert!(session.poll().await.unwrap());
    assert!(drain(&mut events).is_empty());
    assert!(!session.socket(2).unwrap().state);

    finish(session, server).await;
}

#[tokio::test]
async fn test_stale_index_is_skipped() {
    let (port, server) = spawn_controller(Script {
        polls: vec![vec!["SCHANGED:7:1", "SCHANGED:0:1"]],
        ..Script::default()
    })
    .await;
    let session = session();
    session.connect("127.0.0.1", port).await.unwrap();
    let mut events = session.subscribe();

    assert!(session.poll().await.unwrap());
    assert_eq!(drain(&mut events).len(), 1);
    assert!(session.socket(0).unwrap().state);
    assert!(session.is_connected());

    finish(session, server).await;
}

#[tokio::test]
async fn test_config_change_disconnects() {
    let (port, server) = spawn_controller(Script {
        polls: vec![vec!["ALLCHANGED", "SCHANGED:0:1"]],
        ..Script::default()
    })
    .await;
    let session = session();
    session.connect("127.0.0.1", port).await.unwrap();
    let mut events = session.subscribe();

    assert!(!session.poll().await.unwrap());
    let events = drain(&mut events);
    assert_eq!(events.len(), 3);
    // The message after ALLCHANGED is still applied before the disconnect.
    match &events[0] {
        SessionEvent::Changed(change) => {
            assert!(matches!(&change.item, ChangedItem::Socket(s) if s.index == 0 && s.state));
        }
        other => panic!("expected a socket change, got {other:?}"),
    }
    assert_eq!(
        statuses(&events),
        vec![ClientStatus::ConfigChanged, ClientStatus::Disconnected]
    );
    assert!(!session.is_connected());
    assert_eq!(session.socket_count(), 0);

    finish(session, server).await;
}

#[tokio::test]
async fn test_connection_lost_while_polling() {
    let (port, server) = spawn_controller(Script {
        hang_up_on: Some("POLL"),
        ..Script::default()
    })
    .await;
    let session = session();
    session.connect("127.0.0.1", port).await.unwrap();
    let mut events = session.subscribe();

    assert!(!session.poll().await.unwrap());
    assert_eq!(
        statuses(&drain(&mut events)),
        vec![ClientStatus::ConnectionLost]
    );
    assert!(!session.is_connected());
    assert!(!session.poll().await.unwrap());

    finish(session, server).await;
}

#[tokio::test]
async fn test_polling_off_skips_poll() {
    let (port, server) = spawn_controller(Script::default()).await;
    let session = session();
    session.connect("127.0.0.1", port).await.unwrap();

    session.set_polling(false).await.unwrap();
    assert!(session.poll().await.unwrap());

    let seen = finish(session, server).await;
    assert_eq!(seen.last().map(String::as_str), Some("POLLOFF"));
    assert!(!seen.iter().any(|t| t == "POLL"));
}

// ── Commands and queries ─────────────────────────────────────────

#[tokio::test]
async fn test_commands_and_queries() {
    let (port, server) = spawn_controller(Script {
        with_room_and_timer: true,
        ..Script::default()
    })
    .await;
    let session = session();
    session.connect("127.0.0.1", port).await.unwrap();

    assert_eq!(session.master_version().await.unwrap(), 7);
    assert_eq!(session.instruction_text(4).await.unwrap(), "Porch light");

    session.set_timer_time(0, 3, 21, 45).await.unwrap();
    let timer = session.timer(0).unwrap();
    assert_eq!((timer.day, timer.hour, timer.minute), (3, 21, 45));

    session.set_curve_step_time(0, 0, 7, 0).await.unwrap();
    assert_eq!(session.curve_step(0, 0).unwrap().hour, 7);

    session
        .set_room_control_mode(0, iremote_core::RoomControlMode::Off)
        .await
        .unwrap();
    assert!(matches!(
        session.broadcast(&"x".repeat(200)).await,
        Err(IRemoteError::ValueOutOfRange(_))
    ));

    let seen = finish(session, server).await;
    let tail: Vec<&str> = seen.iter().rev().take(4).rev().map(String::as_str).collect();
    assert_eq!(
        tail,
        [
            "TIMINST:0:3:21:45",
            "VERLOOPTIME:0:0:7:0",
            "RUIMTETEMPONOFF:0:0",
            "RUIMTEAIRCOONOFF:0:0"
        ]
    );
}

#[tokio::test]
async fn test_dispose_releases_mirror() {
    let (port, server) = spawn_controller(Script::default()).await;
    let session = session();
    session.connect("127.0.0.1", port).await.unwrap();
    assert_eq!(session.socket_count(), 3);
    let mut events = session.subscribe();

    session.dispose().await;
    assert_eq!(
        statuses(&drain(&mut events)),
        vec![ClientStatus::Disconnected, ClientStatus::Disposed]
    );
    assert_eq!(session.socket_count(), 0);
    assert!(session.sockets().is_empty());
    assert!(matches!(session.poll().await, Err(IRemoteError::Disposed)));

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
}
