//! Stream ingestor integration harness.
//!
//! # What this covers
//!
//! - **Handshake**: `PASS`, `NICK` and `JOIN #channel` are sent in that order,
//!   each newline-terminated.
//! - **Keep-alive**: every `PING` is answered with `PONG :tmi.twitch.tv` and
//!   never reaches the log.
//! - **Welcome noise**: the first two non-PING lines are discarded; every
//!   later line is logged with a timestamp.
//! - **Session end**: a relay hang-up ends the session without reconnecting;
//!   `stop` cancels a live session; a rejected token ends it with an auth error.
//! - **Start failures**: unreachable relay, missing token, duplicate start
//!   (sequential or concurrent).
//! - **Slow connects**: a pending connect does not block the session table.
//!
//! # What this does NOT cover
//!
//! - TLS relays
//! - Relays that split a line across several TCP segments mid-PING
//!
//! # Running
//!
//! ```sh
//! cargo test --test ingest_harness
//! ```

mod common;
use common::*;

use chatpick::{ChatPick, Error, IngestError, IrcIngestor, LogStore, SessionEnd};
use pretty_assertions::assert_eq;
use std::time::Duration;

async fn wait_until_stopped(app: &ChatPick) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !app.running_channels().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session never ended");
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

#[tokio::test]
async fn handshake_sends_pass_nick_join() {
    let dir = tempfile::tempdir().unwrap();
    let relay = FakeRelay::bind().await;
    let app = ChatPick::new(&ConfigBuilder::new(dir.path()).port(relay.port()).build());

    app.start_ingestion("  chan ").await.unwrap();
    let mut conn = relay.accept().await;

    assert_eq!(
        conn.handshake().await,
        vec!["PASS oauth:test-token", "NICK reader", "JOIN #chan"]
    );
    assert_eq!(app.running_channels().await, vec!["chan".to_string()]);
}

// ---------------------------------------------------------------------------
// Keep-alive and logging
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ping_is_answered_and_not_logged() {
    let dir = tempfile::tempdir().unwrap();
    let relay = FakeRelay::bind().await;
    let cfg = ConfigBuilder::new(dir.path()).port(relay.port()).build();
    let app = ChatPick::new(&cfg);

    app.start_ingestion("chan").await.unwrap();
    let mut conn = relay.accept().await;
    conn.handshake().await;

    conn.send(PING).await;
    assert_eq!(conn.next_line().await.as_deref(), Some(PONG));

    for line in WELCOME_BURST {
        conn.send(line).await;
    }
    conn.send(&privmsg("alice", "chan", "hi")).await;
    conn.sync().await;

    let store = LogStore::new(cfg.log_settings());
    let lines = store.read_lines("chan").unwrap();
    assert_eq!(lines.len(), 1, "only the chat line is logged: {lines:?}");
    assert!(lines.iter().all(|l| !l.contains("PING")));
}

#[tokio::test]
async fn welcome_lines_are_discarded_and_chat_is_logged() {
    let dir = tempfile::tempdir().unwrap();
    let relay = FakeRelay::bind().await;
    let cfg = ConfigBuilder::new(dir.path()).port(relay.port()).build();
    let app = ChatPick::new(&cfg);

    app.start_ingestion("chan").await.unwrap();
    let mut conn = relay.accept().await;
    conn.handshake().await;

    for line in WELCOME_BURST {
        conn.send(line).await;
    }
    conn.send(&privmsg("alice", "chan", "first")).await;
    conn.send(":tmi.twitch.tv 353 reader = #chan :reader\r\n").await;
    conn.send(&privmsg("bob", "chan", "second")).await;
    conn.sync().await;

    let store = LogStore::new(cfg.log_settings());
    let lines = store.read_lines("chan").unwrap();
    assert_eq!(lines.len(), 3);
    assert!(!lines.iter().any(|l| l.contains("Welcome")));
    assert!(lines[1].contains(" 353 "), "non-chat lines after the welcome are kept");

    assert_eq!(
        store.read_messages("chan").unwrap(),
        chats(&[("alice", "first"), ("bob", "second")])
    );
}

// ---------------------------------------------------------------------------
// Session end
// ---------------------------------------------------------------------------

#[tokio::test]
async fn relay_hangup_ends_session_without_reconnect() {
    let dir = tempfile::tempdir().unwrap();
    let relay = FakeRelay::bind().await;
    let app = ChatPick::new(&ConfigBuilder::new(dir.path()).port(relay.port()).build());

    app.start_ingestion("chan").await.unwrap();
    let mut conn = relay.accept().await;
    conn.handshake().await;
    conn.close();

    wait_until_stopped(&app).await;
    let ends = app.shutdown().await;
    assert_eq!(ends.len(), 1);
    assert!(matches!(ends[0].1, Ok(SessionEnd::Closed)));

    let reconnect = tokio::time::timeout(Duration::from_millis(200), relay.accept_raw()).await;
    assert!(reconnect.is_err(), "ingestor must not reconnect on its own");
}

#[tokio::test]
async fn stop_cancels_a_live_session() {
    let dir = tempfile::tempdir().unwrap();
    let relay = FakeRelay::bind().await;
    let app = ChatPick::new(&ConfigBuilder::new(dir.path()).port(relay.port()).build());

    app.start_ingestion("chan").await.unwrap();
    let mut conn = relay.accept().await;
    conn.handshake().await;

    assert_eq!(app.stop("chan").await.unwrap(), SessionEnd::Cancelled);
    assert!(app.running_channels().await.is_empty());
    assert_eq!(conn.next_line().await, None, "socket is closed after stop");

    assert!(matches!(app.stop("chan").await, Err(Error::NotRunning(_))));
}

#[tokio::test]
async fn rejected_token_ends_session_with_auth_error() {
    let dir = tempfile::tempdir().unwrap();
    let relay = FakeRelay::bind().await;
    let cfg = ConfigBuilder::new(dir.path()).port(relay.port()).build();
    let ingestor = IrcIngestor::new(cfg.connection.clone(), LogStore::new(cfg.log_settings()));

    let session = ingestor.start("chan").await.unwrap();
    let mut conn = relay.accept().await;
    conn.handshake().await;
    conn.send(AUTH_FAILED).await;

    let err = session.wait().await.unwrap_err();
    assert!(matches!(err, IngestError::Auth(ref notice) if notice.contains("Login authentication failed")));
}

// ---------------------------------------------------------------------------
// Start failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_relay_is_a_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let port = {
        let relay = FakeRelay::bind().await;
        relay.port()
    };
    let app = ChatPick::new(&ConfigBuilder::new(dir.path()).port(port).build());

    let err = app.start_ingestion("chan").await.unwrap_err();
    assert!(matches!(err, Error::Ingest(IngestError::Connection(_))), "{err:?}");
    assert!(app.running_channels().await.is_empty());
}

#[tokio::test]
async fn missing_token_is_an_auth_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = ChatPick::new(&ConfigBuilder::new(dir.path()).token("").build());

    let err = app.start_ingestion("chan").await.unwrap_err();
    assert!(matches!(err, Error::Ingest(IngestError::Auth(_))), "{err:?}");
}

#[tokio::test]
async fn live_channel_cannot_be_started_twice() {
    let dir = tempfile::tempdir().unwrap();
    let relay = FakeRelay::bind().await;
    let app = ChatPick::new(&ConfigBuilder::new(dir.path()).port(relay.port()).build());

    app.start_ingestion("chan").await.unwrap();
    let _conn = relay.accept().await;

    assert!(matches!(
        app.start_ingestion("#chan").await,
        Err(Error::AlreadyRunning(_))
    ));
}

#[tokio::test]
async fn blank_channel_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let app = ChatPick::new(&ConfigBuilder::new(dir.path()).build());
    assert!(matches!(
        app.start_ingestion("   ").await,
        Err(Error::Core(chatpick_core::Error::InvalidChannel(_)))
    ));
}

#[tokio::test]
async fn concurrent_starts_of_one_channel_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let relay = FakeRelay::bind().await;
    let app = ChatPick::new(&ConfigBuilder::new(dir.path()).port(relay.port()).build());

    let (a, b) = tokio::join!(app.start_ingestion("chan"), app.start_ingestion("#chan"));
    let _conn = relay.accept().await;

    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|r| matches!(r, Err(Error::AlreadyRunning(c)) if c == "chan")));
    assert_eq!(app.running_channels().await, vec!["chan".to_string()]);
}

#[tokio::test]
async fn pending_connect_does_not_block_other_calls() {
    let dir = tempfile::tempdir().unwrap();
    // Non-routable: the connect hangs until its timeout (or fails fast where
    // the network reports it unreachable).
    let app = ChatPick::new(&ConfigBuilder::new(dir.path()).server("10.255.255.1").build());

    let slow = tokio::time::timeout(Duration::from_secs(2), app.start_ingestion("slow"));
    let others = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let running = tokio::time::timeout(Duration::from_millis(500), app.running_channels())
            .await
            .expect("running_channels blocked behind a pending connect");
        let stop = tokio::time::timeout(Duration::from_millis(500), app.stop("other"))
            .await
            .expect("stop blocked behind a pending connect");
        (running, stop)
    };

    let (_slow, (running, stop)) = tokio::join!(slow, others);
    assert!(running.is_empty());
    assert!(matches!(stop, Err(Error::NotRunning(_))));
}
