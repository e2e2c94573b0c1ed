//! Connecting/Handshaking phase behaviour.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod support;

use tokio::task::JoinHandle;

use disgordian_gateway::session::{SessionEnd, SessionPhase};

use support::{harness, harness_with, refusing_dialer, Harness};

/// Record every phase the session publishes until it is dropped.
fn record_phases(mut rx: tokio::sync::watch::Receiver<SessionPhase>) -> JoinHandle<Vec<SessionPhase>> {
    tokio::spawn(async move {
        let mut seen = vec![*rx.borrow_and_update()];
        while rx.changed().await.is_ok() {
            seen.push(*rx.borrow_and_update());
        }
        seen
    })
}

#[tokio::test(start_paused = true)]
async fn ready_then_first_heartbeat_carries_ready_sequence() {
    let Harness {
        session,
        mut peer,
        mut events,
        shutdown,
        outbound_tx: _outbound_tx,
        outbound_rx,
        metrics,
        ..
    } = harness();
    let sequence = session.sequence();
    let task = tokio::spawn(session.run(outbound_rx));

    peer.send(r#"{"op":10,"d":{"heartbeat_interval":41250}}"#);

    let identify = peer.recv_json().await;
    assert_eq!(identify["op"], 2);
    assert_eq!(identify["d"]["token"], "test-token");
    assert_eq!(identify["d"]["properties"]["$os"], "linux");
    assert_eq!(identify["d"]["properties"]["$browser"], "disgordian");
    assert_eq!(identify["d"]["compress"], false);
    assert_eq!(identify["d"]["large_threshold"], 250);
    assert_eq!(identify["d"]["shard"], serde_json::json!([0, 1]));

    peer.send(r#"{"op":0,"t":"READY","s":1,"d":{"v":6,"session_id":"abc"}}"#);

    let before = tokio::time::Instant::now();
    let heartbeat = peer.recv().await;
    assert_eq!(heartbeat, r#"{"op":1,"d":1}"#);
    assert!(before.elapsed() >= std::time::Duration::from_millis(41250));
    assert_eq!(sequence.read().await, Some(1));

    let ready = events.recv().await.unwrap();
    assert_eq!(ready.kind, "READY");
    assert_eq!(ready.seq, Some(1));

    shutdown.cancel();
    let summary = task.await.unwrap().unwrap();
    assert_eq!(summary.end, SessionEnd::Cancelled);
    assert_eq!(summary.last_sequence, Some(1));
    assert_eq!(peer.close_count(), 1);
    assert_eq!(metrics.heartbeats.total(), 1);
}

#[tokio::test]
async fn dials_with_version_query() {
    let Harness {
        session,
        peer,
        outbound_rx,
        ..
    } = harness();
    let task = tokio::spawn(session.run(outbound_rx));

    peer.send(r#"{"op":10,"d":{"heartbeat_interval":0}}"#);
    assert!(task.await.unwrap().is_err());
    assert_eq!(
        peer.dialed.lock().unwrap().as_slice(),
        ["ws://gateway.test?v=5&encoding=json".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn zero_heartbeat_interval_is_rejected() {
    let Harness {
        session,
        mut peer,
        outbound_rx,
        outbound_tx: _outbound_tx,
        metrics,
        ..
    } = harness();
    let phases = record_phases(session.phase());
    let task = tokio::spawn(session.run(outbound_rx));

    peer.send(r#"{"op":10,"d":{"heartbeat_interval":0}}"#);

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_handshake(), "{err}");
    assert!(err.to_string().contains("zero"));

    // no Identify, no heartbeat: the client side is gone without writing
    assert!(peer.from_client.recv().await.is_none());
    assert_eq!(metrics.heartbeats.total(), 0);
    assert_eq!(metrics.sessions_ended.get(&[("reason", "handshake_failed")]), 1);
    assert_eq!(peer.close_count(), 1);

    let phases = phases.await.unwrap();
    assert!(!phases.contains(&SessionPhase::Active));
    assert!(phases.contains(&SessionPhase::Handshaking));
    assert_eq!(phases.last(), Some(&SessionPhase::Closed));
}

#[tokio::test]
async fn absent_heartbeat_interval_is_rejected() {
    let Harness {
        session,
        mut peer,
        outbound_rx,
        metrics,
        ..
    } = harness();
    let task = tokio::spawn(session.run(outbound_rx));

    peer.send(r#"{"op":10,"d":{"_trace":[]}}"#);

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_handshake());
    assert!(peer.from_client.recv().await.is_none());
    assert_eq!(metrics.heartbeats.total(), 0);
}

#[tokio::test]
async fn first_envelope_must_be_hello() {
    let Harness {
        session,
        mut peer,
        outbound_rx,
        ..
    } = harness();
    let task = tokio::spawn(session.run(outbound_rx));

    peer.send(r#"{"op":0,"s":1,"t":"READY","d":{}}"#);

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_handshake());
    assert!(err.to_string().contains("expected Hello"));
    assert!(peer.from_client.recv().await.is_none());
}

#[tokio::test]
async fn malformed_hello_is_rejected() {
    let Harness {
        session,
        peer,
        outbound_rx,
        ..
    } = harness();
    let task = tokio::spawn(session.run(outbound_rx));

    peer.send(r#"{"d":{"heartbeat_interval":41250}}"#);

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_handshake());
    assert!(err.to_string().contains("missing op"));
}

#[tokio::test]
async fn peer_closing_after_hello_fails_the_handshake() {
    let Harness {
        session,
        mut peer,
        outbound_rx,
        outbound_tx: _outbound_tx,
        metrics,
        ..
    } = harness();
    let phases = record_phases(session.phase());
    let task = tokio::spawn(session.run(outbound_rx));

    peer.send(r#"{"op":10,"d":{"heartbeat_interval":41250}}"#);
    let identify = peer.recv_json().await;
    assert_eq!(identify["op"], 2);
    peer.hang_up();

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_handshake());
    assert!(err.to_string().contains("before READY"), "{err}");
    assert_eq!(peer.close_count(), 1);
    assert_eq!(metrics.heartbeats.total(), 0);

    let phases = phases.await.unwrap();
    assert!(!phases.contains(&SessionPhase::Active));
    assert_eq!(phases.last(), Some(&SessionPhase::Closed));
}

#[tokio::test]
async fn ready_without_sequence_is_rejected() {
    let Harness {
        session,
        mut peer,
        outbound_rx,
        ..
    } = harness();
    let task = tokio::spawn(session.run(outbound_rx));

    peer.send(r#"{"op":10,"d":{"heartbeat_interval":41250}}"#);
    peer.recv().await;
    peer.send(r#"{"op":0,"t":"READY","d":{}}"#);

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_handshake());
    assert!(err.to_string().contains("no sequence"));
}

#[tokio::test]
async fn non_ready_after_identify_is_rejected() {
    let Harness {
        session,
        mut peer,
        outbound_rx,
        ..
    } = harness();
    let task = tokio::spawn(session.run(outbound_rx));

    peer.send(r#"{"op":10,"d":{"heartbeat_interval":41250}}"#);
    peer.recv().await;
    peer.send(r#"{"op":0,"s":1,"t":"GUILD_CREATE","d":{}}"#);

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_handshake());
    assert!(err.to_string().contains("expected READY"));
}

#[tokio::test]
async fn dial_failure_is_terminal() {
    let (_unused, peer) = support::mock_connection();
    let Harness {
        session,
        outbound_rx,
        metrics,
        ..
    } = harness_with(refusing_dialer(), peer);
    let phase = session.phase();

    let err = session.run(outbound_rx).await.unwrap_err();
    assert_eq!(err.class().as_str(), "TRANSPORT");
    assert_eq!(*phase.borrow(), SessionPhase::Closed);
    assert_eq!(metrics.sessions_ended.get(&[("reason", "dial_failed")]), 1);
    assert_eq!(metrics.connection_closes.total(), 0);
}

#[tokio::test]
async fn cancellation_during_handshake_aborts_startup() {
    let Harness {
        session,
        mut peer,
        outbound_rx,
        shutdown,
        ..
    } = harness();
    let task = tokio::spawn(session.run(outbound_rx));

    peer.send(r#"{"op":10,"d":{"heartbeat_interval":41250}}"#);
    peer.recv().await;
    shutdown.cancel();

    let err = task.await.unwrap().unwrap_err();
    assert!(err.is_handshake());
    assert_eq!(peer.close_count(), 1);
}
