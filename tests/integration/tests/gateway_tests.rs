//! Gateway engine integration tests
//!
//! Each test plays the server over the in-memory transport on a paused
//! clock, so heartbeat intervals and backoff delays elapse instantly.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use anyhow::Result;
use chat_gateway_client::protocol::{Command, GatewayMessage, OpCode, PresenceUpdatePayload, Status};
use chat_gateway_client::{
    ConnectionState, EventStream, Gateway, GatewayError, GatewayEvent, GatewayHandle, SubmitError,
};
use chat_common::GatewayConfig;
use integration_tests::*;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct Harness {
    server: MockServer,
    handle: GatewayHandle,
    events: EventStream,
    cancel: CancellationToken,
    run: JoinHandle<Result<(), GatewayError>>,
}

fn start(config: GatewayConfig) -> Harness {
    let (transport, server) = mock_transport();
    let (gateway, handle, events) = Gateway::new(config, transport);
    let cancel = CancellationToken::new();
    let run = tokio::spawn(gateway.run(cancel.clone()));
    Harness {
        server,
        handle,
        events,
        cancel,
        run,
    }
}

async fn next_event(events: &mut EventStream) -> Result<chat_gateway_client::DispatchEvent> {
    match tokio::time::timeout(RECV_TIMEOUT, events.next_event()).await {
        Ok(Some(event)) => Ok(event),
        Ok(None) => anyhow::bail!("Event stream ended"),
        Err(_) => anyhow::bail!("No event within {RECV_TIMEOUT:?}"),
    }
}

async fn finish(run: JoinHandle<Result<(), GatewayError>>) -> Result<Result<(), GatewayError>> {
    Ok(tokio::time::timeout(RECV_TIMEOUT, run).await??)
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_identify_then_events_in_order() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    assert_eq!(conn.url, versioned(GATEWAY_URL));

    let identify = identify_and_ready(&mut conn, QUIET_INTERVAL_MS).await?;
    assert_eq!(identify.token, TOKEN);
    assert_eq!(identify.shard.index(), 0);
    assert_eq!(identify.shard.count(), 1);

    let first = next_event(&mut h.events).await?;
    assert_eq!(first.sequence, 1);
    match &first.event {
        GatewayEvent::Ready(ready) => assert_eq!(ready.session_id, SESSION_ID),
        other => panic!("expected READY, got {}", other.name()),
    }

    conn.send(&typing(2));
    conn.send(&message_create(3, "hello"));
    conn.send(&typing(4));

    for expected in [2, 3, 4] {
        let event = next_event(&mut h.events).await?;
        assert_eq!(event.sequence, expected);
    }

    let session = h.handle.session();
    assert_eq!(session.session_id(), Some(SESSION_ID));
    assert_eq!(session.sequence(), Some(4));
    assert_eq!(session.resume_url(), Some(RESUME_URL));
    assert_eq!(h.handle.state(), ConnectionState::Connected);

    h.cancel.cancel();
    assert!(matches!(finish(h.run).await?, Err(GatewayError::Cancelled)));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stale_sequence_is_dropped() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    identify_and_ready(&mut conn, QUIET_INTERVAL_MS).await?;
    next_event(&mut h.events).await?;

    conn.send(&typing(2));
    conn.send(&typing(2));
    conn.send(&typing(1));
    conn.send(&message_create(3, "after the duplicates"));

    assert_eq!(next_event(&mut h.events).await?.sequence, 2);
    let event = next_event(&mut h.events).await?;
    assert_eq!(event.sequence, 3);
    assert!(matches!(event.event, GatewayEvent::MessageCreate(_)));
    assert!(h.events.try_next_event().is_none());
    assert_eq!(h.handle.session().sequence(), Some(3));

    h.cancel.cancel();
    let _ = finish(h.run).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_undecodable_frames_are_skipped() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    identify_and_ready(&mut conn, QUIET_INTERVAL_MS).await?;
    next_event(&mut h.events).await?;

    conn.send_raw("not json");
    conn.send_raw(r#"{"op":42,"d":null}"#);
    conn.send_raw(r#"{"op":0,"d":{}}"#);
    conn.send(&GatewayMessage::dispatch("SOMETHING_NEW", 2, serde_json::json!({"x": 1})));
    conn.send(&typing(3));

    let unknown = next_event(&mut h.events).await?;
    assert_eq!(unknown.sequence, 2);
    assert!(matches!(&unknown.event, GatewayEvent::Unknown { name, .. } if name == "SOMETHING_NEW"));
    assert_eq!(next_event(&mut h.events).await?.sequence, 3);
    assert_eq!(h.server.opened(), 1);

    h.cancel.cancel();
    let _ = finish(h.run).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_identify_after_failed_handshake_restarts_sequence() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    conn.send(&hello(QUIET_INTERVAL_MS));
    assert_eq!(conn.recv_command().await?.op, OpCode::Identify);

    // A dispatch arrives but READY never does
    conn.send(&message_create(5, "before ready"));
    assert_eq!(next_event(&mut h.events).await?.sequence, 5);
    assert_eq!(h.handle.session().sequence(), Some(5));
    assert_eq!(conn.expect_closed().await?, 4000);

    let mut conn = h.server.accept().await?;
    assert_eq!(conn.url, versioned(GATEWAY_URL));
    identify_and_ready(&mut conn, QUIET_INTERVAL_MS).await?;

    let ready = next_event(&mut h.events).await?;
    assert_eq!(ready.sequence, 1);
    assert!(matches!(ready.event, GatewayEvent::Ready(_)));
    assert!(h.handle.wait_for_state(ConnectionState::Connected).await);
    assert_eq!(h.handle.session().sequence(), Some(1));

    conn.send(&typing(2));
    assert_eq!(next_event(&mut h.events).await?.sequence, 2);
    assert_eq!(h.server.opened(), 2);

    h.cancel.cancel();
    let _ = finish(h.run).await?;
    Ok(())
}

// ============================================================================
// Heartbeat Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_zombie_connection_resumes() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    identify_and_ready(&mut conn, 10_000).await?;

    // Never acknowledged
    let beat = conn.recv_message().await?;
    assert_eq!(beat.op, OpCode::Heartbeat);
    assert_eq!(beat.as_heartbeat_seq(), Some(Some(1)));
    let sent_at = Instant::now();

    assert_eq!(conn.expect_closed().await?, 4000);
    let detected = sent_at.elapsed();
    assert!(detected >= Duration::from_secs(10), "{detected:?}");
    assert!(detected < Duration::from_secs(11), "{detected:?}");

    let mut conn = h.server.accept().await?;
    assert_eq!(conn.url, versioned(RESUME_URL));
    conn.send(&hello(10_000));
    let resume = conn.recv_command().await?;
    assert_eq!(resume.op, OpCode::Resume);
    let payload = resume.as_resume().unwrap();
    assert_eq!(payload.session_id, SESSION_ID);
    assert_eq!(payload.seq, 1);

    conn.send(&resumed(2));
    let ready = next_event(&mut h.events).await?;
    assert!(matches!(ready.event, GatewayEvent::Ready(_)));
    let event = next_event(&mut h.events).await?;
    assert!(matches!(event.event, GatewayEvent::Resumed));
    assert_eq!(event.sequence, 2);

    h.cancel.cancel();
    let _ = finish(h.run).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_server_requested_heartbeat_is_immediate() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    identify_and_ready(&mut conn, QUIET_INTERVAL_MS).await?;
    next_event(&mut h.events).await?;
    assert!(h.handle.wait_for_state(ConnectionState::Connected).await);

    let asked_at = Instant::now();
    conn.send(&GatewayMessage::heartbeat(None));

    let beat = conn.recv_message().await?;
    assert_eq!(beat.op, OpCode::Heartbeat);
    assert_eq!(beat.as_heartbeat_seq(), Some(Some(1)));
    assert!(asked_at.elapsed() < Duration::from_secs(1));

    h.cancel.cancel();
    let _ = finish(h.run).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_latency_is_measured() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    identify_and_ready(&mut conn, 10_000).await?;
    next_event(&mut h.events).await?;
    assert!(h.handle.latency().is_none());

    let beat = conn.recv_message().await?;
    assert_eq!(beat.op, OpCode::Heartbeat);
    tokio::time::advance(Duration::from_millis(50)).await;
    conn.send(&GatewayMessage::heartbeat_ack());

    // Anything after the ACK proves it was handled
    conn.send(&typing(2));
    next_event(&mut h.events).await?;
    assert_eq!(h.handle.latency(), Some(Duration::from_millis(50)));

    h.cancel.cancel();
    let _ = finish(h.run).await?;
    Ok(())
}

// ============================================================================
// Reconnect Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_transport_drop_resumes() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    identify_and_ready(&mut conn, QUIET_INTERVAL_MS).await?;
    conn.send(&typing(2));
    conn.send(&typing(3));
    for _ in 0..3 {
        next_event(&mut h.events).await?;
    }

    drop(conn);

    let mut conn = h.server.accept().await?;
    assert_eq!(conn.url, versioned(RESUME_URL));
    conn.send(&hello(QUIET_INTERVAL_MS));
    let resume = conn.recv_command().await?;
    assert_eq!(resume.op, OpCode::Resume);
    let payload = resume.as_resume().unwrap();
    assert_eq!(payload.token, TOKEN);
    assert_eq!(payload.session_id, SESSION_ID);
    assert_eq!(payload.seq, 3);

    conn.send(&resumed(4));
    conn.send(&typing(5));
    assert_eq!(next_event(&mut h.events).await?.sequence, 4);
    assert_eq!(next_event(&mut h.events).await?.sequence, 5);
    assert_eq!(h.server.opened(), 2);

    h.cancel.cancel();
    let _ = finish(h.run).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_server_reconnect_request_resumes() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    identify_and_ready(&mut conn, QUIET_INTERVAL_MS).await?;

    conn.send(&GatewayMessage::reconnect());
    assert_eq!(conn.expect_closed().await?, 4000);

    let mut conn = h.server.accept().await?;
    conn.send(&hello(QUIET_INTERVAL_MS));
    let resume = conn.recv_command().await?;
    assert_eq!(resume.op, OpCode::Resume);
    assert_eq!(h.handle.session().session_id(), Some(SESSION_ID));

    h.cancel.cancel();
    let _ = finish(h.run).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_resumable_invalid_session_resumes() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    identify_and_ready(&mut conn, QUIET_INTERVAL_MS).await?;

    conn.send(&GatewayMessage::invalid_session(true));
    assert_eq!(conn.expect_closed().await?, 4000);

    let mut conn = h.server.accept().await?;
    assert_eq!(conn.url, versioned(RESUME_URL));
    conn.send(&hello(QUIET_INTERVAL_MS));
    assert_eq!(conn.recv_command().await?.op, OpCode::Resume);

    h.cancel.cancel();
    let _ = finish(h.run).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_invalid_session_identifies_afresh() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    identify_and_ready(&mut conn, QUIET_INTERVAL_MS).await?;
    conn.send(&typing(2));

    conn.send(&GatewayMessage::invalid_session(false));
    assert_eq!(conn.expect_closed().await?, 1000);

    let mut conn = h.server.accept().await?;
    assert_eq!(conn.url, versioned(GATEWAY_URL));
    let session = h.handle.session();
    assert!(session.session_id().is_none());
    assert!(session.sequence().is_none());

    identify_and_ready(&mut conn, QUIET_INTERVAL_MS).await?;

    h.cancel.cancel();
    let _ = finish(h.run).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_missing_hello_retries() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    let opened_at = Instant::now();

    assert_eq!(conn.expect_closed().await?, 4000);
    assert!(opened_at.elapsed() >= Duration::from_secs(10));

    let mut conn = h.server.accept().await?;
    identify_and_ready(&mut conn, QUIET_INTERVAL_MS).await?;
    assert_eq!(next_event(&mut h.events).await?.sequence, 1);

    h.cancel.cancel();
    let _ = finish(h.run).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_handshake_must_start_with_hello() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;

    conn.send(&GatewayMessage::heartbeat_ack());
    assert_eq!(conn.expect_closed().await?, 4000);
    assert!(h.server.accept().await.is_ok());

    h.cancel.cancel();
    let _ = finish(h.run).await?;
    Ok(())
}

// ============================================================================
// Terminal Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_cancel_closes_and_stops() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    identify_and_ready(&mut conn, QUIET_INTERVAL_MS).await?;
    assert!(h.handle.wait_for_state(ConnectionState::Connected).await);

    h.cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(1), h.run).await??;
    assert!(matches!(result, Err(GatewayError::Cancelled)));
    assert_eq!(conn.expect_closed().await?, 1000);

    assert_eq!(h.server.opened(), 1);
    assert_eq!(h.handle.state(), ConnectionState::Terminated);
    assert_eq!(
        h.handle.try_submit(PresenceUpdatePayload::new(Status::Idle)),
        Err(SubmitError::NotConnected)
    );

    // Queued events drain, then the stream ends
    assert!(h.events.next_event().await.is_some());
    assert!(h.events.next_event().await.is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_authentication_failure_is_fatal() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    conn.send(&hello(QUIET_INTERVAL_MS));
    assert_eq!(conn.recv_command().await?.op, OpCode::Identify);

    conn.close(4004);
    let result = finish(h.run).await?;
    assert!(matches!(result, Err(GatewayError::AuthenticationFailed)));
    assert_eq!(h.server.opened(), 1);
    assert_eq!(h.handle.state(), ConnectionState::Terminated);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_unusable_gateway_url_is_fatal() -> Result<()> {
    let mut config = test_config();
    config.gateway_url = "gateway.test".to_string();
    let h = start(config);

    let result = finish(h.run).await?;
    assert!(matches!(result, Err(GatewayError::InvalidUrl { url, .. }) if url == "gateway.test"));
    assert_eq!(h.server.opened(), 0);
    assert_eq!(h.handle.state(), ConnectionState::Terminated);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_disallowed_intents_is_fatal() -> Result<()> {
    let mut h = start(test_config());
    let mut conn = h.server.accept().await?;
    identify_and_ready(&mut conn, QUIET_INTERVAL_MS).await?;

    conn.close(4014);
    let result = finish(h.run).await?;
    assert!(matches!(
        result,
        Err(GatewayError::FatalClose(code)) if code.as_u16() == 4014
    ));
    assert_eq!(h.server.opened(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_retries_exhausted() -> Result<()> {
    let mut config = test_config();
    config.max_attempts = Some(3);
    let h = start(config);
    h.server.refuse_connections(true);

    let result = finish(h.run).await?;
    match result {
        Err(GatewayError::RetriesExhausted { attempts, last_failure }) => {
            assert_eq!(attempts, 3);
            assert!(last_failure.contains("connection refused"), "{last_failure}");
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(h.server.opened(), 3);
    Ok(())
}

// ============================================================================
// Command Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_commands_queue_while_disconnected() -> Result<()> {
    let mut config = test_config();
    config.queues.command_capacity = 2;
    let (transport, mut server) = mock_transport();
    let (gateway, handle, _events) = Gateway::new(config, transport);

    handle.try_submit(PresenceUpdatePayload::new(Status::Idle))?;
    handle.try_submit(PresenceUpdatePayload::new(Status::Dnd))?;
    assert_eq!(
        handle.try_submit(PresenceUpdatePayload::new(Status::Online)),
        Err(SubmitError::QueueFull)
    );

    let cancel = CancellationToken::new();
    let run = tokio::spawn(gateway.run(cancel.clone()));
    let mut conn = server.accept().await?;
    identify_and_ready(&mut conn, QUIET_INTERVAL_MS).await?;

    for expected in [Status::Idle, Status::Dnd] {
        let message = conn.recv_command().await?;
        assert_eq!(message.op, OpCode::PresenceUpdate);
        assert_eq!(message, Command::from(PresenceUpdatePayload::new(expected)).to_message()?);
    }

    handle.submit(PresenceUpdatePayload::new(Status::Online)).await?;
    let message = conn.recv_command().await?;
    assert_eq!(message, Command::from(PresenceUpdatePayload::new(Status::Online)).to_message()?);

    cancel.cancel();
    let _ = finish(run).await?;
    Ok(())
}
