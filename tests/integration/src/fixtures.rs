//! Test fixtures and data generators
//!
//! Provides the server-side envelopes and engine configuration the
//! integration tests share.

use std::time::Duration;

use anyhow::{ensure, Result};
use chat_common::{BackoffConfig, GatewayConfig};
use chat_gateway_client::protocol::{GatewayMessage, IdentifyPayload, OpCode};
use serde_json::json;

use crate::helpers::MockConnection;

pub const TOKEN: &str = "test-token";
pub const GATEWAY_URL: &str = "wss://gateway.test";
pub const RESUME_URL: &str = "wss://resume.test";
pub const SESSION_ID: &str = "session-1";

/// Heartbeat interval long enough to stay out of a test's way
pub const QUIET_INTERVAL_MS: u64 = 45_000;

/// Engine configuration with deterministic backoff
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::new(TOKEN).with_gateway_url(GATEWAY_URL);
    config.backoff = BackoffConfig {
        initial: Duration::from_secs(1),
        max: Duration::from_secs(8),
        multiplier: 2.0,
        jitter: 0.0,
    };
    config
}

/// Expected URL for a gateway base
pub fn versioned(base: &str) -> String {
    format!("{base}/?v=10&encoding=json")
}

pub fn hello(interval_ms: u64) -> GatewayMessage {
    GatewayMessage::hello(interval_ms)
}

pub fn ready(seq: u64) -> GatewayMessage {
    GatewayMessage::dispatch(
        "READY",
        seq,
        json!({
            "v": 10,
            "user": {"id": "100", "username": "tester", "bot": true},
            "guilds": [{"id": "200", "unavailable": true}],
            "session_id": SESSION_ID,
            "resume_gateway_url": RESUME_URL,
            "shard": [0, 1]
        }),
    )
}

pub fn resumed(seq: u64) -> GatewayMessage {
    GatewayMessage::dispatch("RESUMED", seq, json!({}))
}

pub fn typing(seq: u64) -> GatewayMessage {
    GatewayMessage::dispatch(
        "TYPING_START",
        seq,
        json!({"channel_id": "300", "user_id": "100", "timestamp": 1_700_000_000}),
    )
}

pub fn message_create(seq: u64, content: &str) -> GatewayMessage {
    GatewayMessage::dispatch(
        "MESSAGE_CREATE",
        seq,
        json!({
            "id": "400",
            "channel_id": "300",
            "author": {"id": "100", "username": "tester"},
            "content": content,
            "timestamp": "2024-01-01T00:00:00Z"
        }),
    )
}

/// Play Hello, expect Identify, answer READY at sequence 1
pub async fn identify_and_ready(conn: &mut MockConnection, interval_ms: u64) -> Result<IdentifyPayload> {
    conn.send(&hello(interval_ms));
    let message = conn.recv_command().await?;
    ensure!(message.op == OpCode::Identify, "expected Identify, got {message}");
    let identify = message
        .as_identify()
        .ok_or_else(|| anyhow::anyhow!("Identify without a payload"))?;
    conn.send(&ready(1));
    Ok(identify)
}
