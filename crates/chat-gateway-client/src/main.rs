//! Gateway client entry point
//!
//! Run with:
//! ```bash
//! CHAT_TOKEN=... cargo run -p chat-gateway-client
//! ```
//!
//! Connects one shard, logs every dispatch event and stops on Ctrl-C.
//! Configuration is loaded from environment variables.

use anyhow::Context;
use chat_common::{try_init_tracing_with_config, GatewayConfig, TracingConfig};
use chat_gateway_client::{EventStream, Gateway, GatewayEvent, TungsteniteTransport};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "Gateway client failed");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env().context("Failed to load configuration")?;

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        env = ?config.app.env,
        shard = %config.shard,
        intents = config.intents.bits(),
        "Configuration loaded"
    );

    let (gateway, _handle, events) = Gateway::new(config, TungsteniteTransport::new());
    let cancel = CancellationToken::new();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown signal received"),
                Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
            }
            cancel.cancel();
        }
    });

    let logger = tokio::spawn(log_events(events));

    let result = gateway.run(cancel).await;
    logger.await.context("Event logger panicked")?;

    match result {
        Err(e) if !e.is_cancelled() => Err(e.into()),
        _ => Ok(()),
    }
}

async fn log_events(mut events: EventStream) {
    while let Some(dispatch) = events.next_event().await {
        match &dispatch.event {
            GatewayEvent::Ready(ready) => info!(
                shard = %dispatch.shard,
                user = %ready.user.username,
                guilds = ready.guilds.len(),
                "Ready"
            ),
            GatewayEvent::MessageCreate(message) => info!(
                shard = %dispatch.shard,
                seq = dispatch.sequence,
                channel_id = %message.channel_id,
                author = %message.author.username,
                "Message: {}",
                message.content
            ),
            GatewayEvent::Unknown { name, .. } => info!(
                shard = %dispatch.shard,
                seq = dispatch.sequence,
                event = %name,
                "Unhandled event"
            ),
            event => info!(
                shard = %dispatch.shard,
                seq = dispatch.sequence,
                event = event.name(),
                "Event"
            ),
        }
    }
}
