//! Heartbeat timer and liveness tracking
//!
//! The timer fires at the interval announced by Hello. Each firing checks the
//! liveness flag left by the previous heartbeat: still pending means the
//! server never acknowledged it and the connection is a zombie.

use super::{Disconnect, SharedSession};
use crate::protocol::GatewayMessage;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Liveness flag and latency measurement, shared across connections
#[derive(Debug, Default)]
pub struct HeartbeatMonitor {
    pending: AtomicBool,
    last_sent: Mutex<Option<Instant>>,
    latency: Mutex<Option<Duration>>,
    requested: Notify,
}

impl HeartbeatMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-connection state before a new connection starts beating
    pub fn reset(&self) {
        self.pending.store(false, Ordering::SeqCst);
        *self.last_sent.lock() = None;
    }

    /// Timer firing: returns `false` if the previous heartbeat is still unacknowledged
    fn beat(&self) -> bool {
        if self.pending.swap(true, Ordering::SeqCst) {
            return false;
        }
        *self.last_sent.lock() = Some(Instant::now());
        true
    }

    /// A heartbeat sent on server request
    ///
    /// The liveness flag stays with the timer. The send time is only recorded
    /// when no timer beat is awaiting its ACK, so that ACK still measures from
    /// the timer beat.
    fn record_requested(&self) {
        let mut last_sent = self.last_sent.lock();
        if !self.pending.load(Ordering::SeqCst) {
            *last_sent = Some(Instant::now());
        }
    }

    /// Heartbeat ACK received; returns the measured round trip
    pub fn acknowledge(&self) -> Option<Duration> {
        self.pending.store(false, Ordering::SeqCst);
        let sent = self.last_sent.lock().take()?;
        let latency = sent.elapsed();
        *self.latency.lock() = Some(latency);
        Some(latency)
    }

    /// Ask the timer to send a heartbeat now
    pub fn request(&self) {
        self.requested.notify_one();
    }

    /// A heartbeat is awaiting its ACK
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Most recent heartbeat round trip
    pub fn latency(&self) -> Option<Duration> {
        *self.latency.lock()
    }
}

/// The heartbeat timer for one `Connected` period
pub struct HeartbeatTask {
    pub interval: Duration,
    pub monitor: Arc<HeartbeatMonitor>,
    pub session: SharedSession,
    /// Priority lane into the send loop
    pub outbound: mpsc::Sender<GatewayMessage>,
    pub cancel: CancellationToken,
}

impl HeartbeatTask {
    pub async fn run(self) -> Disconnect {
        // Jitter the first beat so shards started together spread out
        let first = self.interval.mul_f64(rand::random::<f64>());
        let mut ticker = tokio::time::interval_at(Instant::now() + first, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(
            interval_ms = self.interval.as_millis() as u64,
            first_ms = first.as_millis() as u64,
            "Heartbeat timer started"
        );

        loop {
            let requested = tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Disconnect::Cancelled,
                () = self.monitor.requested.notified() => true,
                _ = ticker.tick() => false,
            };

            if requested {
                self.monitor.record_requested();
            } else if !self.monitor.beat() {
                tracing::warn!(
                    interval_ms = self.interval.as_millis() as u64,
                    "Heartbeat not acknowledged, connection is a zombie"
                );
                return Disconnect::Zombied;
            }

            let seq = self.session.lock().sequence();
            tracing::trace!(seq = ?seq, requested, "Sending heartbeat");

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return Disconnect::Cancelled,
                sent = self.outbound.send(GatewayMessage::heartbeat(seq)) => {
                    if sent.is_err() {
                        // The send loop is gone and reports its own reason
                        return Disconnect::Cancelled;
                    }
                }
            }
        }
    }
}
