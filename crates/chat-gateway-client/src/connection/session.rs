//! Session state
//!
//! Identity of the current logical session. Survives reconnects until the
//! supervisor discards it; never survives the process.

use chat_model::ShardId;
use parking_lot::Mutex;
use std::sync::Arc;

/// Session state shared between the supervisor and the connection tasks
pub type SharedSession = Arc<Mutex<SessionState>>;

/// Outcome of recording an inbound sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceUpdate {
    /// The sequence moved forward
    Advanced,
    /// Lower than or equal to the current sequence; nothing changed
    Stale { current: u64 },
}

/// Identity of the current logical session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    session_id: Option<String>,
    sequence: Option<u64>,
    resume_url: Option<String>,
    shard: ShardId,
}

impl SessionState {
    /// Create an empty session for a shard
    #[must_use]
    pub fn new(shard: ShardId) -> Self {
        Self {
            session_id: None,
            sequence: None,
            resume_url: None,
            shard,
        }
    }

    /// Wrap in the shared handle used by the engine
    #[must_use]
    pub fn shared(shard: ShardId) -> SharedSession {
        Arc::new(Mutex::new(Self::new(shard)))
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    pub fn resume_url(&self) -> Option<&str> {
        self.resume_url.as_deref()
    }

    pub fn shard(&self) -> ShardId {
        self.shard
    }

    /// A session ID exists, so the next attempt sends Resume
    pub fn is_resumable(&self) -> bool {
        self.session_id.is_some()
    }

    /// Record the sequence of an inbound dispatch
    ///
    /// Sequences only move forward; anything at or below the current value is
    /// rejected and leaves the state untouched.
    pub fn record_sequence(&mut self, sequence: u64) -> SequenceUpdate {
        match self.sequence {
            Some(current) if sequence <= current => SequenceUpdate::Stale { current },
            _ => {
                self.sequence = Some(sequence);
                SequenceUpdate::Advanced
            }
        }
    }

    /// Confirm the session after READY or RESUMED
    ///
    /// `resume_url` is only replaced when the server supplies one.
    pub fn confirm(&mut self, session_id: impl Into<String>, resume_url: Option<String>) {
        self.session_id = Some(session_id.into());
        if resume_url.is_some() {
            self.resume_url = resume_url;
        }
    }

    /// Forget the session so the next attempt identifies afresh
    pub fn discard(&mut self) {
        self.session_id = None;
        self.sequence = None;
        self.resume_url = None;
    }

    /// `(session_id, seq)` for a Resume; a session with no dispatch yet resumes from 0
    pub fn resume_info(&self) -> Option<(String, u64)> {
        self.session_id
            .as_ref()
            .map(|id| (id.clone(), self.sequence.unwrap_or(0)))
    }
}
