//! Connection lifecycle states

use std::fmt;

/// Supervisor state, observable through the gateway handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No transport; waiting to (re)connect
    #[default]
    Disconnected,
    /// Opening the transport
    Connecting,
    /// Transport open, waiting for Hello
    AwaitingHello,
    /// Identify or Resume sent, waiting for READY or RESUMED
    Authenticating,
    /// Session live; heartbeat, receive and send loops running
    Connected,
    /// Tearing the connection down
    Disconnecting,
    /// No further attempts will be made
    Terminated,
}

impl ConnectionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingHello => "awaiting_hello",
            Self::Authenticating => "authenticating",
            Self::Connected => "connected",
            Self::Disconnecting => "disconnecting",
            Self::Terminated => "terminated",
        }
    }

    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    #[must_use]
    pub const fn is_terminated(self) -> bool {
        matches!(self, Self::Terminated)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
