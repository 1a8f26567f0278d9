//! Gateway event types
//!
//! Every dispatch event name this client decodes, and the static table
//! mapping each name to its decoder.

use super::GatewayEvent;
use serde_json::Value;
use std::fmt;

/// Decodes the `d` of one dispatch event
pub type EventDecoder = fn(Value) -> Result<GatewayEvent, serde_json::Error>;

/// Gateway event types
///
/// These are the event names sent in the `t` field of dispatch messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    // Connection events
    /// Sent after successful Identify
    Ready,
    /// Sent after successful Resume
    Resumed,

    // Guild events
    GuildCreate,
    GuildUpdate,
    GuildDelete,

    // Channel events
    ChannelCreate,
    ChannelUpdate,
    ChannelDelete,

    // Message events
    MessageCreate,
    MessageUpdate,
    MessageDelete,

    // Reaction events
    MessageReactionAdd,
    MessageReactionRemove,

    // Member events
    GuildMemberAdd,
    GuildMemberUpdate,
    GuildMemberRemove,
    /// Response page to Request Guild Members
    GuildMembersChunk,

    // Presence events
    PresenceUpdate,
    TypingStart,

    // User events
    UserUpdate,

    // Voice events
    VoiceStateUpdate,
    VoiceServerUpdate,
}

impl GatewayEventType {
    /// Every known event type
    pub const ALL: [Self; 22] = [
        Self::Ready,
        Self::Resumed,
        Self::GuildCreate,
        Self::GuildUpdate,
        Self::GuildDelete,
        Self::ChannelCreate,
        Self::ChannelUpdate,
        Self::ChannelDelete,
        Self::MessageCreate,
        Self::MessageUpdate,
        Self::MessageDelete,
        Self::MessageReactionAdd,
        Self::MessageReactionRemove,
        Self::GuildMemberAdd,
        Self::GuildMemberUpdate,
        Self::GuildMemberRemove,
        Self::GuildMembersChunk,
        Self::PresenceUpdate,
        Self::TypingStart,
        Self::UserUpdate,
        Self::VoiceStateUpdate,
        Self::VoiceServerUpdate,
    ];

    /// Get the wire name of the event type
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Resumed => "RESUMED",
            Self::GuildCreate => "GUILD_CREATE",
            Self::GuildUpdate => "GUILD_UPDATE",
            Self::GuildDelete => "GUILD_DELETE",
            Self::ChannelCreate => "CHANNEL_CREATE",
            Self::ChannelUpdate => "CHANNEL_UPDATE",
            Self::ChannelDelete => "CHANNEL_DELETE",
            Self::MessageCreate => "MESSAGE_CREATE",
            Self::MessageUpdate => "MESSAGE_UPDATE",
            Self::MessageDelete => "MESSAGE_DELETE",
            Self::MessageReactionAdd => "MESSAGE_REACTION_ADD",
            Self::MessageReactionRemove => "MESSAGE_REACTION_REMOVE",
            Self::GuildMemberAdd => "GUILD_MEMBER_ADD",
            Self::GuildMemberUpdate => "GUILD_MEMBER_UPDATE",
            Self::GuildMemberRemove => "GUILD_MEMBER_REMOVE",
            Self::GuildMembersChunk => "GUILD_MEMBERS_CHUNK",
            Self::PresenceUpdate => "PRESENCE_UPDATE",
            Self::TypingStart => "TYPING_START",
            Self::UserUpdate => "USER_UPDATE",
            Self::VoiceStateUpdate => "VOICE_STATE_UPDATE",
            Self::VoiceServerUpdate => "VOICE_SERVER_UPDATE",
        }
    }

    /// Look up an event type by its wire name
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "READY" => Some(Self::Ready),
            "RESUMED" => Some(Self::Resumed),
            "GUILD_CREATE" => Some(Self::GuildCreate),
            "GUILD_UPDATE" => Some(Self::GuildUpdate),
            "GUILD_DELETE" => Some(Self::GuildDelete),
            "CHANNEL_CREATE" => Some(Self::ChannelCreate),
            "CHANNEL_UPDATE" => Some(Self::ChannelUpdate),
            "CHANNEL_DELETE" => Some(Self::ChannelDelete),
            "MESSAGE_CREATE" => Some(Self::MessageCreate),
            "MESSAGE_UPDATE" => Some(Self::MessageUpdate),
            "MESSAGE_DELETE" => Some(Self::MessageDelete),
            "MESSAGE_REACTION_ADD" => Some(Self::MessageReactionAdd),
            "MESSAGE_REACTION_REMOVE" => Some(Self::MessageReactionRemove),
            "GUILD_MEMBER_ADD" => Some(Self::GuildMemberAdd),
            "GUILD_MEMBER_UPDATE" => Some(Self::GuildMemberUpdate),
            "GUILD_MEMBER_REMOVE" => Some(Self::GuildMemberRemove),
            "GUILD_MEMBERS_CHUNK" => Some(Self::GuildMembersChunk),
            "PRESENCE_UPDATE" => Some(Self::PresenceUpdate),
            "TYPING_START" => Some(Self::TypingStart),
            "USER_UPDATE" => Some(Self::UserUpdate),
            "VOICE_STATE_UPDATE" => Some(Self::VoiceStateUpdate),
            "VOICE_SERVER_UPDATE" => Some(Self::VoiceServerUpdate),
            _ => None,
        }
    }

    /// Decoder for this event's payload
    #[must_use]
    pub fn decoder(self) -> EventDecoder {
        match self {
            Self::Ready => |d| serde_json::from_value(d).map(GatewayEvent::Ready),
            // RESUMED carries nothing the client uses
            Self::Resumed => |_| Ok(GatewayEvent::Resumed),
            Self::GuildCreate => |d| serde_json::from_value(d).map(GatewayEvent::GuildCreate),
            Self::GuildUpdate => |d| serde_json::from_value(d).map(GatewayEvent::GuildUpdate),
            Self::GuildDelete => |d| serde_json::from_value(d).map(GatewayEvent::GuildDelete),
            Self::ChannelCreate => |d| serde_json::from_value(d).map(GatewayEvent::ChannelCreate),
            Self::ChannelUpdate => |d| serde_json::from_value(d).map(GatewayEvent::ChannelUpdate),
            Self::ChannelDelete => |d| serde_json::from_value(d).map(GatewayEvent::ChannelDelete),
            Self::MessageCreate => |d| serde_json::from_value(d).map(GatewayEvent::MessageCreate),
            Self::MessageUpdate => |d| serde_json::from_value(d).map(GatewayEvent::MessageUpdate),
            Self::MessageDelete => |d| serde_json::from_value(d).map(GatewayEvent::MessageDelete),
            Self::MessageReactionAdd => {
                |d| serde_json::from_value(d).map(GatewayEvent::MessageReactionAdd)
            }
            Self::MessageReactionRemove => {
                |d| serde_json::from_value(d).map(GatewayEvent::MessageReactionRemove)
            }
            Self::GuildMemberAdd => |d| serde_json::from_value(d).map(GatewayEvent::GuildMemberAdd),
            Self::GuildMemberUpdate => {
                |d| serde_json::from_value(d).map(GatewayEvent::GuildMemberUpdate)
            }
            Self::GuildMemberRemove => {
                |d| serde_json::from_value(d).map(GatewayEvent::GuildMemberRemove)
            }
            Self::GuildMembersChunk => {
                |d| serde_json::from_value(d).map(GatewayEvent::GuildMembersChunk)
            }
            Self::PresenceUpdate => |d| serde_json::from_value(d).map(GatewayEvent::PresenceUpdate),
            Self::TypingStart => |d| serde_json::from_value(d).map(GatewayEvent::TypingStart),
            Self::UserUpdate => |d| serde_json::from_value(d).map(GatewayEvent::UserUpdate),
            Self::VoiceStateUpdate => {
                |d| serde_json::from_value(d).map(GatewayEvent::VoiceStateUpdate)
            }
            Self::VoiceServerUpdate => {
                |d| serde_json::from_value(d).map(GatewayEvent::VoiceServerUpdate)
            }
        }
    }
}

/// Decode a dispatch payload by event name
///
/// Names outside the table decode to [`GatewayEvent::Unknown`] so new server
/// events never break the client.
pub fn decode_event(name: &str, data: Value) -> Result<GatewayEvent, serde_json::Error> {
    match GatewayEventType::from_name(name) {
        Some(kind) => (kind.decoder())(data),
        None => Ok(GatewayEvent::Unknown {
            name: name.to_string(),
            data,
        }),
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<GatewayEventType> for String {
    fn from(event: GatewayEventType) -> Self {
        event.as_str().to_string()
    }
}
