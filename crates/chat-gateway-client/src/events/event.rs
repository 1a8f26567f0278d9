//! Decoded dispatch events

use super::payloads::{
    ChannelEvent, GuildCreateEvent, GuildDeleteEvent, GuildEvent, GuildMemberAddEvent,
    GuildMemberRemoveEvent, GuildMemberUpdateEvent, GuildMembersChunkEvent, MessageCreateEvent,
    MessageDeleteEvent, MessageEvent, MessageReactionEvent, PresenceEvent, ReadyEvent,
    TypingStartEvent, UserEvent, VoiceServerUpdateEvent, VoiceStateEvent,
};
use super::GatewayEventType;
use chat_model::ShardId;
use serde_json::Value;

/// A typed dispatch event
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready(Box<ReadyEvent>),
    Resumed,
    GuildCreate(Box<GuildCreateEvent>),
    GuildUpdate(GuildEvent),
    GuildDelete(GuildDeleteEvent),
    ChannelCreate(ChannelEvent),
    ChannelUpdate(ChannelEvent),
    ChannelDelete(ChannelEvent),
    MessageCreate(Box<MessageCreateEvent>),
    MessageUpdate(MessageEvent),
    MessageDelete(MessageDeleteEvent),
    MessageReactionAdd(MessageReactionEvent),
    MessageReactionRemove(MessageReactionEvent),
    GuildMemberAdd(GuildMemberAddEvent),
    GuildMemberUpdate(GuildMemberUpdateEvent),
    GuildMemberRemove(GuildMemberRemoveEvent),
    GuildMembersChunk(GuildMembersChunkEvent),
    PresenceUpdate(PresenceEvent),
    TypingStart(TypingStartEvent),
    UserUpdate(UserEvent),
    VoiceStateUpdate(VoiceStateEvent),
    VoiceServerUpdate(VoiceServerUpdateEvent),
    /// An event name this client has no decoder for
    Unknown { name: String, data: Value },
}

impl GatewayEvent {
    /// Event type, or `None` for [`GatewayEvent::Unknown`]
    #[must_use]
    pub fn kind(&self) -> Option<GatewayEventType> {
        let kind = match self {
            Self::Ready(_) => GatewayEventType::Ready,
            Self::Resumed => GatewayEventType::Resumed,
            Self::GuildCreate(_) => GatewayEventType::GuildCreate,
            Self::GuildUpdate(_) => GatewayEventType::GuildUpdate,
            Self::GuildDelete(_) => GatewayEventType::GuildDelete,
            Self::ChannelCreate(_) => GatewayEventType::ChannelCreate,
            Self::ChannelUpdate(_) => GatewayEventType::ChannelUpdate,
            Self::ChannelDelete(_) => GatewayEventType::ChannelDelete,
            Self::MessageCreate(_) => GatewayEventType::MessageCreate,
            Self::MessageUpdate(_) => GatewayEventType::MessageUpdate,
            Self::MessageDelete(_) => GatewayEventType::MessageDelete,
            Self::MessageReactionAdd(_) => GatewayEventType::MessageReactionAdd,
            Self::MessageReactionRemove(_) => GatewayEventType::MessageReactionRemove,
            Self::GuildMemberAdd(_) => GatewayEventType::GuildMemberAdd,
            Self::GuildMemberUpdate(_) => GatewayEventType::GuildMemberUpdate,
            Self::GuildMemberRemove(_) => GatewayEventType::GuildMemberRemove,
            Self::GuildMembersChunk(_) => GatewayEventType::GuildMembersChunk,
            Self::PresenceUpdate(_) => GatewayEventType::PresenceUpdate,
            Self::TypingStart(_) => GatewayEventType::TypingStart,
            Self::UserUpdate(_) => GatewayEventType::UserUpdate,
            Self::VoiceStateUpdate(_) => GatewayEventType::VoiceStateUpdate,
            Self::VoiceServerUpdate(_) => GatewayEventType::VoiceServerUpdate,
            Self::Unknown { .. } => return None,
        };
        Some(kind)
    }

    /// Wire name of the event
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Unknown { name, .. } => name,
            known => known.kind().map_or("UNKNOWN", GatewayEventType::as_str),
        }
    }
}

/// An event handed to the application
#[derive(Debug, Clone)]
pub struct DispatchEvent {
    /// Shard that received the event
    pub shard: ShardId,
    /// Sequence number of the carrying envelope
    pub sequence: u64,
    pub event: GatewayEvent,
}

impl DispatchEvent {
    #[must_use]
    pub fn new(shard: ShardId, sequence: u64, event: GatewayEvent) -> Self {
        Self {
            shard,
            sequence,
            event,
        }
    }

    /// Wire name of the wrapped event
    #[must_use]
    pub fn name(&self) -> &str {
        self.event.name()
    }
}
