//! Gateway events
//!
//! Typed dispatch events received from the gateway.

mod event;
mod event_types;
mod payloads;

pub use event::{DispatchEvent, GatewayEvent};
pub use event_types::{decode_event, EventDecoder, GatewayEventType};
pub use payloads::{
    AttachmentPayload, ChannelEvent, ChannelPayload, EmojiPayload, GuildCreateEvent,
    GuildDeleteEvent, GuildEvent, GuildMemberAddEvent, GuildMemberRemoveEvent,
    GuildMemberUpdateEvent, GuildMembersChunkEvent, MemberPayload, MessageCreateEvent,
    MessageDeleteEvent, MessageEvent, MessageReactionEvent, MessageReferencePayload,
    PresenceEvent, ReactionPayload, ReadyEvent, RolePayload, TypingStartEvent, UnavailableGuild,
    UserEvent, UserIdPayload, UserPayload, VoiceServerUpdateEvent, VoiceStateEvent,
};
