//! Event payload definitions
//!
//! Data carried in the `d` field of dispatch envelopes. Unknown fields are
//! ignored so newer server payloads keep decoding.

use chat_model::{ShardId, Snowflake};
use serde::{Deserialize, Serialize};

// === Connection Events ===

/// READY event payload
///
/// Sent after successful Identify.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyEvent {
    /// Gateway protocol version
    pub v: u8,

    /// Current user
    pub user: UserPayload,

    /// Guilds the user is in (initially unavailable)
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,

    /// Session ID for resuming
    pub session_id: String,

    /// Gateway URL for resuming
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_gateway_url: Option<String>,

    /// Shard the session was identified with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard: Option<ShardId>,
}

/// Unavailable guild in READY event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableGuild {
    pub id: Snowflake,
    #[serde(default)]
    pub unavailable: bool,
}

// === User Payload ===

/// User data included in events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPayload {
    pub id: Snowflake,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// Partial user with just ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdPayload {
    pub id: Snowflake,
}

// === Guild Events ===

/// GUILD_CREATE event payload
///
/// Sent for each guild on connect, or when joining a new guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildCreateEvent {
    pub id: Snowflake,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner_id: Snowflake,
    #[serde(default)]
    pub channels: Vec<ChannelPayload>,
    #[serde(default)]
    pub roles: Vec<RolePayload>,
    #[serde(default)]
    pub members: Vec<MemberPayload>,
    #[serde(default)]
    pub member_count: u64,
    #[serde(default)]
    pub large: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<String>,
}

/// GUILD_UPDATE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildEvent {
    pub id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Snowflake>,
}

/// GUILD_DELETE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildDeleteEvent {
    pub id: Snowflake,
    /// If true, this is a temporary outage; if false, the user left/was kicked/guild was deleted
    #[serde(default)]
    pub unavailable: bool,
}

// === Channel Events ===

/// Channel data included in GUILD_CREATE
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelPayload {
    pub id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub channel_type: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
}

/// CHANNEL_CREATE/CHANNEL_UPDATE/CHANNEL_DELETE event payload
pub type ChannelEvent = ChannelPayload;

/// Role data included in events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePayload {
    pub id: Snowflake,
    pub name: String,
    pub permissions: String,
    pub position: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
}

// === Message Events ===

/// MESSAGE_CREATE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCreateEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub author: UserPayload,
    /// Empty unless the MESSAGE_CONTENT intent is granted
    #[serde(default)]
    pub content: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentPayload>,
    #[serde(default)]
    pub reactions: Vec<ReactionPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_reference: Option<MessageReferencePayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_message: Option<Box<MessageCreateEvent>>,
}

/// MESSAGE_UPDATE event payload (partial update)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_timestamp: Option<String>,
}

/// MESSAGE_DELETE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeleteEvent {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}

/// Attachment data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentPayload {
    pub id: Snowflake,
    pub filename: String,
    pub size: u64,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Emoji as it appears in reactions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiPayload {
    /// `None` for unicode emoji
    #[serde(default)]
    pub id: Option<Snowflake>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Reaction data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionPayload {
    pub emoji: EmojiPayload,
    pub count: u32,
}

/// Message reference for replies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReferencePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
}

// === Reaction Events ===

/// MESSAGE_REACTION_ADD/REMOVE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReactionEvent {
    pub user_id: Snowflake,
    pub channel_id: Snowflake,
    pub message_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub emoji: EmojiPayload,
}

// === Member Events ===

/// Member data included in events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserPayload>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<String>,
}

/// GUILD_MEMBER_ADD event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMemberAddEvent {
    pub guild_id: Snowflake,
    #[serde(flatten)]
    pub member: MemberPayload,
}

/// GUILD_MEMBER_UPDATE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMemberUpdateEvent {
    pub guild_id: Snowflake,
    pub user: UserPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
}

/// GUILD_MEMBER_REMOVE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMemberRemoveEvent {
    pub guild_id: Snowflake,
    pub user: UserPayload,
}

/// GUILD_MEMBERS_CHUNK event payload
///
/// One response page to a Request Guild Members command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMembersChunkEvent {
    pub guild_id: Snowflake,
    #[serde(default)]
    pub members: Vec<MemberPayload>,
    pub chunk_index: u32,
    pub chunk_count: u32,
    /// IDs that were requested but not found
    #[serde(default)]
    pub not_found: Vec<Snowflake>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

// === Presence Events ===

/// PRESENCE_UPDATE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceEvent {
    pub user: UserIdPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub status: String,
}

/// TYPING_START event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingStartEvent {
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    /// Unix timestamp in seconds
    pub timestamp: u64,
}

// === User Events ===

/// USER_UPDATE event payload
pub type UserEvent = UserPayload;

// === Voice Events ===

/// VOICE_STATE_UPDATE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceStateEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<Snowflake>,
    pub channel_id: Option<Snowflake>,
    pub user_id: Snowflake,
    pub session_id: String,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
}

/// VOICE_SERVER_UPDATE event payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceServerUpdateEvent {
    pub token: String,
    pub guild_id: Snowflake,
    /// `None` while the voice server is being reallocated
    pub endpoint: Option<String>,
}
