use serde_json::Value;

use crate::common::types::{ChannelId, GuildId, UserId};

/// One observed voice transition for a participant.
///
/// `previous`/`current` are `None` when the participant is outside any voice
/// channel on that side of the transition. An empty-string channel never
/// occurs; absence is the only "no channel" encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceEvent {
    pub user: UserId,
    pub previous: Option<ChannelId>,
    pub current: Option<ChannelId>,
}

/// The fields of a `VOICE_STATE_UPDATE` dispatch the tracker cares about.
/// Discord only sends the *new* state; the previous channel is derived from
/// the gateway's voice-state cache.
#[derive(Debug, Clone)]
pub struct VoiceState {
    pub guild_id: Option<GuildId>,
    pub channel_id: Option<ChannelId>,
    pub user_id: UserId,
}

impl VoiceState {
    /// Decodes a dispatch `d` payload. Snowflakes arrive as decimal strings;
    /// `channel_id` is JSON `null` when the user disconnected.
    pub fn from_dispatch(d: &Value) -> Option<Self> {
        let user_id = d["user_id"].as_str().and_then(|s| s.parse::<u64>().ok())?;
        let channel_id = d["channel_id"]
            .as_str()
            .and_then(|s| s.parse::<u64>().ok())
            .map(ChannelId);
        let guild_id = d["guild_id"]
            .as_str()
            .and_then(|s| s.parse::<u64>().ok())
            .map(GuildId);

        Some(Self {
            guild_id,
            channel_id,
            user_id: UserId(user_id),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
