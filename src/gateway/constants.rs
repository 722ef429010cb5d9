/// Discord gateway version to use in the WebSocket URL.
pub const GATEWAY_VERSION: u8 = 10;

/// Default gateway host; READY supplies a per-session resume URL.
pub const GATEWAY_HOST: &str = "gateway.discord.gg";

/// GUILDS | GUILD_VOICE_STATES — everything the tracker needs.
pub const GATEWAY_INTENTS: u64 = (1 << 0) | (1 << 7);

/// Fallback heartbeat interval (ms) if Hello omits one.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 41_250;

/// Maximum reconnect attempts before giving up on the gateway session.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Base delay (ms) for the exponential backoff on reconnect.
pub const BACKOFF_BASE_MS: u64 = 1_000;

/// Fixed delay (ms) before a fresh Identify after a session-invalid close.
pub const RECONNECT_DELAY_FRESH_MS: u64 = 500;

/// Timeout (ms) allowed for the WS write task to shut down gracefully.
pub const WRITE_TASK_SHUTDOWN_MS: u64 = 500;
