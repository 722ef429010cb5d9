use serde::{Deserialize, Serialize};

use crate::common::types::{AnyResult, ChannelId};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub discord: DiscordConfig,
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub announcer: Option<AnnouncerConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DiscordConfig {
    /// Bot token. May be left empty and supplied via `DISCORD_TOKEN` instead.
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TrackerConfig {
    pub scope: ScopeKind,
    /// Watched voice channel; required when `scope = "channel"`.
    pub channel_id: Option<ChannelId>,
    /// Text channel that receives session reports.
    pub notify_channel_id: ChannelId,
}

/// Which voice channels count toward a session.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScopeKind {
    Channel,
    Any,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AnnouncerConfig {
    pub channel_id: ChannelId,
    #[serde(default = "default_announce_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_announce_message")]
    pub message: String,
}

fn default_announce_interval() -> u64 {
    60
}

fn default_announce_message() -> String {
    "Good job!!".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub filters: Option<String>,
    pub file: Option<FileLogConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FileLogConfig {
    pub path: String,
    pub max_lines: u32,
}

impl Config {
    pub fn load() -> AnyResult<Self> {
        let config_path = if std::path::Path::new("config.toml").exists() {
            "config.toml"
        } else if std::path::Path::new("config.default.toml").exists() {
            "config.default.toml"
        } else {
            return Err("config.toml or config.default.toml not found".into());
        };

        let config_str = std::fs::read_to_string(config_path)?;
        if config_str.is_empty() {
            return Err(format!("{} is empty", config_path).into());
        }

        let mut config: Config = toml::from_str(&config_str)?;

        // The token from the environment wins over the file, matching how
        // deployments keep the credential out of the config.
        if let Ok(token) = std::env::var("DISCORD_TOKEN") {
            if !token.is_empty() {
                config.discord.token = token;
            }
        }
        if config.discord.token.is_empty() {
            return Err(
                "discord token is not set; add [discord] token to the config or set DISCORD_TOKEN"
                    .into(),
            );
        }

        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_channel_scope() {
        let config: Config = toml::from_str(
            r#"
            [discord]
            token = "abc"

            [tracker]
            scope = "channel"
            channel_id = 1278707009549631552
            notify_channel_id = 1278707009549631553
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.tracker.scope, ScopeKind::Channel);
        assert_eq!(
            config.tracker.channel_id,
            Some(ChannelId(1278707009549631552))
        );
        assert_eq!(
            config.tracker.notify_channel_id,
            ChannelId(1278707009549631553)
        );
        assert!(config.announcer.is_none());
    }

    #[test]
    fn test_parse_any_scope_with_announcer_defaults() {
        let config: Config = toml::from_str(
            r#"
            [discord]
            token = "abc"

            [tracker]
            scope = "any"
            notify_channel_id = 42

            [announcer]
            channel_id = 43
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.tracker.scope, ScopeKind::Any);
        assert_eq!(config.tracker.channel_id, None);

        let announcer = config.announcer.expect("announcer section present");
        assert_eq!(announcer.channel_id, ChannelId(43));
        assert_eq!(announcer.interval_secs, 60);
        assert_eq!(announcer.message, "Good job!!");
    }

    #[test]
    fn test_parse_logging_file_section() {
        let config: Config = toml::from_str(
            r#"
            [discord]
            token = "abc"

            [tracker]
            scope = "any"
            notify_channel_id = 42

            [logging]
            level = "debug"

            [logging.file]
            path = "logs/voicelog.log"
            max_lines = 5000
            "#,
        )
        .expect("config should parse");

        let logging = config.logging.expect("logging section present");
        assert_eq!(logging.level.as_deref(), Some("debug"));
        let file = logging.file.expect("file section present");
        assert_eq!(file.path, "logs/voicelog.log");
        assert_eq!(file.max_lines, 5000);
    }
}
