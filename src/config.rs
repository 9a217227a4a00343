//! Contest configuration loaded from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::{ChannelId, RoleId, UserId};

/// Phrase a moderator must type to wipe all submissions
pub const DEFAULT_CLEAR_CONFIRMATION: &str = "Delete everything please!";

/// Errors in startup configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ContestConfig {
    /// The only channel submissions may be posted in
    pub submission_channel_id: ChannelId,
    /// Reaction counted as a vote
    pub vote_emoji: String,
    /// Granted to users with an active submission
    pub contestant_role_id: RoleId,
    /// Granted to banned users
    pub excluded_role_id: RoleId,
    /// Our own chat identity; messages by anyone else in the submission channel are removed
    pub bot_user_id: Option<UserId>,
    pub store_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub bridge_url: Option<String>,
    pub bridge_token: Option<String>,
    pub transport_timeout: Duration,
    pub clear_confirmation: String,
    pub suppression_capacity: usize,
    pub suppression_ttl: Duration,
    /// Prefix for message links in exports, e.g. `https://discord.com/channels/<guild>`
    pub message_link_base: Option<String>,
}

impl Default for ContestConfig {
    fn default() -> Self {
        Self {
            submission_channel_id: "submissions".to_string(),
            vote_emoji: "👍".to_string(),
            contestant_role_id: "contestant".to_string(),
            excluded_role_id: "excluded".to_string(),
            bot_user_id: None,
            store_path: PathBuf::from("data/contest.db"),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 6574)),
            bridge_url: None,
            bridge_token: None,
            transport_timeout: Duration::from_secs(10),
            clear_confirmation: DEFAULT_CLEAR_CONFIRMATION.to_string(),
            suppression_capacity: 1024,
            suppression_ttl: Duration::from_secs(600),
            message_link_base: None,
        }
    }
}

/// Read an env var, treating blank values as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn env_required(key: &'static str) -> Result<String, ConfigError> {
    env_opt(key).ok_or(ConfigError::Missing(key))
}

fn env_parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env_opt(key) {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

impl ContestConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            submission_channel_id: env_required("SUBMISSION_CHANNEL_ID")?,
            vote_emoji: env_opt("VOTE_EMOJI").unwrap_or(defaults.vote_emoji),
            contestant_role_id: env_required("CONTESTANT_ROLE_ID")?,
            excluded_role_id: env_required("EXCLUDED_ROLE_ID")?,
            bot_user_id: env_opt("BOT_USER_ID"),
            store_path: env_opt("STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.store_path),
            bind_addr: env_parsed("BIND_ADDR", defaults.bind_addr)?,
            bridge_url: env_opt("CHAT_BRIDGE_URL"),
            bridge_token: env_opt("CHAT_BRIDGE_TOKEN"),
            transport_timeout: Duration::from_secs(env_parsed("TRANSPORT_TIMEOUT_SECS", 10)?),
            clear_confirmation: std::env::var("CLEAR_CONFIRMATION")
                .ok()
                .filter(|phrase| !phrase.trim().is_empty())
                .unwrap_or(defaults.clear_confirmation),
            suppression_capacity: env_parsed("SUPPRESSION_CAPACITY", defaults.suppression_capacity)?,
            suppression_ttl: Duration::from_secs(env_parsed("SUPPRESSION_TTL_SECS", 600)?),
            message_link_base: env_opt("MESSAGE_LINK_BASE")
                .map(|base| base.trim_end_matches('/').to_string()),
        };

        if config.suppression_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "SUPPRESSION_CAPACITY",
                value: "0".to_string(),
            });
        }

        tracing::info!(
            channel = %config.submission_channel_id,
            emoji = %config.vote_emoji,
            store = %config.store_path.display(),
            bridge = config.bridge_url.is_some(),
            "Contest config loaded"
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "SUBMISSION_CHANNEL_ID",
        "VOTE_EMOJI",
        "CONTESTANT_ROLE_ID",
        "EXCLUDED_ROLE_ID",
        "BOT_USER_ID",
        "STORE_PATH",
        "BIND_ADDR",
        "CHAT_BRIDGE_URL",
        "CHAT_BRIDGE_TOKEN",
        "TRANSPORT_TIMEOUT_SECS",
        "CLEAR_CONFIRMATION",
        "SUPPRESSION_CAPACITY",
        "SUPPRESSION_TTL_SECS",
        "MESSAGE_LINK_BASE",
    ];

    fn reset_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    fn set_required() {
        std::env::set_var("SUBMISSION_CHANNEL_ID", "771000");
        std::env::set_var("CONTESTANT_ROLE_ID", "role-contestant");
        std::env::set_var("EXCLUDED_ROLE_ID", "role-excluded");
    }

    #[test]
    #[serial]
    fn test_from_env_requires_channel() {
        reset_env();
        let result = ContestConfig::from_env();
        assert!(matches!(
            result,
            Err(ConfigError::Missing("SUBMISSION_CHANNEL_ID"))
        ));
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        reset_env();
        set_required();

        let config = ContestConfig::from_env().unwrap();
        assert_eq!(config.submission_channel_id, "771000");
        assert_eq!(config.vote_emoji, "👍");
        assert_eq!(config.clear_confirmation, DEFAULT_CLEAR_CONFIRMATION);
        assert_eq!(config.transport_timeout, Duration::from_secs(10));
        assert_eq!(config.suppression_capacity, 1024);
        assert!(config.bridge_url.is_none());
        reset_env();
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        reset_env();
        set_required();
        std::env::set_var("VOTE_EMOJI", "🥚");
        std::env::set_var("BIND_ADDR", "127.0.0.1:9000");
        std::env::set_var("SUPPRESSION_TTL_SECS", "30");
        std::env::set_var("MESSAGE_LINK_BASE", "https://discord.com/channels/42/");

        let config = ContestConfig::from_env().unwrap();
        assert_eq!(config.vote_emoji, "🥚");
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.suppression_ttl, Duration::from_secs(30));
        assert_eq!(
            config.message_link_base.as_deref(),
            Some("https://discord.com/channels/42")
        );
        reset_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_numbers() {
        reset_env();
        set_required();
        std::env::set_var("TRANSPORT_TIMEOUT_SECS", "soon");

        let result = ContestConfig::from_env();
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "TRANSPORT_TIMEOUT_SECS",
                ..
            })
        ));
        reset_env();
    }
}
