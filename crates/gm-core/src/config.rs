use std::{env, path::PathBuf, time::Duration};

use crate::{errors::Error, Result};

pub const DEFAULT_RULES: &str = "No rules set.";
pub const DEFAULT_WELCOME: &str = "👋 <b>Welcome {mention}!</b>";
pub const DEFAULT_GOODBYE: &str = "👋 <b>Goodbye {mention}!</b>";

/// Typed configuration, read from the environment (and `.env` if present).
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub telegram_bot_token: String,
    pub db_file: PathBuf,
    pub default_warn_limit: u32,

    // Protections
    pub spam_threshold: usize,
    pub spam_window: Duration,
    pub link_mute: Duration,
    pub spam_mute: Duration,
    pub activity_idle_ttl: Duration,

    // Moderation
    pub max_purge: u32,

    // Audit
    pub audit_log_path: PathBuf,
    pub audit_log_json: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Existing env vars win over `.env`.
        let _ = dotenvy::dotenv();
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        let telegram_bot_token = env_str("TELEGRAM_BOT_TOKEN").unwrap_or_default();
        if telegram_bot_token.trim().is_empty() {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN environment variable is required".to_string(),
            ));
        }

        let db_file = PathBuf::from(env_str("DB_FILE").unwrap_or("group_mgr.db".to_string()));
        let default_warn_limit = env_u32("DEFAULT_WARN_LIMIT").unwrap_or(3).max(1);

        let spam_threshold = env_usize("SPAM_THRESHOLD").unwrap_or(5).max(1);
        let spam_window = Duration::from_secs(env_u64("SPAM_WINDOW").unwrap_or(6).max(1));
        let link_mute = Duration::from_secs(env_u64("LINK_MUTE_SECONDS").unwrap_or(60));
        let spam_mute = Duration::from_secs(env_u64("SPAM_MUTE_SECONDS").unwrap_or(300));
        let activity_idle_ttl =
            Duration::from_secs(env_u64("ACTIVITY_IDLE_TTL").unwrap_or(3600).max(60));

        let max_purge = env_u32("MAX_PURGE").unwrap_or(1000).max(1);

        let audit_log_path = PathBuf::from(
            env_str("AUDIT_LOG_PATH").unwrap_or("moderation-audit.log".to_string()),
        );
        let audit_log_json = env_bool("AUDIT_LOG_JSON").unwrap_or(false);

        Ok(Self {
            telegram_bot_token,
            db_file,
            default_warn_limit,
            spam_threshold,
            spam_window,
            link_mute,
            spam_mute,
            activity_idle_ttl,
            max_purge,
            audit_log_path,
            audit_log_json,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}
