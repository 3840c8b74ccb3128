//! The group-management service the adapters feed updates into.

use std::{sync::Arc, time::Duration};

use tokio::sync::Mutex;

use crate::{
    audit::{AuditEvent, AuditLogger},
    commands,
    config::Config,
    domain::UserId,
    messaging::{
        port::ChatPort,
        types::{IncomingCommand, IncomingText, MembershipEvent},
    },
    protection::ActivityTracker,
    store::{ChatDefaults, ChatStore},
    Result,
};

/// Thresholds for the automatic protections and bulk actions.
#[derive(Clone, Copy, Debug)]
pub struct ProtectionSettings {
    /// More than this many messages inside `spam_window` is spam.
    pub spam_threshold: usize,
    pub spam_window: Duration,
    pub link_mute: Duration,
    pub spam_mute: Duration,
    pub activity_idle_ttl: Duration,
    pub max_purge: u32,
}

impl Default for ProtectionSettings {
    fn default() -> Self {
        Self {
            spam_threshold: 5,
            spam_window: Duration::from_secs(6),
            link_mute: Duration::from_secs(60),
            spam_mute: Duration::from_secs(300),
            activity_idle_ttl: Duration::from_secs(3600),
            max_purge: 1000,
        }
    }
}

impl From<&Config> for ProtectionSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            spam_threshold: cfg.spam_threshold,
            spam_window: cfg.spam_window,
            link_mute: cfg.link_mute,
            spam_mute: cfg.spam_mute,
            activity_idle_ttl: cfg.activity_idle_ttl,
            max_purge: cfg.max_purge,
        }
    }
}

pub struct GroupManager {
    store: Arc<ChatStore>,
    pub(crate) activity: Mutex<ActivityTracker>,
    audit: Option<AuditLogger>,
    protection: ProtectionSettings,
    bot_id: Option<UserId>,
}

impl GroupManager {
    pub fn new(store: Arc<ChatStore>, protection: ProtectionSettings) -> Self {
        Self {
            store,
            activity: Mutex::new(ActivityTracker::new()),
            audit: None,
            protection,
            bot_id: None,
        }
    }

    /// Opens the database and the audit log named in `cfg`.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let defaults = ChatDefaults {
            warn_limit: cfg.default_warn_limit,
            ..ChatDefaults::default()
        };
        let store = ChatStore::open(&cfg.db_file, defaults)?;
        Ok(Self::new(Arc::new(store), ProtectionSettings::from(cfg))
            .with_audit(AuditLogger::new(&cfg.audit_log_path, cfg.audit_log_json)))
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    /// The bot's own account; it is never greeted when added to a chat.
    pub fn with_bot_id(mut self, bot_id: UserId) -> Self {
        self.bot_id = Some(bot_id);
        self
    }

    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn protection(&self) -> &ProtectionSettings {
        &self.protection
    }

    pub(crate) fn bot_id(&self) -> Option<UserId> {
        self.bot_id
    }

    pub(crate) fn audit(&self, event: AuditEvent) {
        if let Some(audit) = &self.audit {
            audit.record(event);
        }
    }

    /// Logs and audits an admin-issued action.
    pub(crate) fn audit_action(
        &self,
        cmd: &IncomingCommand,
        target: Option<UserId>,
        action: &str,
        detail: Option<&str>,
    ) {
        tracing::info!(
            chat_id = cmd.chat_id.0,
            actor_id = cmd.from.id.0,
            target_id = target.map(|t| t.0),
            action,
            detail,
            "moderation action"
        );
        self.audit(AuditEvent::action(
            cmd.chat_id,
            cmd.from.id,
            target,
            action,
            detail,
        ));
    }

    pub async fn handle_command(&self, port: &dyn ChatPort, cmd: IncomingCommand) -> Result<()> {
        commands::dispatch(self, port, &cmd).await
    }

    pub async fn handle_membership(&self, port: &dyn ChatPort, event: MembershipEvent) -> Result<()> {
        crate::events::greet(self, port, &event).await
    }

    pub async fn handle_text(&self, port: &dyn ChatPort, msg: IncomingText) -> Result<()> {
        self.handle_text_at(port, msg, std::time::Instant::now())
            .await
    }

    pub async fn handle_text_at(
        &self,
        port: &dyn ChatPort,
        msg: IncomingText,
        now: std::time::Instant,
    ) -> Result<()> {
        crate::events::protect(self, port, &msg, now).await
    }

    /// Forgets users idle longer than the configured TTL.
    pub async fn sweep_activity(&self) -> usize {
        self.sweep_activity_at(std::time::Instant::now()).await
    }

    pub async fn sweep_activity_at(&self, now: std::time::Instant) -> usize {
        let removed = self
            .activity
            .lock()
            .await
            .sweep_at(now, self.protection.activity_idle_ttl);
        if removed > 0 {
            tracing::debug!(removed, "swept idle activity entries");
        }
        removed
    }

    #[cfg(test)]
    pub(crate) fn in_memory() -> Self {
        Self::in_memory_with(ProtectionSettings::default())
    }

    #[cfg(test)]
    pub(crate) fn in_memory_with(protection: ProtectionSettings) -> Self {
        let store = ChatStore::open_in_memory(ChatDefaults::default())
            .expect("in-memory database");
        Self::new(Arc::new(store), protection)
    }
}
