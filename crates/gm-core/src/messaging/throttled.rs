use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use crate::{
    domain::{ChatId, MessageRef, UserId},
    messaging::{
        port::{ChatPort, MessagingPort, ModerationPort},
        types::{AdminRights, MemberStatus, Restriction},
    },
    Result,
};

#[derive(Clone, Copy, Debug)]
pub struct ThrottleConfig {
    /// Minimum spacing between *any* Bot API calls (global flood control).
    pub global_min_interval: Duration,
    /// Minimum spacing between outgoing messages per chat.
    pub per_chat_min_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            global_min_interval: Duration::from_millis(40), // ~25/sec
            per_chat_min_interval: Duration::from_millis(1050), // ~0.95/sec
        }
    }
}

#[derive(Debug)]
struct IntervalLimiter {
    interval: Duration,
    next: Instant,
}

impl IntervalLimiter {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now(),
        }
    }

    /// Reserve the next slot and return the wait duration required before executing.
    fn reserve(&mut self) -> Duration {
        let now = Instant::now();
        let start = if now >= self.next { now } else { self.next };
        self.next = start + self.interval;
        start.saturating_duration_since(now)
    }
}

/// ChatPort decorator that rate-limits outbound calls.
///
/// Sends and replies are spaced per chat; deletes and moderation calls only
/// take a global slot so a purge or a spam mute is not delayed behind chat
/// messages. Best-effort: it reduces 429s, it does not rule them out.
pub struct ThrottledPort {
    inner: Arc<dyn ChatPort>,
    cfg: ThrottleConfig,
    global: Mutex<IntervalLimiter>,
    per_chat: Mutex<HashMap<i64, Arc<Mutex<IntervalLimiter>>>>,
}

impl ThrottledPort {
    pub fn new(inner: Arc<dyn ChatPort>, cfg: ThrottleConfig) -> Self {
        Self {
            inner,
            cfg,
            global: Mutex::new(IntervalLimiter::new(cfg.global_min_interval)),
            per_chat: Mutex::new(HashMap::new()),
        }
    }

    async fn limiter_for_chat(&self, chat_id: i64) -> Arc<Mutex<IntervalLimiter>> {
        let mut map = self.per_chat.lock().await;
        map.entry(chat_id)
            .or_insert_with(|| {
                Arc::new(Mutex::new(IntervalLimiter::new(
                    self.cfg.per_chat_min_interval,
                )))
            })
            .clone()
    }

    async fn throttle_chat(&self, chat_id: ChatId) {
        let global_wait = { self.global.lock().await.reserve() };
        let chat_wait = {
            let lim = self.limiter_for_chat(chat_id.0).await;
            let mut guard = lim.lock().await;
            guard.reserve()
        };

        let wait = global_wait.max(chat_wait);
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }

    async fn throttle_global(&self) {
        let wait = { self.global.lock().await.reserve() };
        if !wait.is_zero() {
            sleep(wait).await;
        }
    }
}

#[async_trait::async_trait]
impl MessagingPort for ThrottledPort {
    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        self.throttle_chat(chat_id).await;
        self.inner.send_html(chat_id, html).await
    }

    async fn reply_html(&self, to: MessageRef, html: &str) -> Result<MessageRef> {
        self.throttle_chat(to.chat_id).await;
        self.inner.reply_html(to, html).await
    }

    async fn reply_text(&self, to: MessageRef, text: &str) -> Result<MessageRef> {
        self.throttle_chat(to.chat_id).await;
        self.inner.reply_text(to, text).await
    }

    async fn delete_message(&self, msg: MessageRef) -> Result<()> {
        self.throttle_global().await;
        self.inner.delete_message(msg).await
    }
}

#[async_trait::async_trait]
impl ModerationPort for ThrottledPort {
    async fn member_status(&self, chat_id: ChatId, user_id: UserId) -> Result<MemberStatus> {
        self.throttle_global().await;
        self.inner.member_status(chat_id, user_id).await
    }

    async fn ban(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        self.throttle_global().await;
        self.inner.ban(chat_id, user_id).await
    }

    async fn unban(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        self.throttle_global().await;
        self.inner.unban(chat_id, user_id).await
    }

    async fn restrict(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        restriction: Restriction,
    ) -> Result<()> {
        self.throttle_global().await;
        self.inner.restrict(chat_id, user_id, restriction).await
    }

    async fn set_admin_rights(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        rights: AdminRights,
    ) -> Result<()> {
        self.throttle_global().await;
        self.inner.set_admin_rights(chat_id, user_id, rights).await
    }
}
